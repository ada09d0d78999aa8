//! SPIR-V -> HLSL
//!
//! 使用 spirv-cross 生成 shader model 6.0 的 HLSL，供 dxc 继续编译

use crate::common::{EnvPath, ShaderCompileTask, ShaderTool, ShaderToolType, ToolInvocation};

/// spirv-cross 输出的 HLSL shader model
const HLSL_SHADER_MODEL: &str = "60";

#[derive(Debug, Default)]
pub struct SpirvCross;

impl SpirvCross {
    pub const fn new() -> Self {
        Self
    }
}

impl ShaderTool for SpirvCross {
    fn tool_type(&self) -> ShaderToolType {
        ShaderToolType::SpirvCross
    }

    fn invocation(&self, env: &EnvPath, task: &ShaderCompileTask) -> anyhow::Result<ToolInvocation> {
        Ok(ToolInvocation::new(self.tool_type(), env.spirv_tool("spirv-cross"), env.root())
            .arg(EnvPath::output_rel(&task.spv_name))
            .arg("--hlsl")
            .args(["--shader-model", HLSL_SHADER_MODEL])
            .arg("--output")
            .arg(EnvPath::output_rel(&task.hlsl_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::ShaderVariant;
    use ray_crate_tools::resource::{HostPlatform, RayPath};
    use std::ffi::OsString;

    #[test]
    fn test_spirv_cross_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvPath::new(RayPath::new(dir.path()).unwrap(), HostPlatform::Linux);
        let task = ShaderCompileTask::new(&ShaderVariant::new("sort_scan.comp.glsl").spv("sort_inclusive_scan.comp.spv"));

        let invocation = SpirvCross::new().invocation(&env, &task).unwrap();

        assert!(invocation.program.ends_with("spirv-cross"));
        let expected: Vec<OsString> = vec![
            EnvPath::output_rel("sort_inclusive_scan.comp.spv").into(),
            "--hlsl".into(),
            "--shader-model".into(),
            "60".into(),
            "--output".into(),
            EnvPath::output_rel("sort_inclusive_scan.comp.hlsl").into(),
        ];
        assert_eq!(invocation.args, expected);
    }
}
