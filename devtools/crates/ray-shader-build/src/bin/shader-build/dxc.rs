//! HLSL -> DXIL
//!
//! 使用 `third-party/dxc/<platform>/` 下的 dxc 编译 spirv-cross 生成的 HLSL，
//! 然后由 append_refl_data 在 cso 末尾追加反射数据。
//!
//! # 参考
//! - [DirectXShaderCompiler](https://github.com/microsoft/DirectXShaderCompiler)

use crate::common::{EnvPath, ShaderCompileTask, ShaderTool, ShaderToolType, ToolInvocation};

/// 当前平台没有 dxc 时返回错误
fn dxc_program(env: &EnvPath, name: &str) -> anyhow::Result<std::path::PathBuf> {
    env.dxc_tool(name)
        .ok_or_else(|| anyhow::anyhow!("{name} is not available on {:?}", env.platform()))
}

#[derive(Debug, Default)]
pub struct Dxc;

impl Dxc {
    pub const fn new() -> Self {
        Self
    }
}

impl ShaderTool for Dxc {
    fn tool_type(&self) -> ShaderToolType {
        ShaderToolType::Dxc
    }

    fn invocation(&self, env: &EnvPath, task: &ShaderCompileTask) -> anyhow::Result<ToolInvocation> {
        let Some(profile) = task.hlsl_profile.as_deref() else {
            anyhow::bail!("{} has no HLSL profile", task.spv_name);
        };

        Ok(ToolInvocation::new(self.tool_type(), dxc_program(env, "dxc")?, env.root())
            .args(["-T", profile])
            .arg(EnvPath::output_rel(&task.hlsl_name))
            .arg("-Fo")
            .arg(EnvPath::output_rel(&task.cso_name)))
    }
}

#[derive(Debug, Default)]
pub struct AppendReflData;

impl AppendReflData {
    pub const fn new() -> Self {
        Self
    }
}

impl ShaderTool for AppendReflData {
    fn tool_type(&self) -> ShaderToolType {
        ShaderToolType::AppendReflData
    }

    fn invocation(&self, env: &EnvPath, task: &ShaderCompileTask) -> anyhow::Result<ToolInvocation> {
        Ok(ToolInvocation::new(self.tool_type(), dxc_program(env, "append_refl_data")?, env.root())
            .arg(EnvPath::output_rel(&task.cso_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::ShaderVariant;
    use ray_crate_tools::resource::{HostPlatform, RayPath};
    use std::ffi::OsString;

    fn env(platform: HostPlatform) -> (tempfile::TempDir, EnvPath) {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvPath::new(RayPath::new(dir.path()).unwrap(), platform);
        (dir, env)
    }

    #[test]
    fn test_dxc_invocation() {
        let (_dir, env) = env(HostPlatform::Windows);
        let task = ShaderCompileTask::new(&ShaderVariant::new("debug_rt.comp.glsl").hlsl_profile("cs_6_5"));

        let invocation = Dxc::new().invocation(&env, &task).unwrap();
        assert!(invocation.program.ends_with("dxc.exe"));
        let expected: Vec<OsString> = vec![
            "-T".into(),
            "cs_6_5".into(),
            EnvPath::output_rel("debug_rt.comp.hlsl").into(),
            "-Fo".into(),
            EnvPath::output_rel("debug_rt.comp.cso").into(),
        ];
        assert_eq!(invocation.args, expected);

        let refl = AppendReflData::new().invocation(&env, &task).unwrap();
        assert!(refl.program.ends_with("append_refl_data.exe"));
        assert_eq!(refl.args, vec![OsString::from(EnvPath::output_rel("debug_rt.comp.cso"))]);
    }

    #[test]
    fn test_dxc_unavailable() {
        let (_dir, env) = env(HostPlatform::MacOs);
        let task = ShaderCompileTask::new(&ShaderVariant::new("postprocess.comp.glsl"));

        let err = Dxc::new().invocation(&env, &task).unwrap_err();
        assert!(err.to_string().contains("dxc is not available"));
        assert!(AppendReflData::new().invocation(&env, &task).is_err());
    }

    #[test]
    fn test_dxc_requires_profile() {
        let (_dir, env) = env(HostPlatform::Linux);
        let task = ShaderCompileTask::new(&ShaderVariant::new("intersect_scene.rmiss.glsl").no_hlsl());

        assert!(Dxc::new().invocation(&env, &task).is_err());
    }
}
