//! GLSL 着色器编译器
//!
//! 使用 `third-party/spirv/<platform>/glslangValidator` 将 GLSL 编译为 SPIR-V

use crate::common::{EnvPath, ShaderCompileTask, ShaderTool, ShaderToolType, ToolInvocation};

/// glslangValidator
#[derive(Debug, Default)]
pub struct GlslangValidator;

impl GlslangValidator {
    pub const fn new() -> Self {
        Self
    }
}

impl ShaderTool for GlslangValidator {
    fn tool_type(&self) -> ShaderToolType {
        ShaderToolType::GlslangValidator
    }

    fn invocation(&self, env: &EnvPath, task: &ShaderCompileTask) -> anyhow::Result<ToolInvocation> {
        let invocation = ToolInvocation::new(self.tool_type(), env.spirv_tool("glslangValidator"), env.root())
            .arg("-V") // 生成 Vulkan 语义的 SPIR-V
            .args(["--target-env", task.target_env.as_str()])
            .arg(EnvPath::src_rel(&task.src_name))
            .args(&task.defines)
            .arg("-o")
            .arg(EnvPath::output_rel(&task.spv_name));

        Ok(match &task.glsl_version {
            Some(version) => invocation.args(["--glsl-version", version.as_str()]),
            None => invocation,
        })
    }
}
