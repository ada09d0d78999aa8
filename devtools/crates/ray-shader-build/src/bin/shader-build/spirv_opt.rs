//! SPIR-V 优化
//!
//! `spirv-opt` 以包装脚本的形式提供（Windows 下为 `.bat`，其他平台为 `.sh`），优化结果直接覆盖原文件

use crate::common::{EnvPath, ShaderCompileTask, ShaderTool, ShaderToolType, ToolInvocation};

#[derive(Debug, Default)]
pub struct SpirvOpt;

impl SpirvOpt {
    pub const fn new() -> Self {
        Self
    }
}

impl ShaderTool for SpirvOpt {
    fn tool_type(&self) -> ShaderToolType {
        ShaderToolType::SpirvOpt
    }

    fn invocation(&self, env: &EnvPath, task: &ShaderCompileTask) -> anyhow::Result<ToolInvocation> {
        let spv = EnvPath::output_rel(&task.spv_name);

        Ok(ToolInvocation::new(self.tool_type(), env.spirv_script("spirv-opt"), env.root())
            .arg(&spv)
            .arg("-o")
            .arg(&spv))
    }
}
