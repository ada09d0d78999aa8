//! shader 编译的共享类型和工具

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ray_crate_tools::resource::{HostPlatform, RayPath};

use crate::variants::ShaderVariant;

/// 编译流程中用到的外部工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderToolType {
    /// GLSL -> SPIR-V
    GlslangValidator,
    /// SPIR-V 优化，原地覆盖
    SpirvOpt,
    /// SPIR-V -> HLSL
    SpirvCross,
    /// HLSL -> DXIL
    Dxc,
    /// 在 cso 末尾追加反射数据
    AppendReflData,
}

impl ShaderToolType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::GlslangValidator => "glslangValidator",
            Self::SpirvOpt => "spirv-opt",
            Self::SpirvCross => "spirv-cross",
            Self::Dxc => "dxc",
            Self::AppendReflData => "append_refl_data",
        }
    }
}

/// 当前编译环境：渲染器目录布局 + 平台
#[derive(Debug, Clone)]
pub struct EnvPath {
    paths: RayPath,
    platform: HostPlatform,
}

impl EnvPath {
    pub fn new(paths: RayPath, platform: HostPlatform) -> Self {
        Self { paths, platform }
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// `third-party/spirv/<platform>/` 下的可执行文件
    pub fn spirv_tool(&self, name: &str) -> PathBuf {
        self.paths.spirv_tools_path(self.platform).join(format!("{name}{}", self.platform.exe_suffix()))
    }

    /// `third-party/spirv/<platform>/` 下的包装脚本
    pub fn spirv_script(&self, name: &str) -> PathBuf {
        self.paths.spirv_tools_path(self.platform).join(format!("{name}.{}", self.platform.script_ext()))
    }

    /// `third-party/dxc/<platform>/` 下的可执行文件，平台没有 dxc 时返回 None
    pub fn dxc_tool(&self, name: &str) -> Option<PathBuf> {
        self.paths
            .dxc_tools_path(self.platform)
            .map(|dir| dir.join(format!("{name}{}", self.platform.exe_suffix())))
    }

    /// 相对根目录的 shader 源文件路径
    pub fn src_rel(file: &str) -> PathBuf {
        RayPath::shader_src_rel().join(file)
    }

    /// 相对根目录的编译产物路径
    pub fn output_rel(file: &str) -> PathBuf {
        RayPath::shader_output_rel().join(file)
    }
}

/// 一个具体的编译任务，由 [`ShaderVariant`] 解析而来
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCompileTask {
    pub src_name: String,
    pub spv_name: String,
    pub hlsl_name: String,
    pub cso_name: String,
    pub glsl_version: Option<String>,
    pub target_env: String,
    /// `-DNAME=VALUE` 形式的宏定义
    pub defines: Vec<String>,
    /// None 表示这个变体不需要 HLSL/DXC 产物
    pub hlsl_profile: Option<String>,
}

impl ShaderCompileTask {
    pub fn new(variant: &ShaderVariant) -> Self {
        let spv_name = variant.spv_name.clone().unwrap_or_else(|| default_spv_name(&variant.src_name));
        let hlsl_name = replace_suffix(&spv_name, "spv", "hlsl");
        let cso_name = replace_suffix(&spv_name, "spv", "cso");

        Self {
            src_name: variant.src_name.clone(),
            spv_name,
            hlsl_name,
            cso_name,
            glsl_version: variant.glsl_version.clone(),
            target_env: variant.target_env.clone(),
            defines: variant.defines.iter().map(|(name, value)| format!("-D{name}={value}")).collect(),
            hlsl_profile: (!variant.skip_hlsl).then(|| variant.hlsl_profile.clone()),
        }
    }
}

/// `foo.comp.glsl` -> `foo.comp.spv`
fn default_spv_name(src_name: &str) -> String {
    if src_name.ends_with("glsl") {
        replace_suffix(src_name, "glsl", "spv")
    } else {
        format!("{src_name}.spv")
    }
}

fn replace_suffix(name: &str, from: &str, to: &str) -> String {
    match name.strip_suffix(from) {
        Some(stem) => format!("{stem}{to}"),
        None => format!("{name}.{to}"),
    }
}

/// 一次外部工具调用
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: ShaderToolType,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// 工具以渲染器根目录作为工作目录运行
    pub current_dir: PathBuf,
}

impl ToolInvocation {
    pub fn new(tool: ShaderToolType, program: PathBuf, current_dir: &Path) -> Self {
        Self {
            tool,
            program,
            args: Vec::new(),
            current_dir: current_dir.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 便于日志输出的命令行
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 外部工具的运行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// 被信号终止时没有退出码
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for ToolOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// 运行外部工具
///
/// 测试中用假的实现替换，避免依赖真实的编译器
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &ToolInvocation) -> anyhow::Result<ToolOutput>;
}

/// 通过 [`std::process::Command`] 运行工具
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> anyhow::Result<ToolOutput> {
        use anyhow::Context;

        log::debug!("run: {}", invocation.command_line());

        let output = std::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.current_dir)
            .output()
            .with_context(|| format!("failed to execute {}: {:?}", invocation.tool.name(), invocation.program))?;

        Ok(output.into())
    }
}

/// shader 工具 Trait，每个外部工具一个实现
pub trait ShaderTool: Send + Sync {
    fn tool_type(&self) -> ShaderToolType;

    /// 为某个编译任务构造命令行
    fn invocation(&self, env: &EnvPath, task: &ShaderCompileTask) -> anyhow::Result<ToolInvocation>;
}

/// 编译选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// 并行编译的线程数，至少为 1
    pub jobs: usize,
    /// 是否运行 spirv-opt
    pub optimize: bool,
    /// 是否生成 HLSL 和 DXIL 产物
    pub dxc: bool,
    /// 编译前不清理输出目录
    pub keep_outputs: bool,
    /// 存在失败的变体时以非零退出码结束
    pub strict: bool,
}
