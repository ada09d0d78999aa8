use std::path::{Path, PathBuf};

use anyhow::Context;

/// 当前构建目标所在的平台，决定第三方工具链的子目录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Linux,
    MacOs,
    Windows,
}

impl HostPlatform {
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// `third-party/spirv/` 下的子目录名
    pub const fn spirv_dir_name(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "win32",
        }
    }

    /// `third-party/dxc/` 下的子目录名，macOS 没有 dxc 的构建
    pub const fn dxc_dir_name(self) -> Option<&'static str> {
        match self {
            Self::Linux => Some("linux"),
            Self::MacOs => None,
            Self::Windows => Some("win32"),
        }
    }

    /// 只有 Windows 默认开启 HLSL/DXC 的编译
    pub const fn dxc_enabled_by_default(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// 包装脚本（例如 spirv-opt）的扩展名
    pub const fn script_ext(self) -> &'static str {
        match self {
            Self::Windows => "bat",
            Self::Linux | Self::MacOs => "sh",
        }
    }

    /// 可执行文件的后缀
    pub const fn exe_suffix(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux | Self::MacOs => "",
        }
    }
}

/// 渲染器目录布局
///
/// 所有路径基于渲染器根目录。`*_rel` 返回相对根目录的路径，外部工具以根目录作为工作目录运行，
/// 参数中只出现相对路径，生成的头文件注释也因此与机器无关。
///
/// ```text
/// <root>/
///   internal/shaders/            shader 源码
///   internal/shaders/output/     编译产物 (.spv, .hlsl, .cso, .inl)
///   third-party/spirv/<platform> glslangValidator, spirv-opt, spirv-cross
///   third-party/dxc/<platform>   dxc, append_refl_data
/// ```
#[derive(Debug, Clone)]
pub struct RayPath {
    root: PathBuf,
}

// new & init
impl RayPath {
    /// 根目录必须存在
    ///
    /// 不使用 `canonicalize`：Windows 上它返回 `\\?\C:\...` 形式的路径，cmd.exe 无法把它作为工作目录
    pub fn new(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let root = std::path::absolute(root).with_context(|| format!("invalid renderer root: {:?}", root))?;
        anyhow::ensure!(root.is_dir(), "renderer root is not a directory: {:?}", root);

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

// 相对路径
impl RayPath {
    pub fn shader_src_rel() -> PathBuf {
        Path::new("internal").join("shaders")
    }

    pub fn shader_output_rel() -> PathBuf {
        Self::shader_src_rel().join("output")
    }

    pub fn spirv_tools_rel(platform: HostPlatform) -> PathBuf {
        ["third-party", "spirv", platform.spirv_dir_name()].iter().collect()
    }

    pub fn dxc_tools_rel(platform: HostPlatform) -> Option<PathBuf> {
        platform.dxc_dir_name().map(|dir| ["third-party", "dxc", dir].iter().collect())
    }
}

// 绝对路径
impl RayPath {
    pub fn shader_src_path(&self) -> PathBuf {
        self.root.join(Self::shader_src_rel())
    }

    pub fn shader_output_path(&self) -> PathBuf {
        self.root.join(Self::shader_output_rel())
    }

    pub fn spirv_tools_path(&self, platform: HostPlatform) -> PathBuf {
        self.root.join(Self::spirv_tools_rel(platform))
    }

    pub fn dxc_tools_path(&self, platform: HostPlatform) -> Option<PathBuf> {
        Self::dxc_tools_rel(platform).map(|rel| self.root.join(rel))
    }
}
