//! Shader 编译工具
//!
//! 将 `internal/shaders` 下的 GLSL 按变体列表编译为 SPIR-V（可选 HLSL/DXIL），
//! 并把产物转换为 `.inl` 头文件输出到 `internal/shaders/output`，供渲染器直接嵌入。
//!
//! 需要在渲染器根目录下运行，或者通过 `--root` 指定。

mod clean;
mod common;
mod dxc;
mod embed;
mod glslang;
mod pipeline;
mod spirv_cross;
mod spirv_opt;
mod variants;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use common::{BuildOptions, EnvPath, ProcessRunner, ShaderCompileTask};
use pipeline::ShaderPipeline;
use ray_crate_tools::init_log::init_log;
use ray_crate_tools::resource::{HostPlatform, RayPath};
use variants::{BuildConfig, ShaderManifest};

/// shader 源码目录下默认的变体配置文件
const DEFAULT_MANIFEST: &str = "shader-variants.toml";

#[derive(Parser, Debug)]
#[command(name = "shader-build")]
#[command(about = "Compile the renderer's shader variants and emit embeddable headers", long_about = None)]
struct Cli {
    /// Renderer root directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Variant manifest (TOML); defaults to internal/shaders/shader-variants.toml, then the built-in list
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Number of variants compiled in parallel
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Compile one variant at a time
    #[arg(long, conflicts_with = "jobs")]
    serial: bool,

    /// Skip spirv-opt
    #[arg(long)]
    no_optimize: bool,

    /// Cross-compile to HLSL and build DXIL (default on Windows only)
    #[arg(long, conflicts_with = "no_dxc")]
    dxc: bool,

    /// Do not build HLSL/DXIL outputs
    #[arg(long)]
    no_dxc: bool,

    /// Do not remove outputs of the previous run
    #[arg(long)]
    keep_outputs: bool,

    /// Exit with a non-zero code when any variant fails
    #[arg(long)]
    strict: bool,
}

/// 命令行 > 配置文件 > 平台默认值
fn build_options(cli: &Cli, config: &BuildConfig, platform: HostPlatform) -> BuildOptions {
    let jobs = if cli.serial {
        1
    } else {
        cli.jobs
            .or(config.jobs)
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    };

    let optimize = !cli.no_optimize && config.optimize.unwrap_or(true);

    let mut dxc = match (cli.dxc, cli.no_dxc) {
        (true, _) => true,
        (_, true) => false,
        _ => config.dxc.unwrap_or(platform.dxc_enabled_by_default()),
    };
    if dxc && platform.dxc_dir_name().is_none() {
        log::warn!("dxc is not available on {:?}, HLSL outputs are disabled", platform);
        dxc = false;
    }

    BuildOptions {
        jobs: jobs.max(1),
        optimize,
        dxc,
        keep_outputs: cli.keep_outputs,
        strict: cli.strict,
    }
}

fn load_manifest(cli: &Cli, paths: &RayPath) -> anyhow::Result<ShaderManifest> {
    let default_path = paths.shader_src_path().join(DEFAULT_MANIFEST);
    let manifest_path: Option<&Path> = match &cli.manifest {
        Some(path) => Some(path),
        None if default_path.is_file() => Some(&default_path),
        None => None,
    };

    match manifest_path {
        Some(path) => {
            log::info!("Shader manifest: {:?}", path);
            ShaderManifest::from_file(path)
        }
        None => {
            log::info!("Shader manifest: built-in");
            Ok(ShaderManifest::builtin())
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_log();

    let platform = HostPlatform::current();
    let paths = RayPath::new(&cli.root)?;
    let manifest = load_manifest(&cli, &paths)?;
    let options = build_options(&cli, &manifest.build, platform);

    log::info!("Shader source path: {:?}", paths.shader_src_path());
    log::info!("Shader output path: {:?}", paths.shader_output_path());
    log::info!("SPIR-V tools path: {:?}", paths.spirv_tools_path(platform));
    log::info!("Build options: {:?}", options);

    let output_path = paths.shader_output_path();
    if options.keep_outputs {
        std::fs::create_dir_all(&output_path)
            .with_context(|| format!("failed to create output dir: {:?}", output_path))?;
    } else {
        let removed = clean::clean_output_dir(&output_path, options.dxc)?;
        log::info!("Removed {removed} stale outputs");
    }

    let tasks: Vec<_> = manifest.variants.iter().map(ShaderCompileTask::new).collect();
    let env = EnvPath::new(paths, platform);
    let runner = ProcessRunner;
    let pipeline = ShaderPipeline {
        env: &env,
        options: &options,
        runner: &runner,
    };

    let reports = pipeline::run_variants(&pipeline, &tasks)?;

    let failed: Vec<_> = reports.iter().filter(|report| !report.succeeded()).map(|report| &report.spv_name).collect();
    let headers: usize = reports.iter().map(|report| report.headers.len()).sum();
    if failed.is_empty() {
        log::info!("Shader compilation completed: {} variants, {headers} headers.", reports.len());
    } else {
        log::warn!(
            "Shader compilation completed: {} of {} variants failed: {:?}",
            failed.len(),
            reports.len(),
            failed
        );
    }

    Ok(if options.strict && !failed.is_empty() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
