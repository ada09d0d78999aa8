//! shader 变体列表
//!
//! 默认使用内置列表，也可以通过 TOML 配置文件描述：
//!
//! ```toml
//! [build]
//! jobs = 8
//! optimize = true
//! dxc = false
//!
//! [[variants]]
//! src_name = "primary_ray_gen.comp.glsl"
//! spv_name = "primary_ray_gen_adaptive.comp.spv"
//! defines = { ADAPTIVE = 1 }
//!
//! [[variants]]
//! src_name = "intersect_scene.rchit.glsl"
//! glsl_version = "460"
//! target_env = "spirv1.4"
//! skip_hlsl = true
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;

const DEFAULT_TARGET_ENV: &str = "spirv1.3";
const DEFAULT_HLSL_PROFILE: &str = "cs_6_0";

fn default_target_env() -> String {
    DEFAULT_TARGET_ENV.to_string()
}

fn default_hlsl_profile() -> String {
    DEFAULT_HLSL_PROFILE.to_string()
}

/// 一个需要编译的 shader 变体
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderVariant {
    /// `internal/shaders/` 下的源文件名
    pub src_name: String,

    /// 输出的 spv 文件名，默认由源文件名推导
    #[serde(default)]
    pub spv_name: Option<String>,

    #[serde(default)]
    pub glsl_version: Option<String>,

    #[serde(default = "default_target_env")]
    pub target_env: String,

    /// 宏定义，保持声明顺序
    #[serde(default)]
    pub defines: IndexMap<String, i64>,

    #[serde(default = "default_hlsl_profile")]
    pub hlsl_profile: String,

    /// 只需要 SPIR-V 的变体（例如 ray tracing pipeline 的各个阶段）
    #[serde(default)]
    pub skip_hlsl: bool,
}

// builder
impl ShaderVariant {
    pub fn new(src_name: &str) -> Self {
        Self {
            src_name: src_name.to_string(),
            spv_name: None,
            glsl_version: None,
            target_env: default_target_env(),
            defines: IndexMap::new(),
            hlsl_profile: default_hlsl_profile(),
            skip_hlsl: false,
        }
    }

    pub fn spv(mut self, spv_name: &str) -> Self {
        self.spv_name = Some(spv_name.to_string());
        self
    }

    pub fn glsl_version(mut self, version: &str) -> Self {
        self.glsl_version = Some(version.to_string());
        self
    }

    pub fn target_env(mut self, target_env: &str) -> Self {
        self.target_env = target_env.to_string();
        self
    }

    pub fn define(mut self, name: &str, value: i64) -> Self {
        self.defines.insert(name.to_string(), value);
        self
    }

    pub fn defines<const N: usize>(self, defines: [(&str, i64); N]) -> Self {
        defines.into_iter().fold(self, |variant, (name, value)| variant.define(name, value))
    }

    pub fn hlsl_profile(mut self, profile: &str) -> Self {
        self.hlsl_profile = profile.to_string();
        self
    }

    pub fn no_hlsl(mut self) -> Self {
        self.skip_hlsl = true;
        self
    }

    /// 硬件光追变体需要 GLSL 460 和 SPIR-V 1.4
    fn hwrt(self) -> Self {
        self.glsl_version("460").target_env("spirv1.4")
    }
}

/// 配置文件中 `[build]` 部分，命令行参数优先
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub jobs: Option<usize>,
    pub optimize: Option<bool>,
    pub dxc: Option<bool>,
}

/// TOML 配置文件
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderManifest {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub variants: Vec<ShaderVariant>,
}

impl ShaderManifest {
    /// 内置的变体列表
    pub fn builtin() -> Self {
        Self {
            build: BuildConfig::default(),
            variants: builtin_variants(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read manifest: {:?}", path.as_ref()))?;

        Self::from_toml(&content).with_context(|| format!("invalid manifest: {:?}", path.as_ref()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let manifest: ShaderManifest = toml::from_str(content).context("failed to parse TOML")?;
        manifest.validate()?;

        Ok(manifest)
    }

    /// 两个变体写同一个输出文件会互相覆盖
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.variants.is_empty(), "manifest contains no variants");

        let mut seen = HashSet::new();
        for task in self.variants.iter().map(crate::common::ShaderCompileTask::new) {
            anyhow::ensure!(seen.insert(task.spv_name.clone()), "duplicate output name: {}", task.spv_name);
        }

        Ok(())
    }
}

/// Ray 渲染器需要的全部 shader 变体
pub fn builtin_variants() -> Vec<ShaderVariant> {
    let v = ShaderVariant::new;

    let mut variants = vec![
        // Primary ray generation
        v("primary_ray_gen.comp.glsl").spv("primary_ray_gen_simple.comp.spv").define("ADAPTIVE", 0),
        v("primary_ray_gen.comp.glsl").spv("primary_ray_gen_adaptive.comp.spv").define("ADAPTIVE", 1),
    ];

    // Scene intersection (main, inline RT)
    for indirect in [0, 1] {
        let prefix = if indirect == 1 { "intersect_scene_indirect" } else { "intersect_scene" };
        for (hwrt, rt_name) in [(0, "swrt"), (1, "hwrt")] {
            for (bindless, tex_name) in [(0, "atlas"), (1, "bindless")] {
                let variant = v("intersect_scene.comp.glsl")
                    .spv(&format!("{prefix}_{rt_name}_{tex_name}.comp.spv"))
                    .defines([("INDIRECT", indirect), ("HWRT", hwrt), ("BINDLESS", bindless)]);
                variants.push(if hwrt == 1 { variant.hwrt().hlsl_profile("cs_6_5") } else { variant });
            }
        }
    }

    // Scene intersection (main, pipeline RT)
    variants.extend([
        v("intersect_scene.rgen.glsl")
            .spv("intersect_scene.rgen.spv")
            .hwrt()
            .defines([("INDIRECT", 0), ("BINDLESS", 1)])
            .no_hlsl(),
        v("intersect_scene.rgen.glsl")
            .spv("intersect_scene_indirect.rgen.spv")
            .hwrt()
            .defines([("INDIRECT", 1), ("BINDLESS", 1)])
            .no_hlsl(),
        v("intersect_scene.rchit.glsl").spv("intersect_scene.rchit.spv").hwrt().no_hlsl(),
        v("intersect_scene.rmiss.glsl").spv("intersect_scene.rmiss.spv").hwrt().no_hlsl(),
    ]);

    // Lights intersection
    variants.push(v("intersect_area_lights.comp.glsl").define("PRIMARY", 0));

    // Shading
    for (bindless, tex_name) in [(0, "atlas"), (1, "bindless")] {
        for (base_color, depth_normals, suffix) in [(0, 0, ""), (0, 1, "_n"), (1, 0, "_b"), (1, 1, "_bn")] {
            variants.push(v("shade.comp.glsl").spv(&format!("shade_primary_{tex_name}{suffix}.comp.spv")).defines([
                ("PRIMARY", 1),
                ("INDIRECT", 1),
                ("BINDLESS", bindless),
                ("OUTPUT_BASE_COLOR", base_color),
                ("OUTPUT_DEPTH_NORMALS", depth_normals),
            ]));
        }
    }
    for (bindless, tex_name) in [(0, "atlas"), (1, "bindless")] {
        variants.push(
            v("shade.comp.glsl")
                .spv(&format!("shade_secondary_{tex_name}.comp.spv"))
                .defines([("PRIMARY", 0), ("INDIRECT", 1), ("BINDLESS", bindless)]),
        );
    }

    // Scene intersection (shadow)
    for (hwrt, rt_name) in [(0, "swrt"), (1, "hwrt")] {
        for (bindless, tex_name) in [(0, "atlas"), (1, "bindless")] {
            let variant = v("intersect_scene_shadow.comp.glsl")
                .spv(&format!("intersect_scene_shadow_{rt_name}_{tex_name}.comp.spv"))
                .defines([("HWRT", hwrt), ("BINDLESS", bindless)]);
            variants.push(if hwrt == 1 { variant.hwrt().hlsl_profile("cs_6_5") } else { variant });
        }
    }

    // Postprocess
    for (base_color, depth_normals, suffix) in [(0, 0, ""), (0, 1, "_n"), (1, 0, "_b"), (1, 1, "_bn")] {
        variants.push(
            v("mix_incremental.comp.glsl")
                .spv(&format!("mix_incremental{suffix}.comp.spv"))
                .defines([("OUTPUT_BASE_COLOR", base_color), ("OUTPUT_DEPTH_NORMALS", depth_normals)]),
        );
    }
    variants.push(v("postprocess.comp.glsl"));

    // Denoise
    variants.push(v("filter_variance.comp.glsl"));
    for (base_color, depth_normal, suffix) in [(0, 0, ""), (0, 1, "_n"), (1, 0, "_b"), (1, 1, "_bn")] {
        variants.push(
            v("nlm_filter.comp.glsl")
                .spv(&format!("nlm_filter{suffix}.comp.spv"))
                .defines([("USE_BASE_COLOR", base_color), ("USE_DEPTH_NORMAL", depth_normal)]),
        );
    }

    // Sorting
    variants.extend([
        v("sort_hash_rays.comp.glsl"),
        v("sort_scan.comp.glsl").spv("sort_inclusive_scan.comp.spv").define("EXCLUSIVE_SCAN", 0),
        v("sort_scan.comp.glsl").spv("sort_exclusive_scan.comp.spv").define("EXCLUSIVE_SCAN", 1),
        v("sort_add_partial_sums.comp.glsl"),
        v("sort_init_count_table.comp.glsl"),
        v("sort_write_sorted_hashes.comp.glsl"),
        v("sort_reorder_rays.comp.glsl"),
    ]);

    // Other
    variants.extend([
        v("prepare_indir_args.comp.glsl"),
        v("debug_rt.comp.glsl").target_env("spirv1.4").hlsl_profile("cs_6_5"),
    ]);

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ShaderCompileTask;

    fn find<'a>(tasks: &'a [ShaderCompileTask], spv_name: &str) -> &'a ShaderCompileTask {
        tasks.iter().find(|task| task.spv_name == spv_name).unwrap()
    }

    #[test]
    fn test_builtin_variants() {
        let manifest = ShaderManifest::builtin();
        manifest.validate().unwrap();
        assert_eq!(manifest.variants.len(), 48);

        let tasks: Vec<_> = manifest.variants.iter().map(ShaderCompileTask::new).collect();

        let hwrt = find(&tasks, "intersect_scene_indirect_hwrt_bindless.comp.spv");
        assert_eq!(hwrt.defines, vec!["-DINDIRECT=1", "-DHWRT=1", "-DBINDLESS=1"]);
        assert_eq!(hwrt.glsl_version.as_deref(), Some("460"));
        assert_eq!(hwrt.target_env, "spirv1.4");
        assert_eq!(hwrt.hlsl_profile.as_deref(), Some("cs_6_5"));

        let shade = find(&tasks, "shade_primary_atlas_b.comp.spv");
        assert_eq!(
            shade.defines,
            vec![
                "-DPRIMARY=1",
                "-DINDIRECT=1",
                "-DBINDLESS=0",
                "-DOUTPUT_BASE_COLOR=1",
                "-DOUTPUT_DEPTH_NORMALS=0"
            ]
        );

        let rmiss = find(&tasks, "intersect_scene.rmiss.spv");
        assert_eq!(rmiss.hlsl_profile, None);
        assert!(rmiss.defines.is_empty());

        let debug_rt = find(&tasks, "debug_rt.comp.spv");
        assert_eq!(debug_rt.glsl_version, None);
        assert_eq!(debug_rt.target_env, "spirv1.4");

        let lights = find(&tasks, "intersect_area_lights.comp.spv");
        assert_eq!(lights.target_env, "spirv1.3");
        assert_eq!(lights.hlsl_profile.as_deref(), Some("cs_6_0"));
    }

    #[test]
    fn test_manifest_from_toml() {
        let manifest = ShaderManifest::from_toml(
            r#"
            [build]
            jobs = 4
            dxc = true

            [[variants]]
            src_name = "sort_scan.comp.glsl"
            spv_name = "sort_exclusive_scan.comp.spv"
            defines = { EXCLUSIVE_SCAN = 1, WIDE = 0 }

            [[variants]]
            src_name = "intersect_scene.rchit.glsl"
            glsl_version = "460"
            target_env = "spirv1.4"
            skip_hlsl = true
            "#,
        )
        .unwrap();

        assert_eq!(
            manifest.build,
            BuildConfig {
                jobs: Some(4),
                optimize: None,
                dxc: Some(true)
            }
        );
        assert_eq!(
            manifest.variants[0],
            ShaderVariant::new("sort_scan.comp.glsl")
                .spv("sort_exclusive_scan.comp.spv")
                .define("EXCLUSIVE_SCAN", 1)
                .define("WIDE", 0)
        );
        assert_eq!(
            manifest.variants[1],
            ShaderVariant::new("intersect_scene.rchit.glsl").hwrt().no_hlsl()
        );
    }

    #[test]
    fn test_manifest_rejects_duplicates() {
        let err = ShaderManifest::from_toml(
            r#"
            [[variants]]
            src_name = "postprocess.comp.glsl"

            [[variants]]
            src_name = "postprocess.comp.glsl"
            defines = { FAST = 1 }
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("duplicate output name: postprocess.comp.spv"));
    }

    #[test]
    fn test_manifest_rejects_empty_and_unknown_fields() {
        assert!(ShaderManifest::from_toml("[build]\njobs = 2\n").is_err());
        assert!(ShaderManifest::from_toml("[[variants]]\nsrc_name = \"a.comp.glsl\"\nprofile = \"cs_6_5\"\n").is_err());
    }
}
