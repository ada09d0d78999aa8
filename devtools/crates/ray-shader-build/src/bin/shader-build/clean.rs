//! 清理上一次编译留下的产物

use std::path::Path;

use anyhow::Context;

/// 总是清理的产物
const SPIRV_OUTPUTS: &[&str] = &[".spv", ".spv.inl"];

/// 开启 dxc 时才清理的产物
const DXC_OUTPUTS: &[&str] = &[".hlsl", ".cso", ".cso.inl"];

fn is_stale_output(file_name: &str, dxc: bool) -> bool {
    let matches = |suffixes: &[&str]| suffixes.iter().any(|suffix| file_name.ends_with(suffix));
    matches(SPIRV_OUTPUTS) || (dxc && matches(DXC_OUTPUTS))
}

/// 确保输出目录存在，并删除其中的旧产物，返回删除的文件数
pub fn clean_output_dir(dir: &Path, dxc: bool) -> anyhow::Result<usize> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create output dir: {:?}", dir))?;

    let mut removed = 0;
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("failed to list {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if is_stale_output(file_name, dxc) {
            std::fs::remove_file(entry.path()).with_context(|| format!("failed to remove {:?}", entry.path()))?;
            log::debug!("removed {:?}", entry.path());
            removed += 1;
        }
    }

    Ok(removed)
}
