//! 测试日志分析工具
//!
//! 扫描测试输出，按测试名汇总最差的 PSNR / Fireflies 以及所需的最大采样数，以 JSON 输出到 stdout。
//!
//! ```text
//! analyze-output test_output_*.txt > summary.json
//! ```

mod accumulator;
mod patterns;
mod reader;

use std::path::{Path, PathBuf};

use accumulator::MetricsTable;
use anyhow::Context;
use clap::Parser;
use ray_crate_tools::init_log::init_log;

#[derive(Parser, Debug)]
#[command(name = "analyze-output")]
#[command(about = "Aggregate per-test PSNR, fireflies and required sample counts from test logs", long_about = None)]
struct Cli {
    /// Test output files
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Also write the JSON summary to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

/// 依次处理所有文件，无法读取的文件只记录错误，返回失败的文件
fn process_files(table: &mut MetricsTable, files: &[PathBuf]) -> Vec<PathBuf> {
    let mut failed = Vec::new();

    for path in files {
        match reader::read_log_file(path) {
            Ok(text) => {
                let matched = table.process_text(&text);
                log::info!("Processed {:?}: {matched} matching lines", path);
            }
            Err(e) => {
                log::error!("Failed to process {:?}: {e:#}", path);
                failed.push(path.clone());
            }
        }
    }

    failed
}

fn write_output(path: &Path, json: &str) -> anyhow::Result<()> {
    let mut content = json.to_string();
    content.push('\n');
    std::fs::write(path, content).with_context(|| format!("failed to write {:?}", path))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_log();

    let mut table = MetricsTable::new();
    let failed = process_files(&mut table, &cli.files);

    let json = table.to_json_pretty()?;
    println!("{json}");

    if let Some(output) = &cli.output {
        write_output(output, &json)?;
    }

    log::info!(
        "Summarized {} tests from {} files ({} failed)",
        table.len(),
        cli.files.len() - failed.len(),
        failed.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_file_does_not_stop_processing() {
        let dir = tempfile::tempdir().unwrap();

        let first = dir.path().join("run0.txt");
        std::fs::write(&first, "Test mat0 ...100.0% | PSNR: 37.50/38.00 | Fireflies: 1/5\n").unwrap();

        // 既不是 UTF-8 也不是 UTF-16
        let broken = dir.path().join("broken.txt");
        std::fs::write(&broken, [0xFFu8, 0xFE, 0x00]).unwrap();

        let missing = dir.path().join("missing.txt");

        let last = dir.path().join("run1.txt");
        let mut utf16 = vec![0xFF, 0xFE];
        utf16.extend(
            "Test mat0 ...100.0% | PSNR: 36.75/38.00 | Fireflies: 4/5\r\nRequired sample count for mat1: 256\r\n"
                .encode_utf16()
                .flat_map(u16::to_le_bytes),
        );
        std::fs::write(&last, utf16).unwrap();

        let mut table = MetricsTable::new();
        let failed = process_files(&mut table, &[first, broken.clone(), missing.clone(), last]);

        assert_eq!(failed, vec![broken, missing]);
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            serde_json::json!({
                "mat0": {
                    "psnr_tested": 36.75,
                    "psnr_threshold": 38.0,
                    "fireflies_tested": 4,
                    "fireflies_threshold": 5
                },
                "mat1": { "required_samples": 256 }
            })
        );
    }

    #[test]
    fn test_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");

        write_output(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}\n");
    }

    #[test]
    fn test_cli_positional_files() {
        let cli = Cli::parse_from(["analyze-output", "a.txt", "b.txt", "-o", "out.json"]);
        assert_eq!(cli.files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));

        assert!(Cli::parse_from(["analyze-output"]).files.is_empty());
    }
}
