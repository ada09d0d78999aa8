//! 测试日志中的两类行
//!
//! ```text
//! Test complex_mat0  ...100.0% ... PSNR: 38.21/38.00 ... Fireflies: 3/5 ...
//! Required sample count for complex_mat0: 1024
//! ```

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// 一行日志解析出的记录
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// 测试完成时的 PSNR / Fireflies 汇总
    Summary {
        test: String,
        psnr_tested: f64,
        psnr_threshold: f64,
        fireflies_tested: u64,
        fireflies_threshold: u64,
    },
    /// 达到阈值所需的采样数
    RequiredSamples { test: String, samples: u64 },
}

fn summary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Test\s*(\w+).*100.0%.*PSNR:\s*([.\w]+)/([.\w]+).*Fireflies:\s*([.\w]+)/([.\w]+).*")
            .expect("invalid summary pattern")
    })
}

fn required_samples_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Required sample count for\s*(\w+):\s*(\w+).*").expect("invalid sample pattern"))
}

fn parse_capture<T: std::str::FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

fn parse_summary(line: &str) -> Option<LogRecord> {
    let caps = summary_regex().captures(line)?;
    // `inf` / `nan` 也能被解析为 f64，但无法写入 JSON
    let psnr_tested: f64 = parse_capture(&caps, 2)?;
    let psnr_threshold: f64 = parse_capture(&caps, 3)?;
    if !psnr_tested.is_finite() || !psnr_threshold.is_finite() {
        return None;
    }

    Some(LogRecord::Summary {
        test: caps[1].to_string(),
        psnr_tested,
        psnr_threshold,
        fireflies_tested: parse_capture(&caps, 4)?,
        fireflies_threshold: parse_capture(&caps, 5)?,
    })
}

fn parse_required_samples(line: &str) -> Option<LogRecord> {
    let caps = required_samples_regex().captures(line)?;

    Some(LogRecord::RequiredSamples {
        test: caps[1].to_string(),
        samples: parse_capture(&caps, 2)?,
    })
}

/// 先尝试汇总行，再尝试采样数行；两者都不匹配，或者数值无法解析时返回 None
pub fn parse_line(line: &str) -> Option<LogRecord> {
    if summary_regex().is_match(line) {
        parse_summary(line)
    } else {
        parse_required_samples(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let line = "Test complex_mat0        ...100.0% | PSNR: 38.21/38.00 (dB) | Fireflies: 3/5 | 12.5s";
        assert_eq!(
            parse_line(line),
            Some(LogRecord::Summary {
                test: "complex_mat0".to_string(),
                psnr_tested: 38.21,
                psnr_threshold: 38.0,
                fireflies_tested: 3,
                fireflies_threshold: 5,
            })
        );
    }

    #[test]
    fn test_required_samples_line() {
        assert_eq!(
            parse_line("Required sample count for complex_mat5_regions: 1024 (min 512)"),
            Some(LogRecord::RequiredSamples {
                test: "complex_mat5_regions".to_string(),
                samples: 1024,
            })
        );
    }

    #[test]
    fn test_unfinished_or_unrelated_lines() {
        // 进度没有到 100% 的行
        assert_eq!(parse_line("Test complex_mat0 ...45.0% | PSNR: 20.00/38.00 | Fireflies: 90/5"), None);
        assert_eq!(parse_line("  Test complex_mat0 ...100.0% | PSNR: 38.21/38.00 | Fireflies: 3/5"), None);
        assert_eq!(parse_line("Required sample count for : 12"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("Ray v0.3.0, CPU: avx2"), None);
    }

    #[test]
    fn test_unparsable_values_are_ignored() {
        assert_eq!(parse_line("Test mat ...100.0% | PSNR: 3.8.2/38.00 | Fireflies: 3/5"), None);
        assert_eq!(parse_line("Test mat ...100.0% | PSNR: 38.2/38.00 | Fireflies: few/5"), None);
        assert_eq!(parse_line("Required sample count for mat: lots"), None);
    }

    #[test]
    fn test_non_finite_psnr_is_ignored() {
        assert_eq!(parse_line("Test mat ...100.0% | PSNR: inf/38.00 | Fireflies: 3/5"), None);
        assert_eq!(parse_line("Test mat ...100.0% | PSNR: 38.2/NaN | Fireflies: 3/5"), None);
        assert_eq!(parse_line("Test mat ...100.0% | PSNR: infinity/38.00 | Fireflies: 3/5"), None);
    }
}
