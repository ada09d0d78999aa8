//! 按测试名汇总指标
//!
//! 每个测试一开始收集 PSNR（保留最小值）和 Fireflies（保留最大值）。一旦出现该测试的
//! `Required sample count` 行，就切换为只收集所需采样数（保留最大值），之前的 PSNR/Fireflies
//! 测量值被丢弃，之后的汇总行也不再生效。阈值始终保留第一次出现的值。

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use serde::ser::SerializeMap;

use crate::patterns::{self, LogRecord};

/// 单个测试所处的收集阶段
#[derive(Debug, Clone, PartialEq)]
pub enum TestMode {
    Metrics { psnr_tested: f64, fireflies_tested: u64 },
    RequiredSamples { required_samples: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestMetrics {
    pub psnr_threshold: Option<f64>,
    pub fireflies_threshold: Option<u64>,
    pub mode: TestMode,
}

impl TestMetrics {
    fn apply_summary(&mut self, psnr: f64, fireflies: u64) {
        if let TestMode::Metrics {
            psnr_tested,
            fireflies_tested,
        } = &mut self.mode
        {
            *psnr_tested = (*psnr_tested).min(psnr);
            *fireflies_tested = (*fireflies_tested).max(fireflies);
        }
    }

    fn apply_required_samples(&mut self, samples: u64) {
        if let TestMode::RequiredSamples { required_samples } = &mut self.mode {
            *required_samples = (*required_samples).max(samples);
            return;
        }

        self.mode = TestMode::RequiredSamples {
            required_samples: samples,
        };
    }
}

/// 字段顺序与输出的 JSON 保持一致，缺失的字段不输出
impl Serialize for TestMetrics {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let TestMode::Metrics { psnr_tested, .. } = &self.mode {
            map.serialize_entry("psnr_tested", psnr_tested)?;
        }
        if let Some(psnr_threshold) = &self.psnr_threshold {
            map.serialize_entry("psnr_threshold", psnr_threshold)?;
        }
        if let TestMode::Metrics { fireflies_tested, .. } = &self.mode {
            map.serialize_entry("fireflies_tested", fireflies_tested)?;
        }
        if let Some(fireflies_threshold) = &self.fireflies_threshold {
            map.serialize_entry("fireflies_threshold", fireflies_threshold)?;
        }
        if let TestMode::RequiredSamples { required_samples } = &self.mode {
            map.serialize_entry("required_samples", required_samples)?;
        }
        map.end()
    }
}

/// 测试名 -> 指标，保持测试第一次出现的顺序
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct MetricsTable {
    tests: IndexMap<String, TestMetrics>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    #[cfg(test)]
    pub fn get(&self, test: &str) -> Option<&TestMetrics> {
        self.tests.get(test)
    }

    pub fn apply(&mut self, record: LogRecord) {
        match record {
            LogRecord::Summary {
                test,
                psnr_tested,
                psnr_threshold,
                fireflies_tested,
                fireflies_threshold,
            } => match self.tests.entry(test) {
                Entry::Occupied(entry) => entry.into_mut().apply_summary(psnr_tested, fireflies_tested),
                Entry::Vacant(entry) => {
                    entry.insert(TestMetrics {
                        psnr_threshold: Some(psnr_threshold),
                        fireflies_threshold: Some(fireflies_threshold),
                        mode: TestMode::Metrics {
                            psnr_tested,
                            fireflies_tested,
                        },
                    });
                }
            },
            LogRecord::RequiredSamples { test, samples } => match self.tests.entry(test) {
                Entry::Occupied(entry) => entry.into_mut().apply_required_samples(samples),
                Entry::Vacant(entry) => {
                    // 没有汇总行的测试只记录采样数
                    entry.insert(TestMetrics {
                        psnr_threshold: None,
                        fireflies_threshold: None,
                        mode: TestMode::RequiredSamples {
                            required_samples: samples,
                        },
                    });
                }
            },
        }
    }

    /// 逐行解析一整个日志文件，返回命中的行数
    ///
    /// 进度输出用单独的 `\r` 覆盖当前行，`\r` 同样视为换行
    pub fn process_text(&mut self, text: &str) -> usize {
        let mut matched = 0;
        for record in text.lines().flat_map(|line| line.split('\r')).filter_map(patterns::parse_line) {
            self.apply(record);
            matched += 1;
        }
        matched
    }

    /// 4 空格缩进的 JSON
    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;

        Ok(String::from_utf8(buf)?)
    }
}
