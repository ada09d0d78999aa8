//! 单个变体的编译流程，以及并行调度
//!
//! ```text
//! glslangValidator -> spirv-opt -> <spv>.inl
//!                                \-> spirv-cross -> dxc -> append_refl_data -> <cso>.inl
//! ```
//!
//! 每一步都以前一步成功为前提，失败只影响当前变体。

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use rayon::prelude::*;

use crate::common::{BuildOptions, EnvPath, ShaderCompileTask, ShaderTool, ToolOutput, ToolRunner};
use crate::dxc::{AppendReflData, Dxc};
use crate::embed;
use crate::glslang::GlslangValidator;
use crate::spirv_cross::SpirvCross;
use crate::spirv_opt::SpirvOpt;

/// 编译流程中的每一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Compile,
    Optimize,
    EmbedSpv,
    CrossCompile,
    CompileDxil,
    AppendReflData,
    EmbedCso,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
    Skipped(&'static str),
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: BuildStep,
    pub outcome: StepOutcome,
    /// 只有调用了外部工具的步骤才有输出
    pub output: Option<ToolOutput>,
}

/// 一个变体的编译结果
#[derive(Debug, Clone)]
pub struct VariantReport {
    pub spv_name: String,
    pub steps: Vec<StepReport>,
    /// 成功生成的头文件
    pub headers: Vec<PathBuf>,
}

impl VariantReport {
    fn new(task: &ShaderCompileTask) -> Self {
        Self {
            spv_name: task.spv_name.clone(),
            steps: Vec::new(),
            headers: Vec::new(),
        }
    }

    fn record(&mut self, step: BuildStep, outcome: StepOutcome, output: Option<ToolOutput>) -> bool {
        let succeeded = outcome == StepOutcome::Succeeded;
        self.steps.push(StepReport { step, outcome, output });
        succeeded
    }

    fn skip(&mut self, step: BuildStep, reason: &'static str) {
        self.record(step, StepOutcome::Skipped(reason), None);
    }

    #[cfg(test)]
    pub fn outcome(&self, step: BuildStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|report| report.step == step).map(|report| &report.outcome)
    }

    pub fn succeeded(&self) -> bool {
        !self.steps.iter().any(|report| matches!(report.outcome, StepOutcome::Failed(_)))
    }

    /// 把所有工具的输出汇总为一条日志，避免并行编译时输出交错
    pub fn log(&self) {
        let mut text = String::new();
        for report in &self.steps {
            match &report.outcome {
                StepOutcome::Succeeded => {}
                StepOutcome::Failed(reason) => {
                    let _ = write!(text, "\n  {:?} failed: {reason}", report.step);
                }
                StepOutcome::Skipped(reason) => {
                    let _ = write!(text, "\n  {:?} skipped: {reason}", report.step);
                }
            }

            let Some(output) = &report.output else {
                continue;
            };
            if !output.stdout.trim().is_empty() {
                let _ = write!(text, "\n  [{:?}] stdout:\n{}", report.step, output.stdout.trim_end());
            }
            if !output.stderr.trim().is_empty() {
                let _ = write!(text, "\n  [{:?}] stderr:\n{}", report.step, output.stderr.trim_end());
            }
        }

        if self.succeeded() {
            log::info!("Compiled shader: {}{text}", self.spv_name);
        } else {
            log::error!("Failed to compile shader: {}{text}", self.spv_name);
        }
    }
}

/// 编译一个变体需要的全部上下文
pub struct ShaderPipeline<'a> {
    pub env: &'a EnvPath,
    pub options: &'a BuildOptions,
    pub runner: &'a dyn ToolRunner,
}

impl ShaderPipeline<'_> {
    pub fn build(&self, task: &ShaderCompileTask) -> VariantReport {
        let mut report = VariantReport::new(task);

        if !self.run_tool(&mut report, BuildStep::Compile, &GlslangValidator::new(), task) {
            return report;
        }

        if self.options.optimize {
            // spirv-opt 原地覆盖，失败后 spv 可能已经损坏
            if !self.run_tool(&mut report, BuildStep::Optimize, &SpirvOpt::new(), task) {
                return report;
            }
        } else {
            report.skip(BuildStep::Optimize, "optimization disabled");
        }

        self.embed(&mut report, BuildStep::EmbedSpv, &task.spv_name);

        if !self.options.dxc {
            report.skip(BuildStep::CrossCompile, "dxc disabled");
            return report;
        }
        if task.hlsl_profile.is_none() {
            report.skip(BuildStep::CrossCompile, "variant has no HLSL profile");
            return report;
        }

        let dxil_built = self.run_tool(&mut report, BuildStep::CrossCompile, &SpirvCross::new(), task)
            && self.run_tool(&mut report, BuildStep::CompileDxil, &Dxc::new(), task)
            && self.run_tool(&mut report, BuildStep::AppendReflData, &AppendReflData::new(), task);
        if dxil_built {
            self.embed(&mut report, BuildStep::EmbedCso, &task.cso_name);
        }

        report
    }

    /// 运行一个外部工具，返回是否成功
    fn run_tool(
        &self,
        report: &mut VariantReport,
        step: BuildStep,
        tool: &dyn ShaderTool,
        task: &ShaderCompileTask,
    ) -> bool {
        let invocation = match tool.invocation(self.env, task) {
            Ok(invocation) => invocation,
            Err(e) => return report.record(step, StepOutcome::Failed(format!("{e:#}")), None),
        };

        match self.runner.run(&invocation) {
            Ok(output) if output.success => report.record(step, StepOutcome::Succeeded, Some(output)),
            Ok(output) => {
                let reason = match output.code {
                    Some(code) => format!("{} exited with code {code}", tool.tool_type().name()),
                    None => format!("{} terminated by signal", tool.tool_type().name()),
                };
                report.record(step, StepOutcome::Failed(reason), Some(output))
            }
            Err(e) => report.record(step, StepOutcome::Failed(format!("{e:#}")), None),
        }
    }

    fn embed(&self, report: &mut VariantReport, step: BuildStep, file_name: &str) -> bool {
        match embed::embed_file(self.env.root(), &EnvPath::output_rel(file_name)) {
            Ok(header) => {
                report.headers.push(header);
                report.record(step, StepOutcome::Succeeded, None)
            }
            Err(e) => report.record(step, StepOutcome::Failed(format!("{e:#}")), None),
        }
    }
}

/// 使用固定数量的线程并行编译所有变体，按输入顺序返回结果
pub fn run_variants(pipeline: &ShaderPipeline<'_>, tasks: &[ShaderCompileTask]) -> anyhow::Result<Vec<VariantReport>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(pipeline.options.jobs.max(1))
        .thread_name(|index| format!("shader-build-{index}"))
        .build()
        .context("failed to create shader build thread pool")?;

    Ok(pool.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                log::info!("Compiling shader: {}", task.spv_name);
                let report = pipeline.build(task);
                report.log();
                report
            })
            .collect()
    }))
}
