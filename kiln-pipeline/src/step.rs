//! The step boundary: where interrupts become step statuses.

use std::sync::Arc;

use eyre::WrapErr;
use kiln_core::{CompilationCanceled, ExitCode};
use kiln_phaser::{
    Interrupt, NamedPhase, PhaseConfigurationService, PhaseContext, PhaseEngine, PhaseState,
};

use crate::PipelineContext;

/// What the driver does after a step.
#[derive(Debug)]
pub enum StepStatus<T> {
    /// Hand the artifact to the next step.
    Continue(T),
    /// Stop the run with this exit code. No later step runs.
    Stop(ExitCode),
    /// Cancellation was observed.
    Canceled(CompilationCanceled),
}

impl<T> StepStatus<T> {
    pub fn is_continue(&self) -> bool {
        matches!(self, StepStatus::Continue(_))
    }

    pub fn exit_code(&self) -> Option<ExitCode> {
        match self {
            StepStatus::Stop(code) => Some(*code),
            _ => None,
        }
    }
}

/// A typed pipeline stage from `I` to `O`.
///
/// Every [`NamedPhase`] over the [`PipelineContext`] is a step. Pipeline
/// phases always run: they execute with an empty phase configuration, so
/// the disable, dump and validate lists only ever reach the lowerings.
pub trait PipelineStep<I, O> {
    fn execute(&self, ctx: &mut PipelineContext, input: &I) -> eyre::Result<StepStatus<O>>;
}

impl<P, I, O> PipelineStep<I, O> for P
where
    P: NamedPhase<PipelineContext, I, O>,
    I: PhaseState,
    O: PhaseState,
{
    fn execute(&self, ctx: &mut PipelineContext, input: &I) -> eyre::Result<StepStatus<O>> {
        let mut engine = PhaseEngine::new(Arc::new(PhaseConfigurationService::default()));
        match engine.run_phase(self, ctx, input) {
            Ok(output) => Ok(StepStatus::Continue(output)),
            Err(interrupt) => step_status(ctx, self.name(), interrupt),
        }
    }
}

/// Translate an interrupt that reached the boundary of step `step`.
///
/// Only [`Interrupt::Fatal`] crosses the boundary, as an error for the
/// driver.
pub fn step_status<O>(
    ctx: &PipelineContext,
    step: &str,
    interrupt: Interrupt,
) -> eyre::Result<StepStatus<O>> {
    match interrupt {
        Interrupt::StepFailed {
            definitely_compiler_error: true,
        } => {
            tracing::warn!(step, "step failed with a compiler error");
            Ok(StepStatus::Stop(ExitCode::InternalError))
        }
        Interrupt::StepFailed { .. } => {
            if ctx.diagnostics().has_errors() || ctx.messages().has_errors() {
                tracing::debug!(step, "step failed after reporting errors");
                Ok(StepStatus::Stop(ExitCode::CompilationError))
            } else {
                tracing::warn!(step, "step failed without reporting an error");
                Ok(StepStatus::Stop(ExitCode::InternalError))
            }
        }
        Interrupt::Finished => {
            tracing::debug!(step, "pipeline finished early");
            Ok(StepStatus::Stop(ExitCode::Ok))
        }
        Interrupt::Canceled(canceled) => Ok(StepStatus::Canceled(canceled)),
        Interrupt::Fatal(report) => Err(report).wrap_err_with(|| format!("step '{}' failed", step)),
    }
}
