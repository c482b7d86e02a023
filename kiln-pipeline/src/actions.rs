//! Actions shared by the pipeline steps.

use kiln_phaser::{ActionState, Interrupt, PhaseContext, PhaseResult, PostAction, PreAction};

use crate::{Milestone, PipelineContext};

/// Starts timing a milestone before a step body.
#[derive(Debug, Clone, Copy)]
pub struct StartMilestone(pub Milestone);

impl<I> PreAction<I, PipelineContext> for StartMilestone {
    fn invoke(&self, _state: &ActionState, _input: &I, ctx: &mut PipelineContext) -> PhaseResult<()> {
        ctx.performance.start(self.0);
        Ok(())
    }
}

/// Stops timing a milestone after a step body.
#[derive(Debug, Clone, Copy)]
pub struct FinishMilestone(pub Milestone);

impl<I, O> PostAction<I, O, PipelineContext> for FinishMilestone {
    fn invoke(
        &self,
        _state: &ActionState,
        _input: &I,
        _output: &O,
        ctx: &mut PipelineContext,
    ) -> PhaseResult<()> {
        ctx.performance.finish(self.0);
        Ok(())
    }
}

/// Fails the step once the diagnostics collector holds an error.
#[derive(Debug, Clone, Copy)]
pub struct CheckDiagnostics;

impl<I, O, C: PhaseContext> PostAction<I, O, C> for CheckDiagnostics {
    fn invoke(&self, state: &ActionState, _input: &I, _output: &O, ctx: &mut C) -> PhaseResult<()> {
        let errors = ctx.diagnostics().error_count();
        if errors > 0 {
            tracing::debug!(phase = %state.phase, errors, "errors reported, stopping");
            return Err(Interrupt::step_failed());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kiln_core::{CancellationStatus, CollectingMessageCollector, Disposable};

    use super::*;

    fn context() -> PipelineContext {
        PipelineContext::new(
            Arc::new(CollectingMessageCollector::new()),
            CancellationStatus::new(),
            Arc::new(Disposable::new("test")),
        )
    }

    fn state() -> ActionState {
        ActionState {
            phase: "frontend".into(),
            depth: 0,
            sequence: 1,
            check_conditions: false,
        }
    }

    #[test]
    fn test_milestone_actions_time_the_step() {
        let mut ctx = context();
        StartMilestone(Milestone::Analysis)
            .invoke(&state(), &(), &mut ctx)
            .expect("never fails");
        FinishMilestone(Milestone::Analysis)
            .invoke(&state(), &(), &(), &mut ctx)
            .expect("never fails");
        assert!(ctx.performance.milestone(Milestone::Analysis).is_some());
    }

    #[test]
    fn test_check_diagnostics() {
        let mut ctx = context();
        assert!(CheckDiagnostics.invoke(&state(), &(), &(), &mut ctx).is_ok());

        ctx.diagnostics().add_warning("frontend", "unused");
        assert!(CheckDiagnostics.invoke(&state(), &(), &(), &mut ctx).is_ok());

        ctx.diagnostics().add_error("frontend", "unexpected token");
        let err = CheckDiagnostics.invoke(&state(), &(), &(), &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            Interrupt::StepFailed {
                definitely_compiler_error: false
            }
        ));
    }
}
