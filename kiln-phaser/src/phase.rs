//! The capabilities a phase and its surroundings must provide.

use std::time::Duration;

use kiln_core::{CancellationStatus, DiagnosticsCollector, MessageCollector};
use kiln_ir::IrModule;

use crate::{Interrupt, PhaseResult, PostAction, PreAction};

/// Run-scoped state the engine needs from whoever drives it.
pub trait PhaseContext {
    fn diagnostics(&self) -> &DiagnosticsCollector;

    fn messages(&self) -> &dyn MessageCollector;

    fn cancellation(&self) -> &CancellationStatus;

    fn in_verbose_phase(&self) -> bool;

    fn set_in_verbose_phase(&mut self, verbose: bool);

    /// Called with the wall time of every phase when profiling is on.
    fn record_phase_time(&mut self, _phase: &str, _elapsed: Duration) {}
}

/// State a phase reads and produces, as seen by dumps and validation.
pub trait PhaseState {
    /// Render the state for a dump, restricted to declarations matching
    /// `fq_filter`. `None` means the state has nothing worth dumping.
    fn dump_state(&self, _fq_filter: Option<&str>) -> eyre::Result<Option<String>> {
        Ok(None)
    }

    /// Structural problems, one message each.
    fn validate_state(&self) -> Vec<String> {
        Vec::new()
    }
}

impl PhaseState for IrModule {
    fn dump_state(&self, fq_filter: Option<&str>) -> eyre::Result<Option<String>> {
        Ok(Some(self.dump(fq_filter)?))
    }

    fn validate_state(&self) -> Vec<String> {
        kiln_ir::validate_module(self)
    }
}

/// A typed phase from `I` to `O`.
///
/// Implementors that define no meaningful output when disabled keep the
/// default [`output_if_not_enabled`](Self::output_if_not_enabled), which
/// fails with an internal error.
pub trait NamedPhase<C, I, O> {
    fn name(&self) -> &str;

    fn pre_actions(&self) -> Vec<Box<dyn PreAction<I, C>>> {
        Vec::new()
    }

    fn post_actions(&self) -> Vec<Box<dyn PostAction<I, O, C>>> {
        Vec::new()
    }

    fn phase_body(&self, ctx: &mut C, input: &I) -> PhaseResult<O>;

    fn output_if_not_enabled(&self, _ctx: &mut C, _input: &I) -> PhaseResult<O> {
        Err(Interrupt::fatal(format!(
            "phase '{}' is disabled but defines no output for that case",
            self.name()
        )))
    }
}

/// A leaf of a lowering tree: rewrites state in place.
///
/// When disabled the state passes through unchanged.
pub trait LoweringPhase<C, S>: Send + Sync {
    fn name(&self) -> &str;

    fn lower(&self, ctx: &mut C, state: &mut S) -> PhaseResult<()>;
}
