//! Run-scoped state threaded through every pipeline step.

use std::{sync::Arc, time::Duration};

use kiln_core::{CancellationStatus, DiagnosticsCollector, Disposable, MessageCollector};
use kiln_phaser::PhaseContext;

use crate::PerformanceManager;

/// Shared state of one compilation.
///
/// Created by the driver when a run starts and dropped when it ends. Steps
/// read their inputs from artifacts and reach everything else through here.
pub struct PipelineContext {
    messages: Arc<dyn MessageCollector>,
    diagnostics: Arc<DiagnosticsCollector>,
    cancellation: CancellationStatus,
    root_disposable: Arc<Disposable>,
    pub performance: PerformanceManager,
    render_internal_diagnostic_names: bool,
    check_only: bool,
    in_verbose_phase: bool,
}

impl PipelineContext {
    pub fn new(
        messages: Arc<dyn MessageCollector>,
        cancellation: CancellationStatus,
        root_disposable: Arc<Disposable>,
    ) -> Self {
        Self {
            messages,
            diagnostics: Arc::new(DiagnosticsCollector::new()),
            cancellation,
            root_disposable,
            performance: PerformanceManager::new(),
            render_internal_diagnostic_names: false,
            check_only: false,
            in_verbose_phase: false,
        }
    }

    /// Prefix rendered diagnostics with their internal names.
    pub fn render_internal_diagnostic_names(mut self, render: bool) -> Self {
        self.render_internal_diagnostic_names = render;
        self
    }

    /// Stop after IR translation; nothing is lowered or emitted.
    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    pub fn is_check_only(&self) -> bool {
        self.check_only
    }

    /// A handle on the diagnostics that outlives borrows of the context.
    pub fn shared_diagnostics(&self) -> Arc<DiagnosticsCollector> {
        Arc::clone(&self.diagnostics)
    }

    pub fn shared_messages(&self) -> Arc<dyn MessageCollector> {
        Arc::clone(&self.messages)
    }

    /// Scope transient environment objects register their cleanup with.
    pub fn root_disposable(&self) -> &Disposable {
        &self.root_disposable
    }

    /// Move accumulated diagnostics into the message collector.
    pub fn report_diagnostics(&self) {
        self.diagnostics
            .report_to(self.messages.as_ref(), self.render_internal_diagnostic_names);
    }
}

impl PhaseContext for PipelineContext {
    fn diagnostics(&self) -> &DiagnosticsCollector {
        &self.diagnostics
    }

    fn messages(&self) -> &dyn MessageCollector {
        self.messages.as_ref()
    }

    fn cancellation(&self) -> &CancellationStatus {
        &self.cancellation
    }

    fn in_verbose_phase(&self) -> bool {
        self.in_verbose_phase
    }

    fn set_in_verbose_phase(&mut self, verbose: bool) {
        self.in_verbose_phase = verbose;
    }

    fn record_phase_time(&mut self, phase: &str, elapsed: Duration) {
        self.performance.record_phase(phase, elapsed);
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("diagnostics", &self.diagnostics)
            .field("performance", &self.performance)
            .field("check_only", &self.check_only)
            .finish_non_exhaustive()
    }
}
