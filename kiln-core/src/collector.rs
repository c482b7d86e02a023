//! Thread-safe, append-only diagnostics accumulation.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Diagnostic, MessageCollector, Severity};

/// Accumulates diagnostics reported by any phase of a compilation.
///
/// Reporting is safe from several threads at once (the backend reports from
/// its codegen workers); ordering across threads is not guaranteed, but no
/// diagnostic is ever lost.
#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticsCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        tracing::debug!(phase = %diagnostic.phase, "{}", diagnostic);
        self.lock().push(diagnostic);
    }

    /// Add an error diagnostic.
    pub fn add_error(&self, phase: &str, message: impl Into<String>) {
        self.report(Diagnostic::error(phase, message));
    }

    /// Add a warning diagnostic.
    pub fn add_warning(&self, phase: &str, message: impl Into<String>) {
        self.report(Diagnostic::warning(phase, message));
    }

    /// Whether any error has been reported. This is the single "fatal" predicate
    /// the pipeline gates on.
    pub fn has_errors(&self) -> bool {
        self.lock().iter().any(|d| d.severity.is_error())
    }

    /// Count the number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.lock().iter().filter(|d| d.severity.is_error()).count()
    }

    /// Count the number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|d| matches!(d.severity, Severity::Warning))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every diagnostic collected so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Remove and return every diagnostic collected so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Move all pending diagnostics into a message collector.
    ///
    /// Diagnostics are drained, so reporting twice never duplicates messages.
    pub fn report_to(&self, messages: &dyn MessageCollector, render_internal_names: bool) {
        for diagnostic in self.drain() {
            messages.report(
                diagnostic.severity,
                &diagnostic.render_message(render_internal_names),
                diagnostic.location.as_ref(),
            );
        }
    }
}
