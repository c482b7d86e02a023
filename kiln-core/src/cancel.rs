//! Cooperative, poll-based cancellation.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use thiserror::Error;

/// Raised when a safe point observes that the compilation was canceled.
///
/// This is never a failure: the driver maps it to a successful exit after
/// reporting a cancellation message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compilation canceled{}", reason_suffix(.reason))]
pub struct CompilationCanceled {
    pub reason: Option<String>,
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|reason| format!(": {}", reason)).unwrap_or_default()
}

/// Shared cancellation flag, checked at phase boundaries and before each
/// per-module backend task.
///
/// Clones share the same flag, so an IDE or build daemon keeps one handle and
/// passes another into the compilation.
#[derive(Debug, Clone, Default)]
pub struct CancellationStatus {
    canceled: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<String>>>,
}

impl CancellationStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Later calls keep the first reason.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut slot = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(reason.into());
        }
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Safe point: fails with [`CompilationCanceled`] once cancellation was requested.
    pub fn check_canceled(&self) -> Result<(), CompilationCanceled> {
        if !self.is_canceled() {
            return Ok(());
        }
        let reason = self
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Err(CompilationCanceled { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_canceled() {
        let status = CancellationStatus::new();
        assert!(status.check_canceled().is_ok());

        let handle = status.clone();
        handle.cancel("user request");
        handle.cancel("ignored");

        let err = status.check_canceled().unwrap_err();
        assert_eq!(err.to_string(), "compilation canceled: user request");
    }

    #[test]
    fn test_display_without_reason() {
        let err = CompilationCanceled { reason: None };
        assert_eq!(err.to_string(), "compilation canceled");
    }

    #[test]
    fn test_canceled_downcasts_from_report() {
        let report = eyre::Report::new(CompilationCanceled {
            reason: Some("shutdown".into()),
        });
        assert_eq!(report.to_string(), "compilation canceled: shutdown");
        let canceled = report.downcast_ref::<CompilationCanceled>().expect("canceled");
        assert_eq!(canceled.reason.as_deref(), Some("shutdown"));
    }
}
