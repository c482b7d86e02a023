//! Message sinks that receive rendered diagnostics.
//!
//! A [`MessageCollector`] is the user-facing end of the diagnostics channel:
//! the driver hands one in, the pipeline reports into it, and the driver
//! flushes it exactly once when the run ends.

use std::{
    io::Write,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use indexmap::IndexMap;

use crate::{Severity, SourceLocation};

/// A sink for compiler messages. Implementations must be safe to report into
/// from several threads.
pub trait MessageCollector: Send + Sync {
    /// Report a message.
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>);

    /// Whether an error-level message has been reported.
    fn has_errors(&self) -> bool;

    /// Deliver any buffered messages.
    fn flush(&self) {}
}

/// A message as stored by collecting sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
    pub location: Option<SourceLocation>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps every message in memory. Used by embedders (daemons, build tools)
/// and by tests.
#[derive(Debug, Default)]
pub struct CollectingMessageCollector {
    messages: Mutex<Vec<Message>>,
    flushes: Mutex<usize>,
}

impl CollectingMessageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages reported so far.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.messages).clone()
    }

    /// Messages of one severity.
    pub fn messages_with(&self, severity: Severity) -> Vec<Message> {
        lock(&self.messages)
            .iter()
            .filter(|m| m.severity == severity)
            .cloned()
            .collect()
    }

    /// How many times [`MessageCollector::flush`] was called.
    pub fn flush_count(&self) -> usize {
        *lock(&self.flushes)
    }
}

impl MessageCollector for CollectingMessageCollector {
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>) {
        lock(&self.messages).push(Message {
            severity,
            text: message.to_string(),
            location: location.cloned(),
        });
    }

    fn has_errors(&self) -> bool {
        lock(&self.messages).iter().any(|m| m.severity.is_error())
    }

    fn flush(&self) {
        *lock(&self.flushes) += 1;
    }
}

/// Renders messages to standard error.
#[derive(Debug, Default)]
pub struct PrintingMessageCollector {
    verbose: bool,
    has_errors: AtomicBool,
}

impl PrintingMessageCollector {
    /// Create a printer; `verbose` also prints logging-level output.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            has_errors: AtomicBool::new(false),
        }
    }
}

impl MessageCollector for PrintingMessageCollector {
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>) {
        if severity.is_error() {
            self.has_errors.store(true, Ordering::SeqCst);
        }
        if severity == Severity::Logging && !self.verbose {
            return;
        }

        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}: {}", severity, message);
        if let Some(loc) = location {
            let _ = writeln!(stderr, "  --> {}", loc);
        }
    }

    fn has_errors(&self) -> bool {
        self.has_errors.load(Ordering::SeqCst)
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Buffers messages per file and delivers them, errors first, on flush.
///
/// With `warnings_as_errors` every warning counts as an error, and a single
/// summary error is added on flush when only warnings were reported.
pub struct GroupingMessageCollector {
    delegate: Arc<dyn MessageCollector>,
    warnings_as_errors: bool,
    grouped: Mutex<IndexMap<Option<String>, Vec<Message>>>,
}

impl GroupingMessageCollector {
    pub fn new(delegate: Arc<dyn MessageCollector>, warnings_as_errors: bool) -> Self {
        Self {
            delegate,
            warnings_as_errors,
            grouped: Mutex::new(IndexMap::new()),
        }
    }

    fn has_explicit_errors(&self) -> bool {
        lock(&self.grouped)
            .values()
            .flatten()
            .any(|m| m.severity.is_error())
    }

    fn has_warnings(&self) -> bool {
        lock(&self.grouped)
            .values()
            .flatten()
            .any(|m| m.severity.is_warning())
    }
}

impl MessageCollector for GroupingMessageCollector {
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>) {
        if severity.is_verbose() {
            self.delegate.report(severity, message, location);
            return;
        }

        let key = location.map(|loc| loc.path.clone());
        lock(&self.grouped).entry(key).or_default().push(Message {
            severity,
            text: message.to_string(),
            location: location.cloned(),
        });
    }

    fn has_errors(&self) -> bool {
        self.has_explicit_errors()
            || (self.warnings_as_errors && self.has_warnings())
            || self.delegate.has_errors()
    }

    fn flush(&self) {
        let escalate = self.warnings_as_errors && !self.has_explicit_errors() && self.has_warnings();

        let mut groups: Vec<_> = std::mem::take(&mut *lock(&self.grouped)).into_iter().collect();
        // Messages without a file come first, then files in path order.
        groups.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (_, mut messages) in groups {
            messages.sort_by_key(|m| m.severity);
            for message in messages {
                self.delegate
                    .report(message.severity, &message.text, message.location.as_ref());
            }
        }

        if escalate {
            self.delegate.report(
                Severity::Error,
                "warnings found and all warnings are treated as errors",
                None,
            );
        }

        self.delegate.flush();
    }
}
