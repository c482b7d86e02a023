//! Core types shared by every stage of the kiln compiler pipeline.
//!
//! This crate provides the leaf-level building blocks the phase engine and the
//! pipeline driver are assembled from: diagnostics and their collectors, the
//! message sinks that render them, process exit codes, cooperative
//! cancellation, and the disposable scope that owns transient resources.

mod cancel;
mod collector;
mod diagnostic;
mod disposable;
mod error;
mod exit_code;
mod messages;

pub use cancel::{CancellationStatus, CompilationCanceled};
pub use collector::DiagnosticsCollector;
pub use diagnostic::{Diagnostic, Severity, SourceLocation};
pub use disposable::Disposable;
pub use error::{OutOfMemory, find_cause, has_cause};
pub use exit_code::ExitCode;
pub use messages::{
    CollectingMessageCollector, GroupingMessageCollector, Message, MessageCollector,
    PrintingMessageCollector,
};
