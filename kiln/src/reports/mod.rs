//! Report data structures for commands.
//!
//! Commands build reports, then render them to an Output target.

mod check;
mod compile;
mod output;
mod phases;

pub use check::CheckReport;
pub use compile::CompileReport;
pub use output::{Report, TerminalOutput};
pub use phases::PhasesReport;

#[cfg(test)]
pub(crate) use output::tests::RecordingOutput;
