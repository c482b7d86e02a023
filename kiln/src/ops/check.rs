//! Check operation - resolve and translate without emitting.

use std::sync::Arc;

use kiln_config::CompilerArguments;
use kiln_core::{CollectingMessageCollector, ExitCode};
use kiln_pipeline::{Driver, Services};

use super::Messages;
use crate::reports::CheckReport;

/// Execute the check operation.
///
/// Runs the driver in check-only mode and returns its diagnostics.
pub fn check(arguments: CompilerArguments, subject: String) -> (CheckReport, ExitCode) {
    let sink = Arc::new(CollectingMessageCollector::new());
    let summary = Driver::new()
        .check_only(true)
        .execute_with_summary(arguments, &Services::default(), sink.clone());

    let Messages {
        errors,
        warnings,
        infos,
    } = Messages::classify(sink.messages());

    let report = CheckReport {
        subject,
        errors,
        warnings,
        infos,
        completed_steps: summary.completed_steps,
    };
    (report, summary.exit_code)
}
