//! Phases operation - list the lowering tree of a target.

use std::sync::Arc;

use kiln_config::CompilerArguments;
use kiln_core::{CollectingMessageCollector, ExitCode, Severity};
use kiln_pipeline::{Driver, Services};

use super::Messages;
use crate::reports::PhasesReport;

/// Execute the phases operation.
///
/// The configuration step prints the tree as an info message and stops the
/// run, so no sources are read.
pub fn phases(mut arguments: CompilerArguments) -> (PhasesReport, ExitCode) {
    arguments.list_phases = true;
    let target = arguments.target;
    let sink = Arc::new(CollectingMessageCollector::new());
    let exit_code = Driver::new().execute(arguments, &Services::default(), sink.clone());

    let listing = sink
        .messages_with(Severity::Info)
        .into_iter()
        .next()
        .map(|message| message.text);
    let report = PhasesReport {
        target,
        listing,
        errors: Messages::classify(sink.messages()).errors,
    };
    (report, exit_code)
}
