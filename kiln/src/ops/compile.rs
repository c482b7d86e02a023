//! Compile operation - a full pipeline run.

use std::{path::PathBuf, sync::Arc};

use kiln_config::{CompilerArguments, DEFAULT_MODULE_NAME, DEFAULT_OUTPUT_DIR};
use kiln_core::PrintingMessageCollector;
use kiln_pipeline::{Driver, Services};

use crate::reports::CompileReport;

/// Execute the compile operation.
///
/// Diagnostics stream to standard error as the driver flushes them; the
/// report only carries the outcome.
pub fn compile(arguments: CompilerArguments, verbose: bool) -> CompileReport {
    let module_name = arguments
        .module_name
        .clone()
        .unwrap_or_else(|| DEFAULT_MODULE_NAME.to_string());
    let output_dir = arguments
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let target = arguments.target;

    let summary = Driver::new().execute_with_summary(
        arguments,
        &Services::default(),
        Arc::new(PrintingMessageCollector::new(verbose)),
    );
    tracing::debug!(state = %summary.final_state, steps = ?summary.completed_steps, "compile finished");

    CompileReport {
        module_name,
        target,
        output_dir,
        summary,
    }
}
