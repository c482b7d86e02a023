//! Compile command report data structures.

use std::path::PathBuf;

use kiln_config::Target;
use kiln_core::ExitCode;
use kiln_pipeline::{DriverState, RunSummary};

use super::output::{Output, Report};

/// Report data from a compilation.
#[derive(Debug)]
pub struct CompileReport {
    pub module_name: String,
    pub target: Target,
    pub output_dir: PathBuf,
    pub summary: RunSummary,
}

impl CompileReport {
    pub fn exit_code(&self) -> ExitCode {
        self.summary.exit_code
    }
}

impl Report for CompileReport {
    fn render(&self, out: &mut dyn Output) {
        let summary = &self.summary;
        if summary.final_state == DriverState::Canceled {
            out.warning("compilation canceled");
            return;
        }
        if !summary.exit_code.is_ok() {
            let last = summary.completed_steps.last().map_or("none", String::as_str);
            out.error(&format!(
                "compilation failed with {} (last completed step: {})",
                summary.exit_code, last
            ));
            return;
        }

        out.preformatted(&format!(
            "✓ compiled {} ({}) into {}",
            self.module_name,
            self.target,
            self.output_dir.display()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::RecordingOutput;

    fn report(exit_code: ExitCode, final_state: DriverState, steps: &[&str]) -> CompileReport {
        CompileReport {
            module_name: "app".into(),
            target: Target::Module,
            output_dir: PathBuf::from("build"),
            summary: RunSummary {
                exit_code,
                final_state,
                completed_steps: steps.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn test_render_success() {
        let rendered = RecordingOutput::render(&report(
            ExitCode::Ok,
            DriverState::Done,
            &["configuration", "frontend", "fir2ir", "serialize-module"],
        ));
        insta::assert_snapshot!(rendered, @"✓ compiled app (module) into build");
    }

    #[test]
    fn test_render_failure_names_last_step() {
        let rendered = RecordingOutput::render(&report(
            ExitCode::CompilationError,
            DriverState::Done,
            &["configuration", "frontend"],
        ));
        insta::assert_snapshot!(
            rendered,
            @"error: compilation failed with COMPILATION_ERROR (last completed step: frontend)"
        );
    }
}
