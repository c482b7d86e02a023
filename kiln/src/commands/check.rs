use std::process::ExitCode;

use clap::Args;
use eyre::Result;

use super::{BuildArgs, UnwrapOrExit};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct CheckCommand {
    #[command(flatten)]
    pub build: BuildArgs,
}

impl CheckCommand {
    /// Run the check command
    pub fn run(&self) -> Result<ExitCode> {
        let arguments = self.build.load().unwrap_or_exit();
        let subject = if self.build.config.exists() {
            self.build.config.display().to_string()
        } else {
            "program".to_string()
        };

        let (report, exit_code) = ops::check(arguments, subject);
        report.render(&mut TerminalOutput::new());
        Ok(exit_code.into())
    }
}
