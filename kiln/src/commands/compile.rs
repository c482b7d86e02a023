use std::process::ExitCode;

use clap::Args;
use eyre::Result;

use super::{BuildArgs, UnwrapOrExit};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct CompileCommand {
    #[command(flatten)]
    pub build: BuildArgs,
}

impl CompileCommand {
    pub fn run(&self, verbose: bool) -> Result<ExitCode> {
        let arguments = self.build.load().unwrap_or_exit();
        let report = ops::compile(arguments, verbose);
        report.render(&mut TerminalOutput::new());
        Ok(report.exit_code().into())
    }
}
