use std::{path::PathBuf, process::ExitCode};

use clap::Args;
use eyre::Result;
use kiln_config::{CompilerArguments, PROJECT_FILE};

use super::{
    UnwrapOrExit,
    args::{PhaseArgs, TargetArg, project_arguments},
};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct PhasesCommand {
    /// Path to kiln.toml (defaults to ./kiln.toml, which may be absent)
    #[arg(short, long, default_value = PROJECT_FILE)]
    pub config: PathBuf,

    /// Target whose lowerings are listed
    #[arg(long, value_enum)]
    pub target: Option<TargetArg>,

    #[command(flatten)]
    pub phases: PhaseArgs,
}

impl PhasesCommand {
    pub fn run(&self) -> Result<ExitCode> {
        let mut arguments = project_arguments(&self.config).unwrap_or_exit().merge(CompilerArguments {
            phases: self.phases.to_options(),
            ..Default::default()
        });
        if let Some(target) = self.target {
            arguments.target = target.into();
        }

        let (report, exit_code) = ops::phases(arguments);
        report.render(&mut TerminalOutput::new());
        Ok(exit_code.into())
    }
}
