mod args;
mod check;
mod compile;
mod completions;
mod phases;

use std::process::ExitCode;

use check::CheckCommand;
use clap::{ArgAction, Parser, Subcommand};
use compile::CompileCommand;
use completions::CompletionsCommand;
use eyre::Result;
use phases::PhasesCommand;

pub(crate) use args::BuildArgs;

use crate::logging::LogFormat;

/// Extension trait for exiting on configuration errors with pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for kiln_config::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(kiln_core::ExitCode::CompilationError.code().into());
            }
        }
    }
}

#[derive(Parser)]
#[command(name = "kiln")]
#[command(version)]
#[command(about = "Compile resolved kiln programs to bytecode or module files")]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run(&self) -> Result<ExitCode> {
        match &self.command {
            Commands::Compile(cmd) => cmd.run(self.verbose > 0),
            Commands::Check(cmd) => cmd.run(),
            Commands::Phases(cmd) => cmd.run(),
            Commands::Completions(cmd) => cmd.run(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the program described by kiln.toml
    Compile(CompileCommand),

    /// Resolve and translate the program without lowering or writing output
    Check(CheckCommand),

    /// List the lowering phases of a target
    Phases(PhasesCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}
