//! Flags shared by every command that runs the pipeline.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use kiln_config::{CompilerArguments, PROJECT_FILE, PhaseList, PhaseOptions, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Bytecode,
    Module,
}

impl From<TargetArg> for Target {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Bytecode => Target::Bytecode,
            TargetArg::Module => Target::Module,
        }
    }
}

/// Phase selection flags. Lists are comma separated; `all` selects every
/// phase.
#[derive(Args, Debug)]
pub struct PhaseArgs {
    /// Phases whose bodies are skipped
    #[arg(long = "disable-phases", value_delimiter = ',', value_name = "PHASES")]
    pub disable: Vec<String>,

    /// Phases that log their work at debug level
    #[arg(id = "verbose_phases", long = "verbose-phases", value_delimiter = ',', value_name = "PHASES")]
    pub verbose: Vec<String>,

    /// Dump the IR before these phases
    #[arg(long = "phases-to-dump-before", value_delimiter = ',', value_name = "PHASES")]
    pub dump_before: Vec<String>,

    /// Dump the IR after these phases
    #[arg(long = "phases-to-dump-after", value_delimiter = ',', value_name = "PHASES")]
    pub dump_after: Vec<String>,

    /// Dump the IR before and after these phases
    #[arg(long = "phases-to-dump", value_delimiter = ',', value_name = "PHASES")]
    pub dump: Vec<String>,

    /// Validate the IR before these phases
    #[arg(long = "phases-to-validate-before", value_delimiter = ',', value_name = "PHASES")]
    pub validate_before: Vec<String>,

    /// Validate the IR after these phases
    #[arg(long = "phases-to-validate-after", value_delimiter = ',', value_name = "PHASES")]
    pub validate_after: Vec<String>,

    /// Validate the IR before and after these phases
    #[arg(long = "phases-to-validate", value_delimiter = ',', value_name = "PHASES")]
    pub validate: Vec<String>,

    /// Write dumps into this directory instead of the message stream
    #[arg(long)]
    pub dump_directory: Option<PathBuf>,

    /// Only dump declarations with this qualified name (or nested in it)
    #[arg(long)]
    pub dump_only_fq_name: Option<String>,

    /// Log the wall time of every phase
    #[arg(long = "profile-phases")]
    pub profile: bool,

    /// Check phase pre- and postconditions
    #[arg(long = "check-phase-conditions")]
    pub check_conditions: bool,

    /// Keep re-checking sticky postconditions for the rest of the run
    #[arg(long = "check-sticky-phase-conditions")]
    pub check_sticky_conditions: bool,
}

impl PhaseArgs {
    pub(super) fn to_options(&self) -> PhaseOptions {
        let list = |names: &[String]| PhaseList::command_line(names.iter().cloned());
        PhaseOptions {
            disable: list(&self.disable),
            verbose: list(&self.verbose),
            dump_before: list(&self.dump_before),
            dump_after: list(&self.dump_after),
            dump: list(&self.dump),
            validate_before: list(&self.validate_before),
            validate_after: list(&self.validate_after),
            validate: list(&self.validate),
            dump_directory: self.dump_directory.clone(),
            dump_only_fq_name: self.dump_only_fq_name.clone(),
            profile: self.profile,
            check_conditions: self.check_conditions,
            check_sticky_conditions: self.check_sticky_conditions,
        }
    }
}

/// Arguments from the project file at `config`. The default project file is
/// optional; an explicitly named one is not.
pub(super) fn project_arguments(config: &Path) -> kiln_config::Result<CompilerArguments> {
    if config == Path::new(PROJECT_FILE) && !config.exists() {
        return Ok(CompilerArguments::default());
    }
    kiln_config::parse_file(config)
}

/// Where the program comes from and how it is built.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to kiln.toml (defaults to ./kiln.toml, which may be absent)
    #[arg(short, long, default_value = PROJECT_FILE)]
    pub config: PathBuf,

    /// Resolved program files; replace the sources listed in kiln.toml
    pub sources: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Name of the module to build
    #[arg(long)]
    pub module_name: Option<String>,

    /// Output target
    #[arg(long, value_enum)]
    pub target: Option<TargetArg>,

    /// Backend worker threads (0 uses every core)
    #[arg(long)]
    pub backend_threads: Option<usize>,

    #[command(flatten)]
    pub phases: PhaseArgs,

    /// Print a performance summary
    #[arg(long)]
    pub report_perf: bool,

    /// Write the performance report as JSON to this file
    #[arg(long)]
    pub dump_perf: Option<PathBuf>,

    /// Treat every warning as an error
    #[arg(long)]
    pub warnings_as_errors: bool,

    /// Prefix diagnostics with their internal name
    #[arg(long)]
    pub render_internal_diagnostic_names: bool,

    /// Accept a program without source files
    #[arg(long)]
    pub allow_no_source_files: bool,
}

impl BuildArgs {
    /// Arguments from kiln.toml with the command-line flags on top.
    pub fn load(&self) -> kiln_config::Result<CompilerArguments> {
        let mut arguments = project_arguments(&self.config)?.merge(self.to_arguments());
        if let Some(target) = self.target {
            arguments.target = target.into();
        }
        Ok(arguments)
    }

    fn to_arguments(&self) -> CompilerArguments {
        CompilerArguments {
            sources: self.sources.clone(),
            module_name: self.module_name.clone(),
            output_dir: self.output.clone(),
            backend_threads: self.backend_threads,
            allow_no_source_files: self.allow_no_source_files,
            all_warnings_as_errors: self.warnings_as_errors,
            render_internal_diagnostic_names: self.render_internal_diagnostic_names,
            report_perf: self.report_perf,
            dump_perf: self.dump_perf.clone(),
            phases: self.phases.to_options(),
            ..Default::default()
        }
    }
}
