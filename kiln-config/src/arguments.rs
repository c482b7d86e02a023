//! Raw compiler arguments, as read from `kiln.toml` and the command line.

use std::{fmt, path::PathBuf, str::FromStr};

use serde::Deserialize;

/// Where a phase name list came from.
///
/// The universal token is matched case-sensitively (`ALL`) for lists written
/// in `kiln.toml` and case-insensitively (`all`, `All`, ...) for lists passed
/// as free-form command-line values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrigin {
    #[default]
    Manifest,
    CommandLine,
}

/// A list of phase names naming "which phases" for one option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct PhaseList {
    pub names: Vec<String>,
    pub origin: ListOrigin,
}

impl PhaseList {
    /// A list from a free-form command-line value.
    pub fn command_line<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            origin: ListOrigin::CommandLine,
        }
    }

    pub fn manifest<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            origin: ListOrigin::Manifest,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<Vec<String>> for PhaseList {
    fn from(names: Vec<String>) -> Self {
        Self::manifest(names)
    }
}

/// Phase-related options: the `[phases]` table of `kiln.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PhaseOptions {
    /// Phases whose bodies are skipped.
    pub disable: PhaseList,
    /// Phases that run with verbose logging.
    pub verbose: PhaseList,
    pub dump_before: PhaseList,
    pub dump_after: PhaseList,
    /// Phases dumped both before and after.
    pub dump: PhaseList,
    pub validate_before: PhaseList,
    pub validate_after: PhaseList,
    /// Phases validated both before and after.
    pub validate: PhaseList,
    /// Directory dump files are written to. Without one, dumps go to the
    /// message collector.
    pub dump_directory: Option<PathBuf>,
    /// Restrict dumps to declarations matching this qualified name.
    pub dump_only_fq_name: Option<String>,
    /// Log the wall time of every phase.
    pub profile: bool,
    pub check_conditions: bool,
    /// Implies `check_conditions`.
    pub check_sticky_conditions: bool,
}

/// Output target of a compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Lower the IR and generate bytecode per module.
    #[default]
    Bytecode,
    /// Run pre-serialization lowerings and write a module file.
    Module,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Bytecode, Target::Module];

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Bytecode => "bytecode",
            Target::Module => "module",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|target| target.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown target '{}', expected 'bytecode' or 'module'", s))
    }
}

/// One `[[modules]]` entry: a module built from a subset of the sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ModuleArguments {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

/// Everything a compilation can be asked to do, before resolution.
///
/// Values from `kiln.toml` are deserialized into this struct; command-line
/// flags are merged on top with [`CompilerArguments::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompilerArguments {
    /// Resolved program files (frontend output).
    pub sources: Vec<PathBuf>,
    pub module_name: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub target: Target,
    /// Explicit module chunk. Empty means one module holding every source.
    pub modules: Vec<ModuleArguments>,
    /// Worker threads for backend code generation; `0` uses every core.
    pub backend_threads: Option<usize>,
    pub allow_no_source_files: bool,
    pub all_warnings_as_errors: bool,
    pub render_internal_diagnostic_names: bool,
    pub report_perf: bool,
    pub dump_perf: Option<PathBuf>,
    pub phases: PhaseOptions,

    /// Print the lowering tree and stop.
    #[serde(skip)]
    pub list_phases: bool,
    /// Print the compiler version; with no sources this is a successful run.
    #[serde(skip)]
    pub version: bool,
}

impl CompilerArguments {
    /// Overlay `other` on top of `self`: set values and non-empty lists in
    /// `other` win, flags are or-ed.
    pub fn merge(mut self, other: CompilerArguments) -> Self {
        if !other.sources.is_empty() {
            self.sources = other.sources;
        }
        if !other.modules.is_empty() {
            self.modules = other.modules;
        }
        if other.target != Target::default() {
            self.target = other.target;
        }
        self.module_name = other.module_name.or(self.module_name);
        self.output_dir = other.output_dir.or(self.output_dir);
        self.backend_threads = other.backend_threads.or(self.backend_threads);
        self.dump_perf = other.dump_perf.or(self.dump_perf);
        self.allow_no_source_files |= other.allow_no_source_files;
        self.all_warnings_as_errors |= other.all_warnings_as_errors;
        self.render_internal_diagnostic_names |= other.render_internal_diagnostic_names;
        self.report_perf |= other.report_perf;
        self.list_phases |= other.list_phases;
        self.version |= other.version;
        self.phases = self.phases.merge(other.phases);
        self
    }
}

impl PhaseOptions {
    pub fn merge(mut self, other: PhaseOptions) -> Self {
        fn pick(base: &mut PhaseList, over: PhaseList) {
            if !over.is_empty() {
                *base = over;
            }
        }
        pick(&mut self.disable, other.disable);
        pick(&mut self.verbose, other.verbose);
        pick(&mut self.dump_before, other.dump_before);
        pick(&mut self.dump_after, other.dump_after);
        pick(&mut self.dump, other.dump);
        pick(&mut self.validate_before, other.validate_before);
        pick(&mut self.validate_after, other.validate_after);
        pick(&mut self.validate, other.validate);
        self.dump_directory = other.dump_directory.or(self.dump_directory);
        self.dump_only_fq_name = other.dump_only_fq_name.or(self.dump_only_fq_name);
        self.profile |= other.profile;
        self.check_conditions |= other.check_conditions;
        self.check_sticky_conditions |= other.check_sticky_conditions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        assert_eq!("Module".parse::<Target>(), Ok(Target::Module));
        assert!("wasm".parse::<Target>().is_err());
    }

    #[test]
    fn test_merge_command_line_wins() {
        let file = CompilerArguments {
            module_name: Some("app".into()),
            backend_threads: Some(2),
            phases: PhaseOptions {
                disable: PhaseList::manifest(["const-folding"]),
                profile: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let cli = CompilerArguments {
            backend_threads: Some(4),
            phases: PhaseOptions {
                disable: PhaseList::command_line(["all"]),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.module_name.as_deref(), Some("app"));
        assert_eq!(merged.backend_threads, Some(4));
        assert_eq!(merged.phases.disable.origin, ListOrigin::CommandLine);
        assert!(merged.phases.profile);
    }

    #[test]
    fn test_phase_list_from_toml_is_manifest() {
        let options: PhaseOptions = toml::from_str(r#"disable = ["ALL"]"#).expect("valid phases");
        assert_eq!(options.disable.origin, ListOrigin::Manifest);
        assert_eq!(options.disable.names, vec!["ALL"]);
    }
}
