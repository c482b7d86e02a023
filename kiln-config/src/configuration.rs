//! Resolved, immutable compiler configuration.

use std::{
    collections::HashSet,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use crate::{CompilerArguments, Error, PhaseOptions, Result, Target};

pub const DEFAULT_MODULE_NAME: &str = "main";
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// A module built in this compilation and the sources it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: String,
    pub sources: Vec<PathBuf>,
}

impl ModuleSpec {
    pub fn owns(&self, path: &Path) -> bool {
        self.sources.iter().any(|source| source == path)
    }
}

/// The set of modules compiled together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleChunk {
    modules: Vec<ModuleSpec>,
}

impl ModuleChunk {
    /// One module holding every source.
    pub fn single(name: impl Into<String>, sources: Vec<PathBuf>) -> Self {
        Self {
            modules: vec![ModuleSpec {
                name: name.into(),
                sources,
            }],
        }
    }

    pub fn new(modules: Vec<ModuleSpec>) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> &[ModuleSpec] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether the backend can reuse the whole IR fragment as-is.
    pub fn is_single(&self) -> bool {
        self.modules.len() == 1
    }
}

/// The typed configuration of one compilation.
///
/// Built once by the configuration step from [`CompilerArguments`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfiguration {
    pub module_name: String,
    pub sources: Vec<PathBuf>,
    pub module_chunk: ModuleChunk,
    pub output_dir: PathBuf,
    pub target: Target,
    pub backend_threads: usize,
    pub phases: PhaseOptions,
    pub all_warnings_as_errors: bool,
    pub render_internal_diagnostic_names: bool,
    pub report_perf: bool,
    pub dump_perf: Option<PathBuf>,
    pub list_phases: bool,
    pub allow_no_source_files: bool,
    pub version: bool,
}

impl CompilerConfiguration {
    /// Resolve raw arguments into a configuration.
    ///
    /// Fails when a module lists a source that is not part of the compilation.
    pub fn resolve(arguments: &CompilerArguments) -> Result<Self> {
        let module_name = arguments
            .module_name
            .clone()
            .unwrap_or_else(|| DEFAULT_MODULE_NAME.to_string());

        let mut sources = arguments.sources.clone();
        if sources.is_empty() {
            for module in &arguments.modules {
                for source in &module.sources {
                    if !sources.contains(source) {
                        sources.push(source.clone());
                    }
                }
            }
        }

        let module_chunk = if arguments.modules.is_empty() {
            ModuleChunk::single(&module_name, sources.clone())
        } else {
            let known: HashSet<&PathBuf> = sources.iter().collect();
            let mut seen = HashSet::new();
            for module in &arguments.modules {
                if !seen.insert(module.name.as_str()) {
                    return Err(Error::invalid_arguments(format!(
                        "module '{}' is declared twice",
                        module.name
                    )));
                }
                if let Some(unknown) = module.sources.iter().find(|s| !known.contains(s)) {
                    return Err(Error::invalid_arguments(format!(
                        "module '{}' lists '{}' which is not a source of this compilation",
                        module.name,
                        unknown.display()
                    )));
                }
            }
            ModuleChunk::new(
                arguments
                    .modules
                    .iter()
                    .map(|module| ModuleSpec {
                        name: module.name.clone(),
                        sources: module.sources.clone(),
                    })
                    .collect(),
            )
        };

        let backend_threads = match arguments.backend_threads {
            None => 1,
            Some(0) => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            Some(n) => n,
        };

        let mut phases = arguments.phases.clone();
        if phases.check_sticky_conditions {
            phases.check_conditions = true;
        }

        let configuration = Self {
            module_name,
            sources,
            module_chunk,
            output_dir: arguments
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            target: arguments.target,
            backend_threads,
            phases,
            all_warnings_as_errors: arguments.all_warnings_as_errors,
            render_internal_diagnostic_names: arguments.render_internal_diagnostic_names,
            report_perf: arguments.report_perf,
            dump_perf: arguments.dump_perf.clone(),
            list_phases: arguments.list_phases,
            allow_no_source_files: arguments.allow_no_source_files,
            version: arguments.version,
        };
        tracing::debug!(
            module = %configuration.module_name,
            modules = configuration.module_chunk.len(),
            target = %configuration.target,
            backend_threads = configuration.backend_threads,
            "resolved compiler configuration"
        );
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModuleArguments;

    #[test]
    fn test_defaults() {
        let config = CompilerConfiguration::resolve(&CompilerArguments {
            sources: vec!["a.json".into(), "b.json".into()],
            ..Default::default()
        })
        .expect("valid arguments");

        assert_eq!(config.module_name, "main");
        assert_eq!(config.output_dir, PathBuf::from("build"));
        assert_eq!(config.backend_threads, 1);
        assert!(config.module_chunk.is_single());
        assert_eq!(config.module_chunk.modules()[0].sources.len(), 2);
    }

    #[test]
    fn test_sticky_implies_conditions() {
        let mut arguments = CompilerArguments::default();
        arguments.phases.check_sticky_conditions = true;
        let config = CompilerConfiguration::resolve(&arguments).expect("valid arguments");
        assert!(config.phases.check_conditions);
    }

    #[test]
    fn test_modules_supply_sources() {
        let config = CompilerConfiguration::resolve(&CompilerArguments {
            modules: vec![
                ModuleArguments {
                    name: "core".into(),
                    sources: vec!["core.json".into()],
                },
                ModuleArguments {
                    name: "app".into(),
                    sources: vec!["app.json".into(), "core.json".into()],
                },
            ],
            ..Default::default()
        })
        .expect("valid arguments");

        assert_eq!(config.sources, vec![PathBuf::from("core.json"), PathBuf::from("app.json")]);
        assert_eq!(config.module_chunk.len(), 2);
        assert!(config.module_chunk.modules()[1].owns(Path::new("core.json")));
    }

    #[test]
    fn test_module_with_unknown_source() {
        let err = CompilerConfiguration::resolve(&CompilerArguments {
            sources: vec!["a.json".into()],
            modules: vec![ModuleArguments {
                name: "m".into(),
                sources: vec!["b.json".into()],
            }],
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("'b.json'"));
    }
}
