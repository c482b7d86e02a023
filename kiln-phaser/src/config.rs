//! Static, per-compilation phase configuration.

use std::path::PathBuf;

use kiln_config::{PhaseList, PhaseOptions};

use crate::PhaseSet;

/// Which phases run, log verbosely, dump or validate, and the global
/// instrumentation toggles. Built once per compilation and never mutated;
/// runtime opt-outs go through the overlay in
/// [`PhaseConfigurationService`](crate::PhaseConfigurationService).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseConfig {
    pub disabled: PhaseSet,
    pub verbose: PhaseSet,
    pub dump_before: PhaseSet,
    pub dump_after: PhaseSet,
    pub validate_before: PhaseSet,
    pub validate_after: PhaseSet,
    pub dump_directory: Option<PathBuf>,
    pub dump_only_fq_name: Option<String>,
    pub profile: bool,
    pub check_conditions: bool,
    pub check_sticky_conditions: bool,
}

impl PhaseConfig {
    /// Build the configuration for a phase tree whose phases are `known`.
    ///
    /// Every explicitly named phase that is not in `known` is reported through
    /// `report` and left out; construction itself never fails.
    pub fn create<'a>(
        known: impl IntoIterator<Item = &'a str>,
        options: &PhaseOptions,
        report: &mut dyn FnMut(String),
    ) -> PhaseConfig {
        let known: Vec<String> = known.into_iter().map(str::to_ascii_lowercase).collect();
        let mut resolve = |option: &str, list: &PhaseList| {
            let mut set = PhaseSet::from_list(list);
            set.retain(|name| {
                let exists = known.iter().any(|k| k == name);
                if !exists {
                    report(format!("no phase named '{}' (in {} list)", name, option));
                }
                exists
            });
            set
        };

        let disabled = resolve("disable", &options.disable);
        let verbose = resolve("verbose", &options.verbose);
        let dump_both = resolve("dump", &options.dump);
        let dump_before = resolve("dump-before", &options.dump_before);
        let dump_after = resolve("dump-after", &options.dump_after);
        let validate_both = resolve("validate", &options.validate);
        let validate_before = resolve("validate-before", &options.validate_before);
        let validate_after = resolve("validate-after", &options.validate_after);

        PhaseConfig {
            disabled,
            verbose,
            dump_before: dump_before.union(dump_both.clone()),
            dump_after: dump_after.union(dump_both),
            validate_before: validate_before.union(validate_both.clone()),
            validate_after: validate_after.union(validate_both),
            dump_directory: options.dump_directory.clone(),
            dump_only_fq_name: options.dump_only_fq_name.clone(),
            profile: options.profile,
            check_conditions: options.check_conditions || options.check_sticky_conditions,
            check_sticky_conditions: options.check_sticky_conditions,
        }
    }
}
