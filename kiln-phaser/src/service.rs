use std::{
    collections::BTreeSet,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use crate::PhaseConfig;

/// Phases disabled at runtime, on top of the static configuration.
///
/// The overlay only ever grows: a phase disabled here stays disabled for the
/// rest of the compilation.
#[derive(Debug, Default)]
pub struct DisabledOverlay {
    names: RwLock<BTreeSet<String>>,
}

impl DisabledOverlay {
    /// Returns `true` if the phase was newly disabled.
    pub fn disable(&self, name: &str) -> bool {
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.names.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Answers, per phase name, what the engine should do around it.
///
/// Every predicate is a lookup against the immutable [`PhaseConfig`], except
/// [`is_enabled`](Self::is_enabled) which also consults the runtime overlay.
#[derive(Debug, Default)]
pub struct PhaseConfigurationService {
    base: Arc<PhaseConfig>,
    overlay: DisabledOverlay,
}

impl PhaseConfigurationService {
    pub fn new(base: PhaseConfig) -> Self {
        Self {
            base: Arc::new(base),
            overlay: DisabledOverlay::default(),
        }
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.base
    }

    pub fn is_enabled(&self, phase: &str) -> bool {
        !self.base.disabled.contains(phase) && !self.overlay.contains(phase)
    }

    pub fn is_verbose(&self, phase: &str) -> bool {
        self.base.verbose.contains(phase)
    }

    /// Disable a phase for the rest of the compilation. Idempotent.
    pub fn disable(&self, phase: &str) {
        if self.overlay.disable(phase) {
            tracing::debug!(phase, "phase disabled at runtime");
        }
    }

    pub fn runtime_disabled(&self) -> BTreeSet<String> {
        self.overlay.names()
    }

    pub fn should_dump_before(&self, phase: &str) -> bool {
        self.base.dump_before.contains(phase)
    }

    pub fn should_dump_after(&self, phase: &str) -> bool {
        self.base.dump_after.contains(phase)
    }

    pub fn should_validate_before(&self, phase: &str) -> bool {
        self.base.validate_before.contains(phase)
    }

    pub fn should_validate_after(&self, phase: &str) -> bool {
        self.base.validate_after.contains(phase)
    }

    pub fn dump_directory(&self) -> Option<&Path> {
        self.base.dump_directory.as_deref()
    }

    pub fn dump_only_fq_name(&self) -> Option<&str> {
        self.base.dump_only_fq_name.as_deref()
    }

    pub fn needs_profiling(&self) -> bool {
        self.base.profile
    }

    pub fn check_conditions(&self) -> bool {
        self.base.check_conditions
    }

    pub fn check_sticky_conditions(&self) -> bool {
        self.base.check_sticky_conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhaseSet;

    #[test]
    fn test_disable_is_idempotent() {
        let service = PhaseConfigurationService::new(PhaseConfig::default());
        service.disable("inlining");
        let once = service.runtime_disabled();
        service.disable("inlining");
        assert_eq!(service.runtime_disabled(), once);
        assert!(!service.is_enabled("inlining"));
        assert!(service.is_enabled("emit"));
    }

    #[test]
    fn test_overlay_leaves_base_untouched() {
        let service = PhaseConfigurationService::new(PhaseConfig::default());
        service.disable("Emit");
        assert!(!service.is_enabled("emit"));
        assert!(service.config().disabled.is_empty());
    }

    #[test]
    fn test_all_disables_everything() {
        let service = PhaseConfigurationService::new(PhaseConfig {
            disabled: PhaseSet::All,
            verbose: PhaseSet::of(["emit"]),
            ..Default::default()
        });
        assert!(!service.is_enabled("anything"));
        assert!(service.is_verbose("EMIT"));
        assert!(!service.is_verbose("parse"));
    }
}
