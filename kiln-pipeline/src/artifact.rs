//! Artifacts handed from one pipeline step to the next.
//!
//! Each step consumes exactly the artifact the previous step produced. The
//! configuration travels along so later steps never look back.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use kiln_config::{CompilerArguments, CompilerConfiguration};
use kiln_ir::{IrModule, ResolvedProgram};
use kiln_phaser::{PhaseConfigurationService, PhaseState};

/// Raw arguments, before anything was resolved.
#[derive(Debug, Clone)]
pub struct ArgumentsArtifact {
    pub arguments: CompilerArguments,
}

impl PhaseState for ArgumentsArtifact {}

/// Resolved configuration plus the phase configuration of the lowerings.
#[derive(Debug, Clone)]
pub struct ConfigurationArtifact {
    pub configuration: Arc<CompilerConfiguration>,
    pub phases: Arc<PhaseConfigurationService>,
}

impl PhaseState for ConfigurationArtifact {}

/// The resolved program produced by the frontend.
#[derive(Debug, Clone)]
pub struct FrontendArtifact {
    pub configuration: Arc<CompilerConfiguration>,
    pub phases: Arc<PhaseConfigurationService>,
    pub program: ResolvedProgram,
}

impl PhaseState for FrontendArtifact {
    fn dump_state(&self, _fq_filter: Option<&str>) -> eyre::Result<Option<String>> {
        Ok(Some(serde_json::to_string_pretty(&self.program)?))
    }
}

/// The whole-program IR translated from the resolved program.
///
/// The module is handed to exactly one generation step, which takes it out
/// and lowers it in place. Until then it can be read through
/// [`Fir2IrArtifact::with_module`].
#[derive(Debug)]
pub struct Fir2IrArtifact {
    pub configuration: Arc<CompilerConfiguration>,
    pub phases: Arc<PhaseConfigurationService>,
    module: Mutex<Option<IrModule>>,
}

impl Fir2IrArtifact {
    pub fn new(
        configuration: Arc<CompilerConfiguration>,
        phases: Arc<PhaseConfigurationService>,
        module: IrModule,
    ) -> Self {
        Self {
            configuration,
            phases,
            module: Mutex::new(Some(module)),
        }
    }

    /// Runs `f` on the module, or returns `None` once it was taken.
    pub fn with_module<R>(&self, f: impl FnOnce(&IrModule) -> R) -> Option<R> {
        self.slot().as_ref().map(f)
    }

    /// Moves the module out. Later calls return `None`.
    pub fn take_module(&self) -> Option<IrModule> {
        self.slot().take()
    }

    fn slot(&self) -> MutexGuard<'_, Option<IrModule>> {
        self.module.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PhaseState for Fir2IrArtifact {
    fn dump_state(&self, fq_filter: Option<&str>) -> eyre::Result<Option<String>> {
        self.with_module(|module| module.dump_state(fq_filter))
            .transpose()
            .map(Option::flatten)
    }

    fn validate_state(&self) -> Vec<String> {
        self.with_module(PhaseState::validate_state).unwrap_or_default()
    }
}

/// A serialized module file.
#[derive(Debug, Clone)]
pub struct ModuleArtifact {
    pub configuration: Arc<CompilerConfiguration>,
    pub path: PathBuf,
    pub module: IrModule,
}

impl PhaseState for ModuleArtifact {
    fn dump_state(&self, fq_filter: Option<&str>) -> eyre::Result<Option<String>> {
        self.module.dump_state(fq_filter)
    }
}

/// One module emitted by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedModule {
    pub name: String,
    pub path: PathBuf,
    pub declarations: usize,
}

/// Everything the backend emitted, in module-chunk order.
#[derive(Debug, Clone)]
pub struct BinaryArtifact {
    pub configuration: Arc<CompilerConfiguration>,
    pub modules: Vec<EmittedModule>,
}

impl PhaseState for BinaryArtifact {}
