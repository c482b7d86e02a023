//! The kiln compiler pipeline.
//!
//! A compilation is a fixed sequence of typed steps, each consuming the
//! artifact the previous one produced:
//!
//! ```text
//! ArgumentsArtifact ─configuration→ ConfigurationArtifact ─frontend→ FrontendArtifact
//!   ─fir2ir→ Fir2IrArtifact ─┬─backend→ BinaryArtifact          (bytecode target)
//!                            └─serialize-module→ ModuleArtifact (module target)
//! ```
//!
//! Steps run on the phase engine of `kiln-phaser`; the lowerings inside the
//! backend and module steps are phase trees built in [`lowering`]. The
//! [`Driver`] owns a run end to end: it wires the steps together, maps every
//! outcome to an [`ExitCode`](kiln_core::ExitCode) and releases the run's
//! resources exactly once.

mod actions;
mod artifact;
mod context;
mod driver;
mod emit;
pub mod lowering;
mod perf;
mod step;
mod steps;

pub use actions::{CheckDiagnostics, FinishMilestone, StartMilestone};
pub use artifact::{
    ArgumentsArtifact, BinaryArtifact, ConfigurationArtifact, EmittedModule, Fir2IrArtifact,
    FrontendArtifact, ModuleArtifact,
};
pub use context::PipelineContext;
pub use driver::{Driver, DriverState, RunSummary, Services};
pub use emit::{Emitter, ListingEmitter, ModuleFileEmitter};
pub use perf::{Milestone, PerformanceManager};
pub use step::{PipelineStep, StepStatus, step_status};
pub use steps::{
    AnalysisHandler, BackendStep, ConfigurationStep, FrontendStep, ModuleStep, TranslateStep,
};
