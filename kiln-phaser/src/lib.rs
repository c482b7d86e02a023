//! Phase configuration and the phase engine.
//!
//! This crate sequences the discrete, checkpointed transformation steps of
//! the kiln compiler. It knows nothing about what a phase does; it decides
//! whether a phase runs and which instrumentation fires around it:
//!
//! - [`PhaseConfig`] / [`PhaseConfigurationService`] - which phases are
//!   disabled, verbose, dumped or validated, plus a runtime disable overlay
//! - [`PhaseTree`] - an arena of leaf and compound phases with unique names
//! - [`PhaseEngine`] - runs a tree (or a single typed [`NamedPhase`]) with
//!   pre/post actions, conditions, dumps, validation and profiling
//! - [`Interrupt`] - the structured control transfer a phase uses to abort
//!   its step, finish early, or report cancellation
//!
//! # Execution order of one phase
//!
//! ```text
//! cancellation check → enabled? → pre-actions → conditions → dump before
//!   → validate before → body → profile → validate after → postconditions
//!   → post-actions → dump after
//! ```

mod action;
mod config;
mod dump;
mod engine;
mod interrupt;
mod phase;
mod service;
mod set;
mod state;
mod tree;

pub use action::{ActionState, Condition, Conditions, PostAction, PreAction};
pub use config::PhaseConfig;
pub use dump::{BeforeOrAfter, StateDumper};
pub use engine::PhaseEngine;
pub use interrupt::{Interrupt, PhaseResult};
pub use phase::{LoweringPhase, NamedPhase, PhaseContext, PhaseState};
pub use service::{DisabledOverlay, PhaseConfigurationService};
pub use set::PhaseSet;
pub use state::PhaserState;
pub use tree::{PhaseId, PhaseKind, PhaseNode, PhaseTree, PhaseTreeBuilder, PhaseTreeError};
