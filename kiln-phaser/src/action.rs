//! Hooks that run around a phase body.

use std::sync::Arc;

use crate::PhaseResult;

/// What an action is told about the phase it runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    pub phase: String,
    /// Nesting depth of the phase in its tree; top-level phases are at 0.
    pub depth: usize,
    /// 1-based sequence number of the phase within the current run.
    pub sequence: usize,
    /// Whether conditions are checked for this phase.
    pub check_conditions: bool,
}

/// Runs before a phase body and sees only the phase input.
pub trait PreAction<I, C>: Send + Sync {
    fn invoke(&self, state: &ActionState, input: &I, ctx: &mut C) -> PhaseResult<()>;
}

/// Runs after a phase body and sees both input and output.
///
/// For in-place lowering phases input and output are the same value.
pub trait PostAction<I, O, C>: Send + Sync {
    fn invoke(&self, state: &ActionState, input: &I, output: &O, ctx: &mut C) -> PhaseResult<()>;
}

impl<I, C, F> PreAction<I, C> for F
where
    F: Fn(&ActionState, &I, &mut C) -> PhaseResult<()> + Send + Sync,
{
    fn invoke(&self, state: &ActionState, input: &I, ctx: &mut C) -> PhaseResult<()> {
        self(state, input, ctx)
    }
}

impl<I, O, C, F> PostAction<I, O, C> for F
where
    F: Fn(&ActionState, &I, &O, &mut C) -> PhaseResult<()> + Send + Sync,
{
    fn invoke(&self, state: &ActionState, input: &I, output: &O, ctx: &mut C) -> PhaseResult<()> {
        self(state, input, output, ctx)
    }
}

/// A named check over phase state. `Err` carries the failure message.
pub struct Condition<S> {
    name: String,
    check: Arc<dyn Fn(&S) -> Result<(), String> + Send + Sync>,
}

impl<S> Condition<S> {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&S) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, state: &S) -> Result<(), String> {
        (self.check)(state)
    }
}

impl<S> Clone for Condition<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            check: Arc::clone(&self.check),
        }
    }
}

impl<S> std::fmt::Debug for Condition<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Condition").field(&self.name).finish()
    }
}

/// Conditions a lowering phase declares on its state.
pub struct Conditions<S> {
    pub pre: Vec<Condition<S>>,
    pub post: Vec<Condition<S>>,
    /// Re-checked before every later phase once registered.
    pub sticky_post: Vec<Condition<S>>,
}

impl<S> Default for Conditions<S> {
    fn default() -> Self {
        Self {
            pre: Vec::new(),
            post: Vec::new(),
            sticky_post: Vec::new(),
        }
    }
}
