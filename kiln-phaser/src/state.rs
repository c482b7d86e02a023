/// The engine's cursor through a run of phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaserState {
    /// Current nesting depth; top-level phases run at 0.
    pub depth: usize,
    /// Number of phases entered so far; numbers dump files.
    pub phase_count: usize,
    /// Phases whose body finished, in completion order.
    pub already_done: Vec<String>,
    /// Set once sticky postconditions were registered. Never reset.
    pub sticky_engaged: bool,
}

impl PhaserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether conditions are checked for the next phase.
    pub fn check_conditions(&self, configured: bool) -> bool {
        configured || self.sticky_engaged
    }

    pub fn engage_sticky(&mut self) {
        if !self.sticky_engaged {
            tracing::debug!("sticky condition checking engaged");
        }
        self.sticky_engaged = true;
    }

    pub fn has_run(&self, phase: &str) -> bool {
        self.already_done.iter().any(|done| done.eq_ignore_ascii_case(phase))
    }
}
