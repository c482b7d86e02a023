//! Phases command report data structures.

use kiln_config::Target;

use super::output::{Output, Report};

/// The lowering tree of one target.
#[derive(Debug)]
pub struct PhasesReport {
    pub target: Target,
    /// The tree as printed by the phase engine.
    pub listing: Option<String>,
    /// Errors that kept the tree from being listed.
    pub errors: Vec<String>,
}

impl Report for PhasesReport {
    fn render(&self, out: &mut dyn Output) {
        for error in &self.errors {
            out.error(error);
        }
        if let Some(listing) = &self.listing {
            out.title(&format!("Lowering phases ({})", self.target));
            out.preformatted(listing);
        }
    }
}
