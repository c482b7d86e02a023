//! The pipeline steps, in the order the driver runs them.

mod backend;
mod configuration;
mod frontend;
mod module;
mod translate;

pub use backend::BackendStep;
pub use configuration::ConfigurationStep;
pub use frontend::{AnalysisHandler, FrontendStep};
pub use module::ModuleStep;
pub use translate::TranslateStep;
