//! Core operations.
//!
//! This module contains the business logic for kiln commands,
//! separated from CLI argument parsing and output rendering.

pub mod check;
pub mod compile;
pub mod phases;

pub use check::check;
pub use compile::compile;
pub use phases::phases;

use kiln_core::{Message, Severity};

/// Messages of a finished run, split by severity and formatted for reports.
#[derive(Debug, Default)]
pub(crate) struct Messages {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
}

impl Messages {
    pub fn classify(messages: Vec<Message>) -> Self {
        let mut classified = Self::default();
        for message in messages {
            let text = match &message.location {
                Some(loc) => format!("{}\n  --> {}", message.text, loc),
                None => message.text,
            };
            match message.severity {
                Severity::Exception | Severity::Error => classified.errors.push(text),
                Severity::Warning => classified.warnings.push(text),
                Severity::Info => classified.infos.push(text),
                Severity::Logging => {}
            }
        }
        classified
    }
}
