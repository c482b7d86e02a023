use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for configuration operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source context for error reporting on a `kiln.toml` document.
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    /// Create a NamedSource for miette error reporting.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    pub fn parse_error(&self, source: toml::de::Error) -> Box<Error> {
        let span = source.span().map(SourceSpan::from);
        Box::new(Error::Parse {
            src: self.named_source(),
            span,
            source,
        })
    }

    pub fn validation_error(&self, message: impl Into<String>, span: Option<SourceSpan>) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.named_source(),
            span,
            message: message.into(),
        })
    }

    /// Locate the first occurrence of a quoted string value, for labels.
    pub fn find_string_span(&self, value: &str) -> Option<SourceSpan> {
        self.find_string_spans(value).into_iter().next()
    }

    /// Locate every occurrence of a quoted string value.
    pub fn find_string_spans(&self, value: &str) -> Vec<SourceSpan> {
        let quoted = format!("\"{}\"", value);
        self.src
            .match_indices(&quoted)
            .map(|(pos, _)| SourceSpan::from((pos + 1, value.len())))
            .collect()
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(help("pass the project file with --config, or run from the directory holding kiln.toml"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse kiln.toml")]
    #[diagnostic(code(kiln::parse_error))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("duplicate module '{name}'")]
    #[diagnostic(
        code(kiln::duplicate_module),
        help("every [[modules]] entry needs a distinct name")
    )]
    DuplicateModule {
        #[source_code]
        src: NamedSource<String>,
        #[label("first declared here")]
        first_span: SourceSpan,
        #[label("declared again here")]
        second_span: SourceSpan,
        name: String,
    },

    #[error("{message}")]
    #[diagnostic(code(kiln::validation_error))]
    Validation {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("{message}")]
    #[diagnostic(code(kiln::invalid_arguments))]
    InvalidArguments { message: String },
}

impl Error {
    pub fn invalid_arguments(message: impl Into<String>) -> Box<Self> {
        Box::new(Error::InvalidArguments {
            message: message.into(),
        })
    }
}
