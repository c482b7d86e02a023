use kiln_core::CompilationCanceled;
use thiserror::Error;

/// Result of running a phase body or an action.
pub type PhaseResult<T> = Result<T, Interrupt>;

/// A structured transfer of control out of the current pipeline step.
///
/// Phases and actions never catch these; they unwind through the engine to
/// the step boundary, which turns them into a step status.
#[derive(Debug, Error)]
pub enum Interrupt {
    /// Abort the current step. Problems in the user's code are expected to be
    /// in the diagnostics collector already; `definitely_compiler_error`
    /// marks a failure that is a bug in the compiler itself.
    #[error("pipeline step failed")]
    StepFailed { definitely_compiler_error: bool },

    /// Stop the whole pipeline successfully.
    #[error("pipeline finished early")]
    Finished,

    #[error(transparent)]
    Canceled(#[from] CompilationCanceled),

    /// An unexpected failure. Propagates past the step boundary to the driver.
    #[error("{0}")]
    Fatal(eyre::Report),
}

impl Interrupt {
    pub fn step_failed() -> Self {
        Interrupt::StepFailed {
            definitely_compiler_error: false,
        }
    }

    pub fn compiler_error() -> Self {
        Interrupt::StepFailed {
            definitely_compiler_error: true,
        }
    }

    pub fn fatal(message: impl std::fmt::Display) -> Self {
        Interrupt::Fatal(eyre::eyre!("{}", message))
    }
}

impl From<eyre::Report> for Interrupt {
    fn from(report: eyre::Report) -> Self {
        match report.downcast::<CompilationCanceled>() {
            Ok(canceled) => Interrupt::Canceled(canceled),
            Err(report) => Interrupt::Fatal(report),
        }
    }
}

impl From<std::io::Error> for Interrupt {
    fn from(err: std::io::Error) -> Self {
        Interrupt::Fatal(err.into())
    }
}
