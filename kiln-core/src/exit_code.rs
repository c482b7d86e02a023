use std::fmt;

use serde::Serialize;

/// Process exit codes of a compilation.
///
/// The numeric values are an external contract shared with build tools and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    CompilationError = 1,
    InternalError = 2,
    OomError = 3,
}

impl ExitCode {
    /// The numeric process exit code.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == ExitCode::Ok
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitCode::Ok => "OK",
            ExitCode::CompilationError => "COMPILATION_ERROR",
            ExitCode::InternalError => "INTERNAL_ERROR",
            ExitCode::OomError => "OOM_ERROR",
        };
        f.write_str(name)
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_are_stable() {
        assert_eq!(ExitCode::Ok.code(), 0);
        assert_eq!(ExitCode::CompilationError.code(), 1);
        assert_eq!(ExitCode::InternalError.code(), 2);
        assert_eq!(ExitCode::OomError.code(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::CompilationError.to_string(), "COMPILATION_ERROR");
    }
}
