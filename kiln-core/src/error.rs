use std::collections::TryReserveError;

use thiserror::Error;

/// An allocation the compiler could not satisfy.
///
/// Carried inside an `eyre::Report` up to the driver, which maps it to the
/// out-of-memory exit code.
#[derive(Debug, Error)]
#[error("out of memory while {context}")]
pub struct OutOfMemory {
    pub context: String,
    #[source]
    pub source: Option<TryReserveError>,
}

impl OutOfMemory {
    pub fn new(context: impl Into<String>, source: TryReserveError) -> Self {
        Self {
            context: context.into(),
            source: Some(source),
        }
    }
}

/// Find the first error of type `E` anywhere in the cause chain of `report`.
pub fn find_cause<E>(report: &eyre::Report) -> Option<&E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    report.chain().find_map(|cause| cause.downcast_ref::<E>())
}

/// Whether an error of type `E` appears anywhere in the cause chain of `report`.
pub fn has_cause<E>(report: &eyre::Report) -> bool
where
    E: std::error::Error + Send + Sync + 'static,
{
    find_cause::<E>(report).is_some()
}

#[cfg(test)]
mod tests {
    use eyre::WrapErr;

    use super::*;
    use crate::CompilationCanceled;

    #[test]
    fn test_cause_found_through_context() {
        let result: eyre::Result<()> = Err(CompilationCanceled { reason: None })
            .wrap_err("codegen failed for module 'app'")
            .wrap_err("backend failed");
        let report = result.unwrap_err();

        assert!(has_cause::<CompilationCanceled>(&report));
        assert!(!has_cause::<OutOfMemory>(&report));
    }

    #[test]
    fn test_out_of_memory_from_try_reserve() {
        let mut buffer: Vec<u8> = Vec::new();
        let err = buffer.try_reserve(usize::MAX).unwrap_err();
        let report = eyre::Report::new(OutOfMemory::new("emitting module 'app'", err));

        let oom = find_cause::<OutOfMemory>(&report).expect("oom cause");
        assert_eq!(oom.context, "emitting module 'app'");
    }
}
