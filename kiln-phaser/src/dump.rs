//! Phase state dumps.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use kiln_core::Severity;

use crate::{PhaseContext, PhaseResult, PhaseState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeforeOrAfter {
    Before,
    After,
}

impl fmt::Display for BeforeOrAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BeforeOrAfter::Before => "before",
            BeforeOrAfter::After => "after",
        })
    }
}

/// Writes phase state to the dump directory, or to the message collector when
/// no directory is configured.
#[derive(Debug, Clone, Default)]
pub struct StateDumper {
    directory: Option<PathBuf>,
    fq_filter: Option<String>,
}

impl StateDumper {
    pub fn new(directory: Option<PathBuf>, fq_filter: Option<String>) -> Self {
        Self { directory, fq_filter }
    }

    /// A dumper writing under `subdirectory` of this one's directory.
    pub fn nested(&self, subdirectory: &str) -> Self {
        Self {
            directory: self.directory.as_ref().map(|dir| dir.join(subdirectory)),
            fq_filter: self.fq_filter.clone(),
        }
    }

    /// File a dump is written to: `{sequence:03}_{phase}.{before|after}.json`.
    pub fn file_name(sequence: usize, phase: &str, when: BeforeOrAfter) -> String {
        format!("{:03}_{}.{}.json", sequence, phase, when)
    }

    pub fn dump<C, S>(
        &self,
        ctx: &C,
        phase: &str,
        sequence: usize,
        when: BeforeOrAfter,
        state: &S,
    ) -> PhaseResult<Option<PathBuf>>
    where
        C: PhaseContext + ?Sized,
        S: PhaseState + ?Sized,
    {
        let Some(content) = state.dump_state(self.fq_filter.as_deref())? else {
            tracing::debug!(phase, %when, "state has nothing to dump");
            return Ok(None);
        };

        match &self.directory {
            Some(directory) => {
                let path = write_dump(directory, &Self::file_name(sequence, phase, when), &content)?;
                tracing::debug!(phase, %when, path = %path.display(), "dumped phase state");
                Ok(Some(path))
            }
            None => {
                ctx.messages().report(
                    Severity::Logging,
                    &format!("Dump of '{}' {}:\n{}", phase, when, content),
                    None,
                );
                Ok(None)
            }
        }
    }
}

fn write_dump(directory: &Path, file_name: &str, content: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let path = directory.join(file_name);
    fs::write(&path, content)?;
    Ok(path)
}
