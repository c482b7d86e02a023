//! Wall-clock measurements of a compilation.

use std::{
    fmt, fs,
    path::Path,
    time::{Duration, Instant},
};

use indexmap::IndexMap;
use kiln_core::{MessageCollector, Severity};
use serde::Serialize;

/// Coarse stages of a compilation that are timed as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Initialization,
    Analysis,
    IrTranslation,
    Generation,
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Milestone::Initialization => "initialization",
            Milestone::Analysis => "analysis",
            Milestone::IrTranslation => "IR translation",
            Milestone::Generation => "generation",
        })
    }
}

/// Collects milestone and per-phase timings for `report_perf` and `dump_perf`.
#[derive(Debug, Default)]
pub struct PerformanceManager {
    running: IndexMap<Milestone, Instant>,
    milestones: IndexMap<Milestone, Duration>,
    phases: IndexMap<String, Duration>,
    source_files: usize,
}

#[derive(Serialize)]
struct PerfEntry<'a> {
    name: &'a str,
    millis: f64,
}

#[derive(Serialize)]
struct PerfReport<'a> {
    source_files: usize,
    milestones: Vec<PerfEntry<'a>>,
    phases: Vec<PerfEntry<'a>>,
}

impl PerformanceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, milestone: Milestone) {
        self.running.insert(milestone, Instant::now());
    }

    /// Stop timing `milestone`. A milestone that was never started is ignored.
    pub fn finish(&mut self, milestone: Milestone) {
        match self.running.shift_remove(&milestone) {
            Some(started) => {
                let elapsed = started.elapsed();
                tracing::debug!(%milestone, elapsed_ms = millis(elapsed), "milestone finished");
                *self.milestones.entry(milestone).or_default() += elapsed;
            }
            None => tracing::debug!(%milestone, "finish without start"),
        }
    }

    /// Accumulate time spent in a phase. Phases run once per module, so the
    /// same name may be recorded several times.
    pub fn record_phase(&mut self, phase: &str, elapsed: Duration) {
        *self.phases.entry(phase.to_string()).or_default() += elapsed;
    }

    pub fn add_source_files(&mut self, count: usize) {
        self.source_files += count;
    }

    pub fn milestone(&self, milestone: Milestone) -> Option<Duration> {
        self.milestones.get(&milestone).copied()
    }

    pub fn phase(&self, phase: &str) -> Option<Duration> {
        self.phases.get(phase).copied()
    }

    /// Report finished measurements as `PERF:` messages.
    pub fn report(&self, messages: &dyn MessageCollector) {
        messages.report(
            Severity::Info,
            &format!("PERF: {} source files", self.source_files),
            None,
        );
        for (milestone, elapsed) in &self.milestones {
            messages.report(
                Severity::Info,
                &format!("PERF: {} took {:.3} ms", milestone, millis(*elapsed)),
                None,
            );
        }
        for (phase, elapsed) in &self.phases {
            messages.report(
                Severity::Info,
                &format!("PERF: phase {} took {:.3} ms", phase, millis(*elapsed)),
                None,
            );
        }
    }

    /// Write the measurements to `path` as JSON.
    pub fn dump(&self, path: &Path) -> eyre::Result<()> {
        let names: Vec<String> = self.milestones.keys().map(ToString::to_string).collect();
        let report = PerfReport {
            source_files: self.source_files,
            milestones: names
                .iter()
                .zip(self.milestones.values())
                .map(|(name, elapsed)| PerfEntry {
                    name,
                    millis: millis(*elapsed),
                })
                .collect(),
            phases: self
                .phases
                .iter()
                .map(|(name, elapsed)| PerfEntry {
                    name,
                    millis: millis(*elapsed),
                })
                .collect(),
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::debug!(path = %path.display(), "wrote performance report");
        Ok(())
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use kiln_core::CollectingMessageCollector;

    use super::*;

    #[test]
    fn test_unstarted_milestone_is_not_recorded() {
        let mut perf = PerformanceManager::new();
        perf.finish(Milestone::Analysis);
        assert_eq!(perf.milestone(Milestone::Analysis), None);

        perf.start(Milestone::Analysis);
        perf.finish(Milestone::Analysis);
        assert!(perf.milestone(Milestone::Analysis).is_some());
    }

    #[test]
    fn test_phase_times_accumulate() {
        let mut perf = PerformanceManager::new();
        perf.record_phase("const-folding", Duration::from_millis(2));
        perf.record_phase("const-folding", Duration::from_millis(3));
        assert_eq!(perf.phase("const-folding"), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_report_lines() {
        let mut perf = PerformanceManager::new();
        perf.add_source_files(2);
        perf.record_phase("lowerings", Duration::from_millis(1));
        let sink = CollectingMessageCollector::new();

        perf.report(&sink);

        let texts: Vec<_> = sink.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts[0], "PERF: 2 source files");
        assert!(texts[1].starts_with("PERF: phase lowerings took"));
    }

    #[test]
    fn test_dump_writes_json() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("perf").join("report.json");
        let mut perf = PerformanceManager::new();
        perf.start(Milestone::Generation);
        perf.finish(Milestone::Generation);

        perf.dump(&path).expect("dump succeeds");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("file written")).expect("valid json");
        assert_eq!(value["milestones"][0]["name"], "generation");
    }
}
