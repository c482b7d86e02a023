//! Tracing subscriber setup for the `kiln` binary.

use clap::ValueEnum;
use eyre::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How log lines are written to standard error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// The level filter for the given verbosity. `RUST_LOG` wins when set.
fn filter(verbose: u8, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    EnvFilter::new(level)
}

pub fn setup(verbose: u8, quiet: bool, format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(verbose, quiet));
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    match format {
        LogFormat::Pretty => registry.with(formatter).try_init()?,
        LogFormat::Json => registry.with(formatter.json()).try_init()?,
    }
    Ok(())
}
