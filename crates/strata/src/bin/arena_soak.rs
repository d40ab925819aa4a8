//! # Arena Soak
//!
//! Runs a seeded allocate/free soak against the STRATA allocators.
//!
//! Usage: `arena_soak [config.toml]`
//!
//! Without a path the built-in defaults are used. Set `RUST_LOG` to change
//! log verbosity (default `info`). Exits non-zero if the run fails or the
//! arena is not fully restored at the end.

use std::process::ExitCode;

use strata::{workload, SoakConfig};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SoakConfig::load(&path),
        None => Ok(SoakConfig::default()),
    };

    let report = match config.and_then(|config| workload::run(&config)) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!("Soak failed: {}", err);
            return ExitCode::FAILURE;
        }
    };

    println!("{report}");
    if report.restored() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
