//! # STRATA Soak Harness
//!
//! Drives the `strata_core` allocators with seeded random workloads and checks
//! the free list invariants as it goes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata::{SoakConfig, workload};
//!
//! let config = SoakConfig::load("soak.toml")?;
//! let report = workload::run(&config)?;
//! assert!(report.restored());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod workload;

pub use config::{ArenaConfig, SoakConfig, SoakTarget, WorkloadConfig};
pub use error::{HarnessError, HarnessResult};
pub use workload::{SoakArena, SoakReport};
