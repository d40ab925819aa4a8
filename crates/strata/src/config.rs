//! # Soak Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! target = "sub_allocator"
//!
//! [arena]
//! size = 1048576
//! grow_to = 2097152
//!
//! [workload]
//! seed = 42
//! operations = 100000
//! min_allocation = 1
//! max_allocation = 4096
//! free_probability = 0.45
//! verify_every = 1
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{HarnessError, HarnessResult};

/// Which allocator the soak drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoakTarget {
    /// The bare free list, offsets only. Supports growth.
    #[default]
    FreeList,
    /// The sub-allocator, real addresses over an owned arena.
    SubAllocator,
}

/// Arena section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Bytes under management.
    pub size: u64,
    /// Grow the arena to this size halfway through the run.
    pub grow_to: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: 1024 * 1024,
            grow_to: None,
        }
    }
}

/// Workload section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// RNG seed. Same seed, same run.
    pub seed: u64,
    /// Number of allocate/free steps.
    pub operations: u64,
    /// Smallest allocation in bytes.
    pub min_allocation: u64,
    /// Largest allocation in bytes.
    pub max_allocation: u64,
    /// Chance that a step frees instead of allocating.
    pub free_probability: f64,
    /// Check invariants every N steps.
    pub verify_every: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            operations: 100_000,
            min_allocation: 1,
            max_allocation: 4096,
            free_probability: 0.45,
            verify_every: 1,
        }
    }
}

/// Complete soak configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoakConfig {
    /// Allocator under test.
    pub target: SoakTarget,
    /// Arena settings.
    pub arena: ArenaConfig,
    /// Workload settings.
    pub workload: WorkloadConfig,
}

impl SoakConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Toml`] on malformed input,
    /// [`HarnessError::InvalidConfig`] on unusable values.
    pub fn from_toml_str(text: &str) -> HarnessResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> HarnessResult<()> {
        let invalid = |msg: String| Err(HarnessError::InvalidConfig(msg));
        let arena = &self.arena;
        let workload = &self.workload;

        if arena.size == 0 {
            return invalid("arena.size must be greater than zero".into());
        }
        if let Some(grow_to) = arena.grow_to {
            if grow_to <= arena.size {
                return invalid(format!(
                    "arena.grow_to ({grow_to}) must exceed arena.size ({})",
                    arena.size
                ));
            }
            if self.target == SoakTarget::SubAllocator {
                return invalid("arena.grow_to is only supported for target = \"free_list\"".into());
            }
        }
        if workload.min_allocation == 0 {
            return invalid("workload.min_allocation must be greater than zero".into());
        }
        if workload.min_allocation > workload.max_allocation {
            return invalid(format!(
                "workload.min_allocation ({}) exceeds workload.max_allocation ({})",
                workload.min_allocation, workload.max_allocation
            ));
        }
        if !(0.0..=1.0).contains(&workload.free_probability) {
            return invalid(format!(
                "workload.free_probability ({}) must be within 0.0..=1.0",
                workload.free_probability
            ));
        }
        if workload.verify_every == 0 {
            return invalid("workload.verify_every must be greater than zero".into());
        }
        Ok(())
    }
}
