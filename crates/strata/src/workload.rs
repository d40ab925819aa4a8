//! # Soak Workload
//!
//! Seeded random allocate/free churn against one allocator.
//!
//! ```text
//! step ──► free?  ── yes ──► pick random live block ──► check contents ──► free
//!            │
//!            └─ no ──► random size ──► allocate ──► stamp contents
//!
//! every N steps ──► verify() + free_space + live bytes == total
//! end ──► free everything (ascending) ──► expect one range spanning the arena
//! ```
//!
//! Capacity and node pool failures are expected under churn and only
//! counted. Anything else stops the run.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_core::{AllocError, AllocResult, FreeList, FreeListStats, SubAllocator};

use crate::config::{SoakConfig, SoakTarget};
use crate::error::{HarnessError, HarnessResult};

/// An allocator the soak can drive.
///
/// Handles are offsets for a [`FreeList`] and addresses for a
/// [`SubAllocator`].
pub trait SoakArena {
    /// Reserves `size` bytes.
    ///
    /// # Errors
    ///
    /// Whatever the allocator reports.
    fn allocate(&mut self, size: u64) -> AllocResult<u64>;

    /// Releases a reservation.
    ///
    /// # Errors
    ///
    /// Whatever the allocator reports.
    fn free(&mut self, handle: u64, size: u64) -> AllocResult<()>;

    /// Size of the managed arena.
    fn total_size(&self) -> u64;

    /// Free list occupancy.
    fn stats(&self) -> FreeListStats;

    /// Checks free list invariants.
    ///
    /// # Errors
    ///
    /// [`AllocError::CorruptionSuspected`] on the first violation.
    fn verify(&self) -> AllocResult<()>;

    /// Grows the arena. Returns `false` if growth is not supported.
    ///
    /// # Errors
    ///
    /// Whatever the allocator reports.
    fn grow(&mut self, _new_total_size: u64) -> AllocResult<bool> {
        Ok(false)
    }

    /// Writes `tag` over a reservation. No-op without backing memory.
    fn stamp(&mut self, _handle: u64, _size: u64, _tag: u8) {}

    /// Returns false if a reservation no longer holds `tag`.
    fn holds(&self, _handle: u64, _size: u64, _tag: u8) -> bool {
        true
    }
}

impl SoakArena for FreeList {
    fn allocate(&mut self, size: u64) -> AllocResult<u64> {
        self.allocate_block(size)
    }

    fn free(&mut self, handle: u64, size: u64) -> AllocResult<()> {
        self.free_block(size, handle)
    }

    fn total_size(&self) -> u64 {
        FreeList::total_size(self)
    }

    fn stats(&self) -> FreeListStats {
        FreeList::stats(self)
    }

    fn verify(&self) -> AllocResult<()> {
        FreeList::verify(self)
    }

    fn grow(&mut self, new_total_size: u64) -> AllocResult<bool> {
        self.resize(new_total_size)?;
        Ok(true)
    }
}

impl SoakArena for SubAllocator {
    fn allocate(&mut self, size: u64) -> AllocResult<u64> {
        SubAllocator::allocate(self, size as usize).map(|address| address as u64)
    }

    fn free(&mut self, handle: u64, size: u64) -> AllocResult<()> {
        SubAllocator::free(self, handle as usize, size as usize)
    }

    fn total_size(&self) -> u64 {
        SubAllocator::total_size(self) as u64
    }

    fn stats(&self) -> FreeListStats {
        SubAllocator::stats(self)
    }

    fn verify(&self) -> AllocResult<()> {
        self.tracker().verify()
    }

    fn stamp(&mut self, handle: u64, size: u64, tag: u8) {
        if let Some(bytes) = self.bytes_mut(handle as usize, size as usize) {
            bytes.fill(tag);
        }
    }

    fn holds(&self, handle: u64, size: u64, tag: u8) -> bool {
        self.bytes(handle as usize, size as usize)
            .is_some_and(|bytes| bytes.iter().all(|&b| b == tag))
    }
}

/// Outcome of a soak run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoakReport {
    /// Steps executed.
    pub operations: u64,
    /// Successful allocations.
    pub allocations: u64,
    /// Allocations refused for lack of a large enough range.
    pub allocation_failures: u64,
    /// Successful frees.
    pub frees: u64,
    /// Frees refused because the node pool was full.
    pub node_pool_failures: u64,
    /// Most disjoint free ranges seen at once.
    pub peak_fragments: usize,
    /// Most bytes allocated at once.
    pub peak_used: u64,
    /// Whether the arena was grown mid-run.
    pub grew: bool,
    /// Arena size at the end of the run.
    pub total_size: u64,
    /// Free bytes after releasing everything.
    pub final_free_space: u64,
}

impl SoakReport {
    /// True if releasing everything gave the whole arena back.
    #[must_use]
    pub const fn restored(&self) -> bool {
        self.final_free_space == self.total_size
    }
}

impl fmt::Display for SoakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "operations:          {}", self.operations)?;
        writeln!(f, "allocations:         {}", self.allocations)?;
        writeln!(f, "allocation failures: {}", self.allocation_failures)?;
        writeln!(f, "frees:               {}", self.frees)?;
        writeln!(f, "node pool failures:  {}", self.node_pool_failures)?;
        writeln!(f, "peak fragments:      {}", self.peak_fragments)?;
        writeln!(f, "peak used bytes:     {}", self.peak_used)?;
        writeln!(f, "grew:                {}", self.grew)?;
        write!(
            f,
            "final free space:    {} / {} ({})",
            self.final_free_space,
            self.total_size,
            if self.restored() { "restored" } else { "LEAKED" }
        )
    }
}

/// A reservation held by the soak.
#[derive(Clone, Copy, Debug)]
struct Block {
    handle: u64,
    size: u64,
    tag: u8,
}

/// Runs the configured soak.
///
/// # Errors
///
/// [`HarnessError::Alloc`] on any allocator error other than capacity or node
/// pool exhaustion, or on an invariant violation.
pub fn run(config: &SoakConfig) -> HarnessResult<SoakReport> {
    config.validate()?;
    match config.target {
        SoakTarget::FreeList => run_on(FreeList::new(config.arena.size)?, config),
        SoakTarget::SubAllocator => {
            let size = usize::try_from(config.arena.size).map_err(|_| {
                HarnessError::InvalidConfig(format!(
                    "arena.size ({}) does not fit in memory",
                    config.arena.size
                ))
            })?;
            run_on(SubAllocator::new(size)?, config)
        }
    }
}

/// Runs the configured workload against `arena`.
///
/// # Errors
///
/// As [`run`].
pub fn run_on<A: SoakArena>(mut arena: A, config: &SoakConfig) -> HarnessResult<SoakReport> {
    let workload = &config.workload;
    let mut rng = StdRng::seed_from_u64(workload.seed);
    let mut live: Vec<Block> = Vec::new();
    let mut used = 0u64;
    let mut report = SoakReport::default();
    let grow_at = config.arena.grow_to.map(|to| (workload.operations / 2, to));

    tracing::info!(
        "Soak starting: {:?}, {} bytes, {} operations, seed {}",
        config.target,
        arena.total_size(),
        workload.operations,
        workload.seed
    );

    for step in 0..workload.operations {
        if let Some((at, to)) = grow_at {
            if step == at && arena.grow(to)? {
                report.grew = true;
                tracing::info!("Arena grown to {} bytes at step {}", to, step);
            }
        }

        if !live.is_empty() && rng.gen_bool(workload.free_probability) {
            let index = rng.gen_range(0..live.len());
            let block = live[index];
            if !arena.holds(block.handle, block.size, block.tag) {
                return Err(AllocError::CorruptionSuspected {
                    offset: block.handle,
                    reason: "allocation contents overwritten",
                }
                .into());
            }
            match arena.free(block.handle, block.size) {
                Ok(()) => {
                    live.swap_remove(index);
                    used -= block.size;
                    report.frees += 1;
                }
                Err(AllocError::NodePoolExhausted { .. }) => report.node_pool_failures += 1,
                Err(err) => return Err(err.into()),
            }
        } else {
            let size = rng.gen_range(workload.min_allocation..=workload.max_allocation);
            match arena.allocate(size) {
                Ok(handle) => {
                    let tag = (step % 255) as u8 + 1;
                    arena.stamp(handle, size, tag);
                    live.push(Block { handle, size, tag });
                    used += size;
                    report.allocations += 1;
                }
                Err(AllocError::CapacityExhausted { .. }) => report.allocation_failures += 1,
                Err(err) => return Err(err.into()),
            }
        }

        report.operations += 1;
        report.peak_used = report.peak_used.max(used);

        if (step + 1) % workload.verify_every == 0 {
            arena.verify()?;
            let stats = arena.stats();
            report.peak_fragments = report.peak_fragments.max(stats.fragments);
            if stats.free_space + used != arena.total_size() {
                return Err(AllocError::CorruptionSuspected {
                    offset: 0,
                    reason: "free space and live allocations disagree",
                }
                .into());
            }
        }
    }

    // Ascending order: each free touches the range freed before it.
    live.sort_unstable_by_key(|block| block.handle);
    for block in live.drain(..) {
        arena.free(block.handle, block.size)?;
    }
    arena.verify()?;

    report.total_size = arena.total_size();
    report.final_free_space = arena.stats().free_space;

    tracing::info!(
        "Soak finished: {} allocations, {} frees, peak {} fragments",
        report.allocations,
        report.frees,
        report.peak_fragments
    );
    Ok(report)
}
