//! # STRATA Core
//!
//! Arena memory management for long-running simulations:
//! - One up-front allocation per arena
//! - Variable-size regions freed individually
//! - Bookkeeping bounded by the arena size, never grown in the hot path
//!
//! ## Architecture
//!
//! ```text
//! SubAllocator ──► FreeList ──► NodePool
//!      │
//!      └──► arena bytes
//! ```
//!
//! 1. **`NodePool`** - fixed slab of free list nodes, recycled by index
//! 2. **`FreeList`** - offset-ordered free ranges, first-fit with coalescing
//! 3. **`SubAllocator`** - maps free list offsets onto a real arena
//!
//! ## Example
//!
//! ```rust
//! use strata_core::SubAllocator;
//!
//! let mut heap = SubAllocator::new(64 * 1024)?;
//! let mesh = heap.allocate(4096)?;
//! let audio = heap.allocate(1024)?;
//!
//! heap.free(mesh, 4096)?;
//! heap.free(audio, 1024)?;
//! assert_eq!(heap.free_space(), 64 * 1024);
//! # Ok::<(), strata_core::AllocError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod memory;

pub use error::{AllocError, AllocResult};
pub use memory::{
    BumpAllocator, FreeList, FreeListStats, FreeRange, NodePool, SubAllocator,
};
