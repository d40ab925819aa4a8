//! # Memory Management
//!
//! Arena sub-allocation for long-lived, variably sized regions.
//!
//! ## Design Philosophy
//!
//! All bookkeeping is sized once, up front. At runtime:
//! - Free ranges are tracked in a fixed-capacity node pool
//! - Allocation is first-fit, freeing merges neighbours
//! - Every failure is returned, never panicked

mod bump;
mod free_list;
mod node_pool;
mod sub_allocator;
mod zero;

pub use bump::BumpAllocator;
pub use free_list::{FreeList, FreeListStats, FreeRange, Iter};
pub use node_pool::{FreeNode, NodeId, NodePool};
pub use sub_allocator::SubAllocator;
pub use zero::{is_zeroed, zero_fill};
