//! # Allocation Error Types
//!
//! All errors that can occur while tracking or handing out arena memory.
//! Every error is local and recoverable; the caller decides whether to
//! retry, escalate, or abort.

use thiserror::Error;

/// Errors that can occur in the memory subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// A size argument was zero where a positive size is required.
    #[error("{what} must be greater than zero")]
    ZeroSize {
        /// Which size was zero.
        what: &'static str,
    },

    /// No single free range is large enough for the request.
    #[error("out of arena space: requested {requested} bytes, {free} free (largest range {largest})")]
    CapacityExhausted {
        /// Bytes requested.
        requested: u64,
        /// Total free bytes across all ranges.
        free: u64,
        /// Largest single free range.
        largest: u64,
    },

    /// Every node slot is in use; the range could not be recorded.
    #[error("free list node pool exhausted: all {max_entries} slots in use")]
    NodePoolExhausted {
        /// Capacity of the node pool.
        max_entries: usize,
    },

    /// A freed range reaches outside the tracked arena.
    #[error("freed range [{offset}, +{size}) lies outside arena of {total_size} bytes")]
    OutOfRangeFree {
        /// Offset of the freed range.
        offset: u64,
        /// Size of the freed range.
        size: u64,
        /// Size of the tracked arena.
        total_size: u64,
    },

    /// An address handed back to a sub-allocator is not inside its arena.
    #[error("address {address:#x} is outside arena [{base:#x}, +{total_size})")]
    AddressOutOfRange {
        /// The offending address.
        address: usize,
        /// First address of the arena.
        base: usize,
        /// Size of the arena.
        total_size: u64,
    },

    /// Free list bookkeeping is inconsistent.
    #[error("free list corrupted at offset {offset}: {reason}")]
    CorruptionSuspected {
        /// Offset of the node where the inconsistency was found.
        offset: u64,
        /// What was wrong.
        reason: &'static str,
    },

    /// Resize target is not strictly larger than the current size.
    #[error("resize must grow the arena: current {current} bytes, requested {requested}")]
    ResizeTooSmall {
        /// Current tracked size.
        current: u64,
        /// Requested size.
        requested: u64,
    },
}

/// Result type for memory operations.
pub type AllocResult<T> = Result<T, AllocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_reports_sizes() {
        let err = AllocError::CapacityExhausted {
            requested: 128,
            free: 96,
            largest: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("96"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn test_address_formatted_as_hex() {
        let err = AllocError::AddressOutOfRange {
            address: 0x1000,
            base: 0x2000,
            total_size: 16,
        };
        assert!(err.to_string().contains("0x1000"));
    }
}
