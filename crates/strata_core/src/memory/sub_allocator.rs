//! # Sub-Allocator
//!
//! General-purpose allocator over a single owned arena.
//!
//! ```text
//! SubAllocator
//!   ├─→ FreeList  (which offsets are free)
//!   └─→ arena     [u8; total_size], zeroed at creation
//!
//! allocate(size)        → free_list.allocate_block(size) → base + offset
//! free(address, size)   → offset = address - base → free_list.free_block(size, offset)
//! ```
//!
//! The allocator keeps no per-allocation records. A size/address pair that
//! does not match an earlier allocation cannot be detected here; callers
//! must hand back exactly what they were given.

use super::free_list::{FreeList, FreeListStats};
use super::zero::zero_fill;
use crate::error::{AllocError, AllocResult};

/// Variable-size allocator over a fixed arena.
///
/// Addresses are plain integers inside `[base_address, base_address +
/// total_size)`. Use [`bytes`](Self::bytes) and [`bytes_mut`](Self::bytes_mut)
/// to reach the memory behind an address.
///
/// # Thread Safety
///
/// NOT thread-safe. Wrap it in a lock if several threads need it.
///
/// # Example
///
/// ```rust
/// use strata_core::SubAllocator;
///
/// let mut heap = SubAllocator::new(512)?;
/// let address = heap.allocate(64)?;
/// heap.bytes_mut(address, 64).unwrap().fill(7);
///
/// heap.free(address, 64)?;
/// assert_eq!(heap.free_space(), 512);
/// # Ok::<(), strata_core::AllocError>(())
/// ```
#[derive(Debug)]
pub struct SubAllocator {
    /// Free range bookkeeping.
    tracker: FreeList,
    /// The managed bytes.
    arena: Box<[u8]>,
}

impl SubAllocator {
    /// Fixed bookkeeping cost of the allocator itself.
    pub const HEADER_BYTES: u64 = std::mem::size_of::<Self>() as u64;

    /// Returns the bytes an allocator over `total_size` bytes occupies:
    /// its header, the free list metadata and the arena itself.
    ///
    /// # Errors
    ///
    /// [`AllocError::ZeroSize`] if `total_size` is zero.
    pub fn required_bytes(total_size: usize) -> AllocResult<u64> {
        let tracker = FreeList::required_bytes(total_size as u64)?;
        Ok(Self::HEADER_BYTES + tracker + total_size as u64)
    }

    /// Creates an allocator over a zeroed arena of `total_size` bytes.
    ///
    /// # Errors
    ///
    /// [`AllocError::ZeroSize`] if `total_size` is zero.
    pub fn new(total_size: usize) -> AllocResult<Self> {
        let tracker = FreeList::new(total_size as u64)?;
        let arena = vec![0u8; total_size].into_boxed_slice();

        tracing::debug!(
            "Sub-allocator created: {} byte arena, {} bytes of metadata",
            total_size,
            tracker.metadata_bytes()
        );

        Ok(Self { tracker, arena })
    }

    /// Returns the arena size in bytes.
    #[inline]
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.arena.len()
    }

    /// Returns the address of the first arena byte.
    #[inline]
    #[must_use]
    pub fn base_address(&self) -> usize {
        self.arena.as_ptr() as usize
    }

    /// Returns true if `address` lies inside the arena.
    #[inline]
    #[must_use]
    pub fn contains(&self, address: usize) -> bool {
        self.offset_of(address).is_ok()
    }

    /// Translates an address into an arena offset.
    ///
    /// # Errors
    ///
    /// [`AllocError::AddressOutOfRange`] if `address` is outside the arena.
    pub fn offset_of(&self, address: usize) -> AllocResult<usize> {
        let base = self.base_address();
        address
            .checked_sub(base)
            .filter(|&offset| offset < self.arena.len())
            .ok_or(AllocError::AddressOutOfRange {
                address,
                base,
                total_size: self.arena.len() as u64,
            })
    }

    /// Reserves `size` bytes and returns the address of the first one.
    ///
    /// # Errors
    ///
    /// Whatever [`FreeList::allocate_block`] reports. Nothing changes on
    /// failure.
    pub fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        match self.tracker.allocate_block(size as u64) {
            Ok(offset) => Ok(self.base_address() + offset as usize),
            Err(err) => {
                tracing::error!(
                    "Allocation of {} bytes failed with {} bytes free: {}",
                    size,
                    self.tracker.free_space(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Returns `size` bytes starting at `address` to the arena.
    ///
    /// # Errors
    ///
    /// - [`AllocError::AddressOutOfRange`] if `address` is outside the arena.
    /// - Whatever [`FreeList::free_block`] reports.
    pub fn free(&mut self, address: usize, size: usize) -> AllocResult<()> {
        let result = self
            .offset_of(address)
            .and_then(|offset| self.tracker.free_block(size as u64, offset as u64));

        if let Err(err) = &result {
            tracing::error!(
                "Free of {} bytes at {:#x} failed with {} bytes free: {}",
                size,
                address,
                self.tracker.free_space(),
                err
            );
        }
        result
    }

    /// Returns the bytes behind an allocation.
    ///
    /// Returns `None` if the region does not fit inside the arena.
    #[must_use]
    pub fn bytes(&self, address: usize, size: usize) -> Option<&[u8]> {
        let offset = self.offset_of(address).ok()?;
        self.arena.get(offset..offset.checked_add(size)?)
    }

    /// Returns the bytes behind an allocation, mutably.
    ///
    /// Returns `None` if the region does not fit inside the arena.
    pub fn bytes_mut(&mut self, address: usize, size: usize) -> Option<&mut [u8]> {
        let offset = self.offset_of(address).ok()?;
        self.arena.get_mut(offset..offset.checked_add(size)?)
    }

    /// Returns the total free bytes.
    #[must_use]
    pub fn free_space(&self) -> u64 {
        self.tracker.free_space()
    }

    /// Returns an occupancy snapshot of the free list.
    #[must_use]
    pub fn stats(&self) -> FreeListStats {
        self.tracker.stats()
    }

    /// Returns the free list backing this allocator.
    #[inline]
    #[must_use]
    pub const fn tracker(&self) -> &FreeList {
        &self.tracker
    }

    /// Frees everything and zeroes the arena.
    ///
    /// Every address handed out so far becomes invalid.
    pub fn reset(&mut self) {
        self.tracker.clear();
        zero_fill(&mut self.arena);
    }

    /// Tears the allocator down, zeroing the arena.
    pub fn destroy(self) {
        tracing::debug!("Sub-allocator destroyed: {} byte arena", self.arena.len());
    }
}

impl Drop for SubAllocator {
    fn drop(&mut self) {
        zero_fill(&mut self.arena);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::zero::is_zeroed;

    #[test]
    fn test_arena_starts_zeroed() {
        let heap = SubAllocator::new(256).unwrap();
        assert!(is_zeroed(heap.bytes(heap.base_address(), 256).unwrap()));
    }

    #[test]
    fn test_addresses_are_base_plus_offset() {
        let mut heap = SubAllocator::new(512).unwrap();
        let base = heap.base_address();

        assert_eq!(heap.allocate(64).unwrap(), base);
        assert_eq!(heap.allocate(64).unwrap(), base + 64);
        assert_eq!(heap.offset_of(base + 64).unwrap(), 64);
    }

    #[test]
    fn test_middle_block_reused() {
        let mut heap = SubAllocator::new(512).unwrap();
        let a = heap.allocate(64).unwrap();
        let b = heap.allocate(64).unwrap();
        let c = heap.allocate(64).unwrap();

        heap.free(b, 64).unwrap();
        assert_eq!(heap.allocate(64).unwrap(), b);

        heap.free(a, 64).unwrap();
        heap.free(b, 64).unwrap();
        heap.free(c, 64).unwrap();
        assert_eq!(heap.free_space(), 512);
    }

    #[test]
    fn test_free_outside_arena_rejected() {
        let mut heap = SubAllocator::new(128).unwrap();
        let base = heap.base_address();
        let _ = heap.allocate(128).unwrap();

        assert!(matches!(
            heap.free(base + 128, 1),
            Err(AllocError::AddressOutOfRange { .. })
        ));
        assert!(matches!(
            heap.free(base.wrapping_sub(1), 1),
            Err(AllocError::AddressOutOfRange { .. })
        ));
        assert!(!heap.contains(base + 128));
        assert_eq!(heap.free_space(), 0);
    }

    #[test]
    fn test_failed_allocation_has_no_side_effects() {
        let mut heap = SubAllocator::new(128).unwrap();
        let _ = heap.allocate(100).unwrap();
        let before = heap.stats();

        assert!(matches!(
            heap.allocate(64),
            Err(AllocError::CapacityExhausted { .. })
        ));
        assert_eq!(heap.stats(), before);
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut heap = SubAllocator::new(256).unwrap();
        let a = heap.allocate(16).unwrap();
        let b = heap.allocate(16).unwrap();

        heap.bytes_mut(a, 16).unwrap().copy_from_slice(&[1u8; 16]);
        heap.bytes_mut(b, 16).unwrap().copy_from_slice(&[2u8; 16]);

        assert_eq!(heap.bytes(a, 16).unwrap(), &[1u8; 16]);
        assert_eq!(heap.bytes(b, 16).unwrap(), &[2u8; 16]);
        assert!(heap.bytes(a, 257).is_none());
    }

    #[test]
    fn test_reset_zeroes_and_frees() {
        let mut heap = SubAllocator::new(128).unwrap();
        let a = heap.allocate(32).unwrap();
        heap.bytes_mut(a, 32).unwrap().fill(0xEE);

        heap.reset();
        assert_eq!(heap.free_space(), 128);
        assert!(is_zeroed(heap.bytes(heap.base_address(), 128).unwrap()));
    }

    #[test]
    fn test_required_bytes_covers_arena() {
        let required = SubAllocator::required_bytes(512).unwrap();
        let tracker = FreeList::required_bytes(512).unwrap();
        assert_eq!(required, SubAllocator::HEADER_BYTES + tracker + 512);
        assert!(SubAllocator::required_bytes(0).is_err());
        assert!(SubAllocator::new(0).is_err());
    }
}
