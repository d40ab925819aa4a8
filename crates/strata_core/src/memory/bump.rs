//! # Bump Allocator
//!
//! A monotonic allocator for scratch memory that is released all at once.

use super::zero::zero_fill;

/// A bump-pointer allocator over an owned buffer.
///
/// Allocations are fast (just bump an offset). There is no per-allocation
/// free: everything is released together by [`reset`](Self::reset).
///
/// # Thread Safety
///
/// This allocator is NOT thread-safe. Use one per thread.
///
/// # Example
///
/// ```rust
/// use strata_core::BumpAllocator;
///
/// let mut scratch = BumpAllocator::new(1024);
/// let a = scratch.allocate(10, 1).unwrap();
/// let b = scratch.allocate(16, 16).unwrap();
/// assert_eq!((a, b), (0, 16));
///
/// scratch.reset();
/// assert_eq!(scratch.used(), 0);
/// ```
#[derive(Debug)]
pub struct BumpAllocator {
    /// The backing storage.
    storage: Box<[u8]>,
    /// Current allocation offset.
    offset: usize,
}

impl BumpAllocator {
    /// Creates a bump allocator with the specified capacity in bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            offset: 0,
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the current used space in bytes, including alignment padding.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.offset
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.offset
    }

    /// Reserves `size` bytes aligned to `align` and returns their offset.
    ///
    /// Returns `None` if out of space or `align` is not a power of two.
    pub fn allocate(&mut self, size: usize, align: usize) -> Option<usize> {
        if !align.is_power_of_two() {
            return None;
        }

        let aligned = self.offset.checked_add(align - 1)? & !(align - 1);
        let end = aligned.checked_add(size)?;
        if end > self.capacity() {
            return None;
        }

        self.offset = end;
        Some(aligned)
    }

    /// Returns a previously reserved region.
    #[must_use]
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.storage.get(offset..offset.checked_add(len)?)
    }

    /// Returns a previously reserved region, mutably.
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> Option<&mut [u8]> {
        self.storage.get_mut(offset..offset.checked_add(len)?)
    }

    /// Releases every allocation and zeroes the bytes that were handed out.
    pub fn reset(&mut self) {
        zero_fill(&mut self.storage[..self.offset]);
        self.offset = 0;
    }
}
