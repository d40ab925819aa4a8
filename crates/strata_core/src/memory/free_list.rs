//! # Free List
//!
//! Tracks the free byte ranges of a fixed-size arena.
//!
//! ```text
//! arena:  [ used |  free  | used | used |     free      ]
//!         0      64       128    192    256             512
//!
//! head ──► {64, 64} ──► {256, 256} ──► None
//! ```
//!
//! Nodes are kept in strictly ascending offset order and no two live nodes
//! touch: every free merges with its neighbours before returning.
//! Allocation is first-fit, carving the request off the front of the first
//! node that is large enough.
//!
//! Bookkeeping lives in a [`NodePool`] sized from the arena
//! (`total_size / pointer width` slots), so the tracker never allocates after
//! construction. Only [`FreeList::resize`] rebuilds it.

use super::node_pool::{FreeNode, NodeId, NodePool};
use crate::error::{AllocError, AllocResult};

/// Width of a pointer in bytes. One node slot is budgeted per pointer-width
/// of arena.
const POINTER_WIDTH: u64 = std::mem::size_of::<usize>() as u64;

/// A free byte range reported by [`FreeList::iter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FreeRange {
    /// First free byte.
    pub offset: u64,
    /// Length in bytes.
    pub size: u64,
}

impl FreeRange {
    /// One past the last byte of the range.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Snapshot of free list occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FreeListStats {
    /// Size of the tracked arena.
    pub total_size: u64,
    /// Sum of all free ranges.
    pub free_space: u64,
    /// Number of disjoint free ranges.
    pub fragments: usize,
    /// Largest single free range.
    pub largest_free_block: u64,
    /// Node pool capacity.
    pub max_entries: usize,
    /// Node slots currently holding a live range.
    pub slots_in_use: usize,
}

/// First-fit free space tracker with adjacency coalescing.
///
/// # Thread Safety
///
/// NOT thread-safe. One owner mutates it at a time; callers sharing it
/// across threads must serialize access themselves.
///
/// # Example
///
/// ```rust
/// use strata_core::FreeList;
///
/// let mut list = FreeList::new(512)?;
/// let a = list.allocate_block(64)?;
/// let b = list.allocate_block(64)?;
/// assert_eq!((a, b), (0, 64));
///
/// list.free_block(64, a)?;
/// list.free_block(64, b)?;
/// assert_eq!(list.free_space(), 512);
/// assert_eq!(list.fragment_count(), 1);
/// # Ok::<(), strata_core::AllocError>(())
/// ```
#[derive(Debug)]
pub struct FreeList {
    /// Node storage.
    pool: NodePool,
    /// Lowest-offset free range. `None` when the arena is fully allocated.
    head: Option<NodeId>,
    /// Size of the tracked arena in bytes.
    total_size: u64,
    /// Node pool capacity.
    max_entries: usize,
}

impl FreeList {
    /// Fixed bookkeeping cost of the tracker itself.
    pub const HEADER_BYTES: u64 = std::mem::size_of::<Self>() as u64;

    /// Returns the node pool capacity used for an arena of `total_size` bytes.
    ///
    /// Arenas smaller than one pointer width still get a single slot.
    #[must_use]
    pub fn max_entries_for(total_size: u64) -> usize {
        ((total_size / POINTER_WIDTH) as usize).max(1)
    }

    /// Returns the metadata bytes a tracker for `total_size` bytes occupies.
    ///
    /// This is a pure query; the same input always yields the same answer.
    ///
    /// # Errors
    ///
    /// [`AllocError::ZeroSize`] if `total_size` is zero.
    pub fn required_bytes(total_size: u64) -> AllocResult<u64> {
        if total_size == 0 {
            return Err(AllocError::ZeroSize { what: "arena size" });
        }
        Ok(Self::metadata_bytes_for(Self::max_entries_for(total_size)))
    }

    fn metadata_bytes_for(max_entries: usize) -> u64 {
        Self::HEADER_BYTES + max_entries as u64 * NodePool::SLOT_BYTES
    }

    /// Creates a tracker whose single free range spans `[0, total_size)`.
    ///
    /// # Errors
    ///
    /// [`AllocError::ZeroSize`] if `total_size` is zero.
    pub fn new(total_size: u64) -> AllocResult<Self> {
        if total_size == 0 {
            return Err(AllocError::ZeroSize { what: "arena size" });
        }
        if total_size < POINTER_WIDTH {
            tracing::warn!(
                "Arena of {} bytes is smaller than one pointer width; node pool clamped to 1 slot",
                total_size
            );
        }

        let max_entries = Self::max_entries_for(total_size);
        let mut pool = NodePool::new(max_entries);
        let head = pool.acquire(FreeNode::new(0, total_size));

        tracing::debug!(
            "Free list created: {} bytes, {} node slots",
            total_size,
            max_entries
        );

        Ok(Self {
            pool,
            head,
            total_size,
            max_entries,
        })
    }

    /// Returns the size of the tracked arena.
    #[inline]
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Returns the node pool capacity.
    #[inline]
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Returns the metadata bytes this tracker occupies.
    #[inline]
    #[must_use]
    pub fn metadata_bytes(&self) -> u64 {
        Self::metadata_bytes_for(self.max_entries)
    }

    /// Returns true if no free range remains.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.head.is_none()
    }

    /// Reserves `size` bytes and returns their offset.
    ///
    /// Walks the list in ascending offset order and takes the first node that
    /// fits. An exact fit unlinks the node and recycles its slot; a larger
    /// node is shrunk from the front in place.
    ///
    /// # Errors
    ///
    /// - [`AllocError::ZeroSize`] if `size` is zero.
    /// - [`AllocError::CapacityExhausted`] if no single free range is large
    ///   enough, even if the total free space is.
    pub fn allocate_block(&mut self, size: u64) -> AllocResult<u64> {
        if size == 0 {
            return Err(AllocError::ZeroSize {
                what: "allocation size",
            });
        }

        let mut prev = None;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let node = self.node(id)?;

            if node.size == size {
                self.set_next(prev, node.next)?;
                self.pool.release(id);
                return Ok(node.offset);
            }

            if node.size > size {
                let front = self.node_mut(id)?;
                front.offset += size;
                front.size -= size;
                return Ok(node.offset);
            }

            prev = cursor;
            cursor = node.next;
        }

        Err(AllocError::CapacityExhausted {
            requested: size,
            free: self.free_space(),
            largest: self.largest_free_block(),
        })
    }

    /// Returns `[offset, offset + size)` to the free list.
    ///
    /// The range is merged with any free neighbour it touches. The tracker
    /// keeps no record of individual allocations: the caller must pass back
    /// exactly what it was given.
    ///
    /// # Errors
    ///
    /// - [`AllocError::ZeroSize`] if `size` is zero.
    /// - [`AllocError::OutOfRangeFree`] if the range reaches past the arena.
    /// - [`AllocError::CorruptionSuspected`] if the range overlaps a range
    ///   that is already free (typically a double free).
    /// - [`AllocError::NodePoolExhausted`] if the range touches no free
    ///   neighbour and no node slot is left to record it. The tracker is
    ///   unchanged; the caller still owns the range.
    ///
    /// The tracker is never modified when an error is returned.
    pub fn free_block(&mut self, size: u64, offset: u64) -> AllocResult<()> {
        if size == 0 {
            return Err(AllocError::ZeroSize { what: "free size" });
        }
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= self.total_size)
            .ok_or(AllocError::OutOfRangeFree {
                offset,
                size,
                total_size: self.total_size,
            })?;

        let mut prev: Option<NodeId> = None;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let node = self.node(id)?;

            if node.end() == offset {
                // Freed range directly follows this node.
                if let Some(next_id) = node.next {
                    if end > self.node(next_id)?.offset {
                        return Err(overlap(offset));
                    }
                }
                self.node_mut(id)?.size += size;
                self.absorb_next(id)?;
                return Ok(());
            }

            if node.offset >= offset {
                if end > node.offset {
                    return Err(overlap(offset));
                }
                if end == node.offset {
                    // Freed range directly precedes this node: grow it downward.
                    let grown = self.node_mut(id)?;
                    grown.offset = offset;
                    grown.size += size;
                    return Ok(());
                }
                let inserted = self.acquire(FreeNode {
                    offset,
                    size,
                    next: Some(id),
                })?;
                return self.set_next(prev, Some(inserted));
            }

            if node.end() > offset {
                return Err(overlap(offset));
            }

            prev = cursor;
            cursor = node.next;
        }

        // Past every free range (or the list is empty): new tail.
        let tail = self.acquire(FreeNode::new(offset, size))?;
        self.set_next(prev, Some(tail))
    }

    /// Returns the metadata bytes [`resize`](Self::resize) to `new_total_size`
    /// would require.
    ///
    /// # Errors
    ///
    /// [`AllocError::ResizeTooSmall`] unless `new_total_size` is strictly
    /// greater than the current size.
    pub fn resize_required_bytes(&self, new_total_size: u64) -> AllocResult<u64> {
        if new_total_size <= self.total_size {
            return Err(AllocError::ResizeTooSmall {
                current: self.total_size,
                requested: new_total_size,
            });
        }
        Self::required_bytes(new_total_size)
    }

    /// Grows the tracked arena to `new_total_size` bytes.
    ///
    /// Rebuilds the node pool at the larger capacity and copies every free
    /// range across. The added bytes `[old_size, new_total_size)` become free:
    /// they extend the last range if it reached the old end, otherwise they
    /// form a new trailing range.
    ///
    /// # Errors
    ///
    /// - [`AllocError::ResizeTooSmall`] unless the arena grows.
    /// - [`AllocError::NodePoolExhausted`] if the new pool cannot hold the
    ///   trailing range.
    ///
    /// On error the tracker is left exactly as it was.
    pub fn resize(&mut self, new_total_size: u64) -> AllocResult<()> {
        self.resize_required_bytes(new_total_size)?;

        let old_total = self.total_size;
        let delta = new_total_size - old_total;
        let max_entries = Self::max_entries_for(new_total_size);

        let mut pool = NodePool::new(max_entries);
        let mut head = None;
        let mut tail: Option<NodeId> = None;

        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self.node(id)?;
            let copy = pool
                .acquire(FreeNode::new(node.offset, node.size))
                .ok_or(AllocError::NodePoolExhausted { max_entries })?;
            link_tail(&mut pool, &mut head, tail, copy)?;
            tail = Some(copy);
            cursor = node.next;
        }

        let touches_end = tail
            .and_then(|id| pool.get(id))
            .is_some_and(|last| last.end() == old_total);

        match tail {
            Some(last) if touches_end => {
                if let Some(node) = pool.get_mut(last) {
                    node.size += delta;
                }
            }
            _ => {
                let trailing = pool
                    .acquire(FreeNode::new(old_total, delta))
                    .ok_or(AllocError::NodePoolExhausted { max_entries })?;
                link_tail(&mut pool, &mut head, tail, trailing)?;
            }
        }

        let retired = std::mem::replace(&mut self.pool, pool);
        tracing::debug!(
            "Free list resized: {} -> {} bytes, node slots {} -> {}",
            old_total,
            new_total_size,
            retired.capacity(),
            max_entries
        );

        self.head = head;
        self.total_size = new_total_size;
        self.max_entries = max_entries;
        Ok(())
    }

    /// Returns the total free bytes.
    ///
    /// Walks every free range, so this is O(fragments). Meant for diagnostics,
    /// not the hot path.
    #[must_use]
    pub fn free_space(&self) -> u64 {
        self.iter().map(|range| range.size).sum()
    }

    /// Returns the size of the largest free range, or zero if full.
    #[must_use]
    pub fn largest_free_block(&self) -> u64 {
        self.iter().map(|range| range.size).max().unwrap_or(0)
    }

    /// Returns the number of disjoint free ranges.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.iter().count()
    }

    /// Returns an occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> FreeListStats {
        let mut stats = FreeListStats {
            total_size: self.total_size,
            max_entries: self.max_entries,
            slots_in_use: self.pool.in_use(),
            ..FreeListStats::default()
        };
        for range in self.iter() {
            stats.free_space += range.size;
            stats.fragments += 1;
            stats.largest_free_block = stats.largest_free_block.max(range.size);
        }
        stats
    }

    /// Iterates over free ranges in ascending offset order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            pool: &self.pool,
            cursor: self.head,
            remaining: self.pool.in_use(),
        }
    }

    /// Frees the whole arena, discarding every outstanding allocation.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.head = self.pool.acquire(FreeNode::new(0, self.total_size));
        tracing::debug!("Free list cleared: {} bytes free", self.total_size);
    }

    /// Checks the list invariants.
    ///
    /// # Errors
    ///
    /// [`AllocError::CorruptionSuspected`] at the first node that is out of
    /// order, touches its predecessor, is empty, reaches past the arena, or
    /// when the list and the pool disagree on the node count.
    pub fn verify(&self) -> AllocResult<()> {
        let corrupt = |offset, reason| AllocError::CorruptionSuspected { offset, reason };

        let mut count = 0usize;
        let mut prev_end: Option<u64> = None;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let at = prev_end.unwrap_or(0);
            let node = self
                .pool
                .get(id)
                .ok_or_else(|| corrupt(at, "link to vacant node slot"))?;

            count += 1;
            if count > self.pool.in_use() {
                return Err(corrupt(node.offset, "cycle in free list"));
            }
            if node.size == 0 {
                return Err(corrupt(node.offset, "empty free range"));
            }
            if node
                .offset
                .checked_add(node.size)
                .map_or(true, |end| end > self.total_size)
            {
                return Err(corrupt(node.offset, "free range past arena end"));
            }
            if let Some(prev_end) = prev_end {
                if node.offset < prev_end {
                    return Err(corrupt(node.offset, "free ranges out of order"));
                }
                if node.offset == prev_end {
                    return Err(corrupt(node.offset, "adjacent free ranges not merged"));
                }
            }

            prev_end = Some(node.end());
            cursor = node.next;
        }

        if count != self.pool.in_use() {
            return Err(corrupt(prev_end.unwrap_or(0), "orphaned node slot"));
        }
        Ok(())
    }

    fn node(&self, id: NodeId) -> AllocResult<FreeNode> {
        self.pool.get(id).copied().ok_or_else(|| dangling(id))
    }

    fn node_mut(&mut self, id: NodeId) -> AllocResult<&mut FreeNode> {
        self.pool.get_mut(id).ok_or_else(|| dangling(id))
    }

    fn acquire(&mut self, node: FreeNode) -> AllocResult<NodeId> {
        self.pool.acquire(node).ok_or_else(|| {
            tracing::warn!(
                "Free list node pool exhausted ({} slots); range at offset {} (+{}) not recorded",
                self.max_entries,
                node.offset,
                node.size
            );
            AllocError::NodePoolExhausted {
                max_entries: self.max_entries,
            }
        })
    }

    /// Points `prev` (or the head when `prev` is `None`) at `next`.
    fn set_next(&mut self, prev: Option<NodeId>, next: Option<NodeId>) -> AllocResult<()> {
        match prev {
            None => self.head = next,
            Some(prev) => self.node_mut(prev)?.next = next,
        }
        Ok(())
    }

    /// Merges the successor of `id` into it if the two ranges touch.
    fn absorb_next(&mut self, id: NodeId) -> AllocResult<()> {
        let node = self.node(id)?;
        let Some(next_id) = node.next else {
            return Ok(());
        };
        let next = self.node(next_id)?;
        if node.end() != next.offset {
            return Ok(());
        }

        let merged = self.node_mut(id)?;
        merged.size += next.size;
        merged.next = next.next;
        self.pool.release(next_id);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FreeList {
    type Item = FreeRange;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the free ranges of a [`FreeList`].
#[derive(Debug)]
pub struct Iter<'a> {
    pool: &'a NodePool,
    cursor: Option<NodeId>,
    /// Upper bound on steps; stops a corrupted cyclic list.
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = FreeRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.pool.get(self.cursor?)?;
        self.remaining -= 1;
        self.cursor = node.next;
        Some(FreeRange {
            offset: node.offset,
            size: node.size,
        })
    }
}

fn dangling(id: NodeId) -> AllocError {
    tracing::error!("Free list link points at vacant node slot {}", id.index());
    AllocError::CorruptionSuspected {
        offset: 0,
        reason: "link to vacant node slot",
    }
}

fn overlap(offset: u64) -> AllocError {
    AllocError::CorruptionSuspected {
        offset,
        reason: "freed range overlaps a free range",
    }
}

/// Appends `id` after `tail` in a list under construction.
fn link_tail(
    pool: &mut NodePool,
    head: &mut Option<NodeId>,
    tail: Option<NodeId>,
    id: NodeId,
) -> AllocResult<()> {
    match tail {
        None => *head = Some(id),
        Some(tail) => pool.get_mut(tail).ok_or_else(|| dangling(tail))?.next = Some(id),
    }
    Ok(())
}
