//! # Node Pool
//!
//! Fixed-capacity slot storage for free list nodes.
//!
//! The pool is sized once when the tracker is built and never grows: acquiring
//! a node pops an index off a pre-allocated free stack, releasing a node pushes
//! it back. Each slot carries an explicit occupancy tag (`Option`), so a vacant
//! slot can never be mistaken for a live node.

/// Index of a slot inside a [`NodePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One contiguous free byte range and the link to the next range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeNode {
    /// First free byte, relative to the arena start.
    pub offset: u64,
    /// Length of the range in bytes. Always non-zero for a live node.
    pub size: u64,
    /// Next node in ascending-offset order.
    pub next: Option<NodeId>,
}

impl FreeNode {
    /// Creates an unlinked node covering `[offset, offset + size)`.
    #[inline]
    #[must_use]
    pub const fn new(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size,
            next: None,
        }
    }

    /// One past the last byte of the range.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// A fixed-capacity pool of [`FreeNode`] slots.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It is owned by exactly one free list.
#[derive(Debug)]
pub struct NodePool {
    /// Slot storage. `None` marks a vacant slot.
    slots: Box<[Option<FreeNode>]>,
    /// Indices of vacant slots; most recently released on top.
    vacant: Vec<usize>,
}

impl NodePool {
    /// Bytes of bookkeeping per slot: the slot itself plus its free stack entry.
    pub const SLOT_BYTES: u64 =
        (std::mem::size_of::<Option<FreeNode>>() + std::mem::size_of::<usize>()) as u64;

    /// Creates a pool with `capacity` vacant slots.
    ///
    /// All memory is pre-allocated upfront.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let slots: Vec<Option<FreeNode>> = vec![None; capacity];
        let vacant: Vec<usize> = (0..capacity).rev().collect();

        Self {
            slots: slots.into_boxed_slice(),
            vacant,
        }
    }

    /// Returns the total number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of slots holding a live node.
    #[inline]
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// Returns the number of vacant slots.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.vacant.len()
    }

    /// Stores `node` in a vacant slot.
    ///
    /// Returns `None` when every slot is taken. That is a capacity condition
    /// (too many disjoint fragments), not a logic error.
    pub fn acquire(&mut self, node: FreeNode) -> Option<NodeId> {
        let index = self.vacant.pop()?;
        self.slots[index] = Some(node);
        Some(NodeId(index))
    }

    /// Vacates a slot, returning the node it held.
    ///
    /// Returns `None` if the slot was already vacant or out of range.
    pub fn release(&mut self, id: NodeId) -> Option<FreeNode> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.vacant.push(id.0);
        Some(node)
    }

    /// Gets the node stored in a slot.
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&FreeNode> {
        self.slots.get(id.0)?.as_ref()
    }

    /// Gets the node stored in a slot, mutably.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut FreeNode> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Vacates every slot.
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.vacant.clear();
        self.vacant.extend((0..self.slots.len()).rev());
    }
}
