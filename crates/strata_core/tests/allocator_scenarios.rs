//! # Allocator Scenario Tests
//!
//! End-to-end checks of the free list and sub-allocator:
//!
//! 1. **Fixed scenarios**: reuse, exhaustion, growth, zero-size frees
//! 2. **Properties**: balanced churn restores free space, no overlap,
//!    coalescing in either order, slot accounting
//!
//! Run with: cargo test --package strata_core --test allocator_scenarios

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_core::{AllocError, FreeList, SubAllocator};

fn ranges(list: &FreeList) -> Vec<(u64, u64)> {
    list.iter().map(|r| (r.offset, r.size)).collect()
}

// ============================================================================
// FIXED SCENARIOS
// ============================================================================

#[test]
fn scenario_middle_slot_reused() {
    let mut list = FreeList::new(512).unwrap();
    let a = list.allocate_block(64).unwrap();
    let b = list.allocate_block(64).unwrap();
    let c = list.allocate_block(64).unwrap();
    assert_eq!((a, b, c), (0, 64, 128));

    list.free_block(64, b).unwrap();
    assert_eq!(list.allocate_block(64).unwrap(), 64);

    list.free_block(64, a).unwrap();
    list.free_block(64, b).unwrap();
    list.free_block(64, c).unwrap();
    assert_eq!(list.free_space(), 512);
    assert_eq!(ranges(&list), vec![(0, 512)]);
}

#[test]
fn scenario_full_arena_refuses_everything() {
    let mut list = FreeList::new(512).unwrap();
    assert_eq!(list.allocate_block(512).unwrap(), 0);

    for size in [1, 8, 64, 512, 4096] {
        assert!(matches!(
            list.allocate_block(size),
            Err(AllocError::CapacityExhausted { free: 0, .. })
        ));
    }
    assert_eq!(list.free_space(), 0);
}

#[test]
fn scenario_grow_full_tracker() {
    let mut list = FreeList::new(512).unwrap();
    let _ = list.allocate_block(512).unwrap();

    list.resize(1024).unwrap();
    assert_eq!(ranges(&list), vec![(512, 512)]);
    list.verify().unwrap();
}

#[test]
fn scenario_zero_size_free_never_changes_state() {
    let mut list = FreeList::new(512).unwrap();
    let a = list.allocate_block(100).unwrap();
    let _b = list.allocate_block(50).unwrap();
    list.free_block(100, a).unwrap();
    let before = list.stats();

    for offset in [0, 100, 150, 511, 4096] {
        assert!(matches!(
            list.free_block(0, offset),
            Err(AllocError::ZeroSize { .. })
        ));
    }
    assert_eq!(list.stats(), before);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn metadata_requirement_is_stable() {
    for total in [1u64, 7, 8, 512, 4096, 1 << 20] {
        let first = FreeList::required_bytes(total).unwrap();
        let second = FreeList::required_bytes(total).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            SubAllocator::required_bytes(total as usize).unwrap(),
            SubAllocator::required_bytes(total as usize).unwrap()
        );
    }
}

#[test]
fn adjacent_frees_coalesce_in_either_order() {
    for reverse in [false, true] {
        let mut list = FreeList::new(256).unwrap();
        let a = list.allocate_block(96).unwrap();
        let b = list.allocate_block(32).unwrap();
        let _guard = list.allocate_block(128).unwrap();

        if reverse {
            list.free_block(32, b).unwrap();
            list.free_block(96, a).unwrap();
        } else {
            list.free_block(96, a).unwrap();
            list.free_block(32, b).unwrap();
        }

        assert_eq!(list.fragment_count(), 1);
        assert_eq!(list.allocate_block(128).unwrap(), 0);
    }
}

#[test]
fn slot_accounting() {
    let mut list = FreeList::new(1024).unwrap();

    // Front split: no new slot.
    let a = list.allocate_block(100).unwrap();
    assert_eq!(list.stats().slots_in_use, 1);

    let b = list.allocate_block(100).unwrap();
    let _c = list.allocate_block(824).unwrap();
    assert_eq!(list.stats().slots_in_use, 0);

    // Disjoint free takes exactly one slot.
    list.free_block(100, a).unwrap();
    assert_eq!(list.stats().slots_in_use, 1);

    // Adjacent free takes none.
    list.free_block(100, b).unwrap();
    assert_eq!(list.stats().slots_in_use, 1);

    // Exact fit gives the slot back.
    assert_eq!(list.allocate_block(200).unwrap(), 0);
    assert_eq!(list.stats().slots_in_use, 0);
}

/// Randomized churn: every live allocation is disjoint from every other and
/// from the free ranges, and a full release restores the whole arena.
#[test]
fn balanced_churn_restores_free_space() {
    const TOTAL: u64 = 64 * 1024;

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut list = FreeList::new(TOTAL).unwrap();
        let mut live: Vec<(u64, u64)> = Vec::new();

        for _ in 0..2_000 {
            if !live.is_empty() && rng.gen_bool(0.45) {
                let (offset, size) = live.swap_remove(rng.gen_range(0..live.len()));
                list.free_block(size, offset).unwrap();
            } else {
                let size = rng.gen_range(1..=512);
                match list.allocate_block(size) {
                    Ok(offset) => {
                        assert!(offset + size <= TOTAL);
                        live.push((offset, size));
                    }
                    Err(AllocError::CapacityExhausted { .. }) => {}
                    Err(err) => panic!("unexpected allocation error: {err}"),
                }
            }

            list.verify().unwrap();
            let used: u64 = live.iter().map(|&(_, size)| size).sum();
            assert_eq!(list.free_space() + used, TOTAL);
        }

        let mut sorted = live.clone();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            assert!(pair[0].0 + pair[0].1 <= pair[1].0, "live allocations overlap");
        }
        for range in list.iter() {
            for &(offset, size) in &live {
                assert!(range.end() <= offset || offset + size <= range.offset);
            }
        }

        for (offset, size) in live.drain(..) {
            list.free_block(size, offset).unwrap();
        }
        assert_eq!(list.free_space(), TOTAL);
        assert_eq!(ranges(&list), vec![(0, TOTAL)]);
    }
}

#[test]
fn sub_allocator_round_trip_with_data() {
    let mut heap = SubAllocator::new(4096).unwrap();
    let mut live = Vec::new();

    for i in 0..16u8 {
        let size = 16 + usize::from(i) * 8;
        let address = heap.allocate(size).unwrap();
        heap.bytes_mut(address, size).unwrap().fill(i);
        live.push((address, size, i));
    }

    for &(address, size, tag) in &live {
        assert!(heap.bytes(address, size).unwrap().iter().all(|&b| b == tag));
    }

    for (address, size, _) in live.into_iter().rev() {
        heap.free(address, size).unwrap();
    }
    assert_eq!(heap.free_space(), 4096);
    heap.tracker().verify().unwrap();
    heap.destroy();
}

#[test]
fn grow_then_allocate_into_new_space() {
    let mut list = FreeList::new(256).unwrap();
    let a = list.allocate_block(128).unwrap();
    let _b = list.allocate_block(128).unwrap();
    list.free_block(128, a).unwrap();

    list.resize(512).unwrap();
    assert_eq!(ranges(&list), vec![(0, 128), (256, 256)]);

    assert_eq!(list.allocate_block(200).unwrap(), 256);
    assert_eq!(list.free_space(), 512 - 128 - 200);
    list.verify().unwrap();
}
