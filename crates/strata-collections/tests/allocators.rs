//! Integration tests: containers running on arenas and instrumented
//! allocators.

use std::ffi::{CStr, CString};
use std::rc::Rc;

use strata_arena::{Arena, ArenaConfig, ArenaFlags};
use strata_collections::{Array, HashMap};
use strata_core::{context, AllocError};
use strata_test_utils::fixtures::{distinct_keys, distinct_words};
use strata_test_utils::{FailingAllocator, TrackingAllocator};

// ── Arena backing ───────────────────────────────────────────────────

#[test]
fn array_grows_in_place_at_arena_tail() {
    let arena = Arena::new(ArenaConfig::default()).unwrap();
    let mut xs = Array::new_in(&arena);
    xs.push(0u64).unwrap();
    let start = xs.as_ptr();
    for i in 1..256u64 {
        xs.push(i).unwrap();
    }
    assert_eq!(xs.capacity(), 256);
    assert_eq!(xs.as_ptr(), start);
    assert_eq!(arena.allocated(), 256 * 8);
    assert!(xs.iter().copied().eq(0..256));
}

#[test]
fn map_on_flexible_arena() {
    let arena = Arena::new(ArenaConfig::new().with_flags(ArenaFlags::FLEXIBLE_PAGE)).unwrap();
    let keys = distinct_keys(11, 1000);
    let mut map = HashMap::new_in(&arena);
    for (i, &key) in keys.iter().enumerate() {
        assert_eq!(map.put(key, i).unwrap(), None);
    }
    assert_eq!(map.len(), 1000);
    assert_eq!(map.slot_count(), 2048);
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(map.get(key), Some(&i));
    }
    drop(map);
    assert!(arena.allocated() > 0);
}

#[test]
fn containers_follow_the_ambient_allocator() {
    let tracking = Rc::new(TrackingAllocator::new());
    context::scope(tracking.clone(), || {
        let mut map = HashMap::in_context();
        map.put("one", 1).unwrap();
        let mut xs = Array::in_context();
        xs.push(1u8).unwrap();
        assert_eq!(tracking.live_blocks(), 2);
    });
    tracking.assert_clean();
}

// ── Exact-size release ──────────────────────────────────────────────

#[test]
fn map_releases_every_table() {
    let tracking = TrackingAllocator::new();
    {
        let words = distinct_words(5, 300);
        let mut map = HashMap::new_in(&tracking);
        for word in &words {
            map.put(word.clone(), word.len()).unwrap();
        }
        for word in words.iter().step_by(2) {
            assert_eq!(map.delete(word.as_str()), Some(word.len()));
        }
        assert_eq!(map.len(), 150);
        assert_eq!(tracking.live_blocks(), 1);
        map.free();
        assert_eq!(tracking.live_blocks(), 0);
        map.put(String::from("after free"), 0).unwrap();
    }
    tracking.assert_clean();
}

#[test]
fn array_reallocates_through_allocator() {
    let tracking = TrackingAllocator::new();
    {
        let mut xs = Array::new_in(&tracking);
        xs.extend_from_slice(&[7u32; 100]).unwrap();
        assert_eq!(xs.capacity(), 128);
        assert_eq!(tracking.allocation_count(), 1);
        for _ in 0..29 {
            xs.push(1).unwrap();
        }
        assert_eq!(tracking.reallocation_count(), 1);
        assert_eq!(tracking.outstanding_bytes(), 256 * 4);
        xs.truncate(3);
        xs.shrink_to_fit().unwrap();
        assert_eq!(tracking.outstanding_bytes(), 3 * 4);
    }
    tracking.assert_clean();
}

// ── Key types ───────────────────────────────────────────────────────

#[test]
fn borrowed_lookups_for_owned_keys() {
    let mut strings = HashMap::new();
    strings.put(String::from("alpha"), 1).unwrap();
    assert_eq!(strings.get("alpha"), Some(&1));

    let mut cstrings = HashMap::new();
    cstrings.put(CString::new("beta").unwrap(), 2).unwrap();
    let key: &CStr = c"beta";
    assert_eq!(cstrings.get(key), Some(&2));

    let mut blobs = HashMap::new();
    blobs.put(vec![0u8, 1, 2], 3).unwrap();
    assert_eq!(blobs.get([0u8, 1, 2].as_slice()), Some(&3));
    assert_eq!(blobs.get([0u8, 1].as_slice()), None);

    let mut arrays = HashMap::new();
    arrays.put(*b"key4", 4).unwrap();
    assert_eq!(arrays.get(b"key4"), Some(&4));
    assert!(!arrays.contains_key(b"key5"));
}

#[test]
fn arena_strings_as_keys() {
    let arena = Arena::new(ArenaConfig::default()).unwrap();
    let mut map = HashMap::new();
    for word in ["red", "green", "blue"] {
        let key: &str = arena.alloc_str(word).unwrap();
        map.put(key, word.len()).unwrap();
    }
    assert_eq!(map.get("green"), Some(&5));
    assert_eq!(map.len(), 3);
}

// ── Allocation failure ──────────────────────────────────────────────

#[test]
fn failed_growth_leaves_map_intact() {
    let alloc = FailingAllocator::after(1);
    let mut map = HashMap::new_in(&alloc);
    for key in 0..6u64 {
        map.put(key, key * 10).unwrap();
    }
    let err = map.put(6, 60).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { .. }));
    assert_eq!(alloc.failures(), 1);
    assert_eq!(map.len(), 6);
    assert_eq!(map.slot_count(), 8);
    for key in 0..6u64 {
        assert_eq!(map.get(&key), Some(&(key * 10)));
    }

    alloc.refill(1);
    assert_eq!(map.put(6, 60).unwrap(), None);
    assert_eq!(map.slot_count(), 16);
}

#[test]
fn failed_array_growth_keeps_elements() {
    let alloc = FailingAllocator::after(1);
    let mut xs = Array::new_in(&alloc);
    for i in 0..8 {
        xs.push(i).unwrap();
    }
    assert!(xs.push(8).is_err());
    assert_eq!(xs.len(), 8);
    assert_eq!(xs.capacity(), 8);
    assert_eq!(xs.last(), Some(&7));
}
