//! Deterministic workloads.

use strata_arena::Arena;
use strata_core::{AllocError, Allocator};
use strata_test_utils::fixtures::key_stream;

/// `count` request sizes in `1..=max`, reproducible from `seed`.
pub fn request_sizes(seed: u64, count: usize, max: usize) -> Vec<usize> {
    assert!(max > 0, "max request size must be positive");
    key_stream(seed)
        .take(count)
        .map(|k| (k % max as u64) as usize + 1)
        .collect()
}

/// Allocate every size in `sizes` from `arena`. Returns the total bytes
/// requested.
pub fn fill_arena<P: Allocator>(arena: &Arena<P>, sizes: &[usize]) -> Result<usize, AllocError> {
    let mut total = 0;
    for &size in sizes {
        arena.alloc(size)?;
        total += size;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_arena::ArenaConfig;

    #[test]
    fn sizes_are_reproducible_and_bounded() {
        let a = request_sizes(3, 500, 64);
        assert_eq!(a, request_sizes(3, 500, 64));
        assert!(a.iter().all(|&s| (1..=64).contains(&s)));
        assert_ne!(a, request_sizes(4, 500, 64));
    }

    #[test]
    fn fill_counts_requested_bytes() {
        let arena = Arena::new(ArenaConfig::default()).unwrap();
        let sizes = request_sizes(9, 100, 200);
        let total = fill_arena(&arena, &sizes).unwrap();
        assert_eq!(total, sizes.iter().sum::<usize>());
        assert!(arena.allocated() >= total);
    }
}
