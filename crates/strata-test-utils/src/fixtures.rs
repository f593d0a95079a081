//! Deterministic key fixtures.
//!
//! All streams are seeded ChaCha8, so a failing test reproduces from its
//! seed alone.

use indexmap::IndexSet;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Endless stream of pseudo-random `u64` keys.
pub fn key_stream(seed: u64) -> impl Iterator<Item = u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    std::iter::repeat_with(move || rng.next_u64())
}

/// `count` distinct keys, in generation order.
pub fn distinct_keys(seed: u64, count: usize) -> Vec<u64> {
    let mut seen = IndexSet::with_capacity(count);
    for key in key_stream(seed) {
        if seen.len() == count {
            break;
        }
        seen.insert(key);
    }
    seen.into_iter().collect()
}

/// `count` distinct lowercase words of 3 to 12 letters.
pub fn distinct_words(seed: u64, count: usize) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut seen = IndexSet::with_capacity(count);
    while seen.len() < count {
        let len = 3 + (rng.next_u32() % 10) as usize;
        let word: String = (0..len)
            .map(|_| char::from(b'a' + (rng.next_u32() % 26) as u8))
            .collect();
        seen.insert(word);
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_reproducible() {
        let a: Vec<u64> = key_stream(7).take(16).collect();
        let b: Vec<u64> = key_stream(7).take(16).collect();
        let c: Vec<u64> = key_stream(8).take(16).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn distinct_keys_are_unique() {
        let keys = distinct_keys(1, 500);
        assert_eq!(keys.len(), 500);
        assert_eq!(keys.iter().collect::<IndexSet<_>>().len(), 500);
    }

    #[test]
    fn words_are_lowercase() {
        let words = distinct_words(3, 50);
        assert_eq!(words.len(), 50);
        assert!(words
            .iter()
            .all(|w| (3..=12).contains(&w.len()) && w.bytes().all(|b| b.is_ascii_lowercase())));
    }
}
