//! Fast non-cryptographic hashing for [`HashMap`](crate::HashMap).
//!
//! [`MixHasher`] absorbs input with a rotate-and-add step (one 8-byte word
//! or trailing byte at a time) and finishes with Thomas Wang's 64-bit
//! integer mix. A single `u64` key therefore hashes to exactly the Wang mix
//! of its value. Not resistant to adversarial keys; use a different
//! `BuildHasher` for untrusted input.

use std::hash::{BuildHasher, Hasher};

/// Thomas Wang's 64-bit integer mix, keyed by `seed`.
#[inline]
pub const fn wang_mix64(value: u64, seed: u64) -> u64 {
    let mut h = value ^ seed;
    h = (!h).wrapping_add(h << 21);
    h ^= h.rotate_right(24);
    h = h.wrapping_mul(265);
    h ^= h.rotate_right(14);
    h ^= seed;
    h = h.wrapping_mul(21);
    h ^= h.rotate_right(28);
    h = h.wrapping_add(h << 31);
    (!h).wrapping_add(h << 18)
}

/// Streaming hasher with rotate-add absorption and a Wang finaliser.
#[derive(Clone, Debug, Default)]
pub struct MixHasher {
    state: u64,
    seed: u64,
}

impl MixHasher {
    /// A hasher keyed by `seed`.
    pub const fn with_seed(seed: u64) -> Self {
        Self { state: seed, seed }
    }

    #[inline]
    fn absorb(&mut self, word: u64) {
        self.state = self.state.rotate_left(9).wrapping_add(word);
    }
}

impl Hasher for MixHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            self.absorb(u64::from_le_bytes(word));
        }
        for &byte in chunks.remainder() {
            self.absorb(u64::from(byte));
        }
    }

    fn write_u8(&mut self, n: u8) {
        self.absorb(u64::from(n));
    }

    fn write_u16(&mut self, n: u16) {
        self.absorb(u64::from(n));
    }

    fn write_u32(&mut self, n: u32) {
        self.absorb(u64::from(n));
    }

    fn write_u64(&mut self, n: u64) {
        self.absorb(n);
    }

    fn write_usize(&mut self, n: usize) {
        self.absorb(n as u64);
    }

    fn finish(&self) -> u64 {
        wang_mix64(self.state, self.seed)
    }
}

/// [`BuildHasher`] producing [`MixHasher`]s with a fixed seed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MixState {
    seed: u64,
}

impl MixState {
    /// A builder whose hashers are keyed by `seed`.
    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl BuildHasher for MixState {
    type Hasher = MixHasher;

    fn build_hasher(&self) -> MixHasher {
        MixHasher::with_seed(self.seed)
    }
}

/// Hash builder used by [`HashMap`](crate::HashMap) unless another is given.
pub type DefaultHashBuilder = MixState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hash;

    fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
        MixState::default().hash_one(value)
    }

    #[test]
    fn u64_key_hashes_to_wang_mix() {
        assert_eq!(hash_of(&42u64), wang_mix64(42, 0));
        assert_ne!(hash_of(&42u64), hash_of(&43u64));
    }

    #[test]
    fn seed_changes_output() {
        let a = MixState::with_seed(1).hash_one(7u64);
        let b = MixState::with_seed(2).hash_one(7u64);
        assert_ne!(a, b);
    }

    #[test]
    fn byte_chunks_and_tail_both_count() {
        let long = hash_of(b"abcdefgh-i".as_slice());
        let other = hash_of(b"abcdefgh-j".as_slice());
        assert_ne!(long, other);
        assert_ne!(hash_of("abc"), hash_of("abd"));
    }

    #[test]
    fn string_and_str_agree() {
        assert_eq!(hash_of("strata"), hash_of(&String::from("strata")));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn mix_is_deterministic(value: u64, seed: u64) {
                prop_assert_eq!(wang_mix64(value, seed), wang_mix64(value, seed));
                prop_assert_eq!(
                    MixState::with_seed(seed).hash_one(value),
                    wang_mix64(seed.rotate_left(9).wrapping_add(value), seed)
                );
            }
        }
    }
}
