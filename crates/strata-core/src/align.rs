//! Alignment arithmetic shared by every allocator in the workspace.
//!
//! All alignments are powers of two, so padding reduces to a mask:
//!
//! ```text
//!   padding(o, a) = (-o) & (a - 1)
//!
//!   o = 20, a = 16:   | 16 ........ 20 ... 32 |
//!                                   └─ 12 ─┘
//! ```

/// Whether `alignment` is a non-zero power of two.
#[inline]
pub const fn is_valid_alignment(alignment: usize) -> bool {
    alignment.is_power_of_two()
}

/// Bytes needed after `offset` to reach the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
#[inline]
pub const fn padding_for(offset: usize, alignment: usize) -> usize {
    offset.wrapping_neg() & (alignment - 1)
}

/// Round `value` up to a multiple of `alignment`, or `None` on overflow.
///
/// `alignment` must be a power of two.
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> Option<usize> {
    value.checked_add(padding_for(value, alignment))
}

/// Padding needed to bring `ptr` up to `alignment`.
#[inline]
pub fn address_padding(ptr: *const u8, alignment: usize) -> usize {
    padding_for(ptr.addr(), alignment)
}
