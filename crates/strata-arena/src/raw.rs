//! Low-level primitives for arena memory operations.
//!
//! Every `unsafe` operation on arena-owned bytes lives here, each with a
//! `// SAFETY:` contract the callers in `arena` and `temp` uphold.

#![allow(unsafe_code)]

use std::mem;
use std::ptr::{self, NonNull};

/// Zero `len` bytes starting at `ptr`.
///
/// # Safety
///
/// `ptr .. ptr + len` must be writable memory owned by the caller.
pub(crate) unsafe fn zero(ptr: NonNull<u8>, len: usize) {
    // SAFETY: forwarded from the caller.
    unsafe { ptr::write_bytes(ptr.as_ptr(), 0, len) }
}

/// Zero the bytes a block gained when resized from `old_len` to `new_len`.
///
/// # Safety
///
/// `ptr .. ptr + new_len` must be writable memory owned by the caller.
pub(crate) unsafe fn zero_grown(ptr: NonNull<u8>, old_len: usize, new_len: usize) {
    if new_len > old_len {
        // SAFETY: `old_len < new_len`, so the range lies inside the block.
        unsafe { zero(ptr.add(old_len), new_len - old_len) }
    }
}

/// Copy `len` bytes from `src` to `dst`.
///
/// # Safety
///
/// Both ranges must be valid for `len` bytes. They may overlap.
pub(crate) unsafe fn copy(src: NonNull<u8>, dst: NonNull<u8>, len: usize) {
    if src != dst {
        // SAFETY: forwarded from the caller; `ptr::copy` tolerates overlap.
        unsafe { ptr::copy(src.as_ptr(), dst.as_ptr(), len) }
    }
}

/// Borrow `len` bytes at `ptr` as a mutable slice.
///
/// # Safety
///
/// The range must be initialised, exclusively owned by the returned borrow
/// for `'a`, and not freed while the borrow lives.
pub(crate) unsafe fn bytes_mut<'a>(ptr: NonNull<u8>, len: usize) -> &'a mut [u8] {
    // SAFETY: forwarded from the caller.
    unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) }
}

/// Reinterpret bytes known to hold UTF-8 as `str`.
///
/// # Safety
///
/// Same as [`bytes_mut`], and the bytes must be valid UTF-8.
pub(crate) unsafe fn str_mut<'a>(ptr: NonNull<u8>, len: usize) -> &'a mut str {
    // SAFETY: forwarded from the caller.
    unsafe { std::str::from_utf8_unchecked_mut(bytes_mut(ptr, len)) }
}

/// Move `value` into the block at `ptr` and borrow it.
///
/// # Safety
///
/// `ptr` must be valid for `size_of::<T>()` bytes, aligned for `T`, and
/// exclusively owned by the returned borrow for `'a`.
pub(crate) unsafe fn write_value<'a, T>(ptr: NonNull<u8>, value: T) -> &'a mut T {
    debug_assert_eq!(ptr.as_ptr().addr() % mem::align_of::<T>(), 0);
    let typed = ptr.cast::<T>();
    // SAFETY: forwarded from the caller.
    unsafe {
        typed.as_ptr().write(value);
        &mut *typed.as_ptr()
    }
}
