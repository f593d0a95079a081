//! Contiguous bump-allocated pages.
//!
//! A [`Page`] is one block obtained from a page allocator. It records the
//! block exactly as it was handed out (so it can be returned with the same
//! size) plus a cursor that advances on each allocation. Offsets are
//! relative to the block base:
//!
//! ```text
//!   base                 data_start             cursor                size
//!   |── alignment pad ──|── live allocations ──|── free ──────────────|
//! ```

#![allow(unsafe_code)]

use std::ptr::NonNull;

use strata_core::align::address_padding;

/// Bookkeeping size charged against every page when validating configs.
pub(crate) const PAGE_HEADER_SIZE: usize = std::mem::size_of::<Page>();

/// A single page with bump allocation.
///
/// Pages are never freed individually at runtime, only reset or returned
/// to their page allocator when the owner is destroyed.
#[derive(Debug)]
pub(crate) struct Page {
    /// Block base as returned by the page allocator.
    base: NonNull<u8>,
    /// Block size as requested from the page allocator.
    size: usize,
    /// First aligned offset.
    data_start: usize,
    /// Next free offset. Always aligned.
    cursor: usize,
}

impl Page {
    /// Wrap a freshly allocated block of `size` bytes at `base`.
    pub(crate) fn new(base: NonNull<u8>, size: usize, alignment: usize) -> Self {
        let data_start = address_padding(base.as_ptr(), alignment).min(size);
        Self {
            base,
            size,
            data_start,
            cursor: data_start,
        }
    }

    /// Bump `padded` bytes. `None` if the page lacks room.
    pub(crate) fn bump(&mut self, padded: usize) -> Option<NonNull<u8>> {
        if self.remaining() < padded {
            return None;
        }
        let ptr = self.ptr_at(self.cursor);
        self.cursor += padded;
        Some(ptr)
    }

    /// Whether `ptr .. ptr + padded` is the most recent allocation.
    pub(crate) fn is_tail(&self, ptr: NonNull<u8>, padded: usize) -> bool {
        self.offset_of(ptr)
            .is_some_and(|offset| offset.checked_add(padded) == Some(self.cursor))
    }

    /// Offset of `ptr` within the data region, if it points into this page.
    pub(crate) fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = ptr.as_ptr().addr().checked_sub(self.base.as_ptr().addr())?;
        (self.data_start..=self.size)
            .contains(&offset)
            .then_some(offset)
    }

    /// Pointer to `offset` bytes past the base.
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.size);
        // SAFETY: `offset <= size`, so the result stays within (or one past
        // the end of) the block the page allocator handed out.
        unsafe { self.base.add(offset) }
    }

    /// Rewind the cursor to the first aligned offset.
    pub(crate) fn reset(&mut self) {
        self.cursor = self.data_start;
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor. Returns `false` (and leaves the cursor alone) if
    /// `cursor` is outside the data region.
    pub(crate) fn set_cursor(&mut self, cursor: usize) -> bool {
        if !(self.data_start..=self.size).contains(&cursor) {
            return false;
        }
        self.cursor = cursor;
        true
    }

    /// Bytes in use.
    pub(crate) fn used(&self) -> usize {
        self.cursor - self.data_start
    }

    /// Bytes still free.
    pub(crate) fn remaining(&self) -> usize {
        self.size - self.cursor
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cursor == self.data_start
    }

    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }
}
