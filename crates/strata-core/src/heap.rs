//! The default allocator, backed by the global Rust allocator.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::AllocError;
use crate::traits::{dangling, Allocator};

/// Alignment of every block returned by [`Heap`].
pub const HEAP_ALIGNMENT: usize = 16;

/// Stateless allocator over `std::alloc` with a fixed 16-byte alignment.
///
/// This is the allocator at the bottom of every thread's context stack and
/// the default page allocator of an arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

fn layout(size: usize) -> Result<Layout, AllocError> {
    Layout::from_size_align(size, HEAP_ALIGNMENT).map_err(|_| AllocError::CapacityOverflow)
}

impl Allocator for Heap {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        if size == 0 {
            return Ok(dangling(HEAP_ALIGNMENT));
        }
        let layout = layout(size)?;
        // SAFETY: `layout` has non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory { requested: size })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if old_size == 0 {
            return self.allocate(new_size);
        }
        if new_size == 0 {
            // SAFETY: caller guarantees `ptr`/`old_size` describe a live block.
            unsafe { self.deallocate(ptr, old_size)? };
            return Ok(dangling(HEAP_ALIGNMENT));
        }
        let old_layout = layout(old_size)?;
        // Validate the new size against the layout rules before handing it on.
        layout(new_size)?;
        // SAFETY: `ptr` was allocated by `alloc::alloc` with `old_layout`
        // (caller contract) and `new_size` is non-zero and fits a layout.
        let new_ptr = unsafe { alloc::realloc(ptr.as_ptr(), old_layout, new_size) };
        NonNull::new(new_ptr).ok_or(AllocError::OutOfMemory {
            requested: new_size,
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        if size == 0 {
            return Ok(());
        }
        let layout = layout(size)?;
        // SAFETY: caller guarantees `ptr` came from this allocator with `size`.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        Ok(())
    }

    fn alignment(&self) -> usize {
        HEAP_ALIGNMENT
    }
}
