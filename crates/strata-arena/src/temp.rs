//! Fixed-capacity scratch space for short-lived allocations.
//!
//! [`TempAllocator`] is a bump allocator over one heap block that is only
//! allocated on first use. It never grows: once the block is exhausted
//! allocations fail until the caller resets or rewinds it. Each thread has
//! its own instance behind [`with_temp`].

#![allow(unsafe_code)]

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::ptr::NonNull;

use strata_core::align::align_up;
use strata_core::traits::dangling;
use strata_core::{AllocError, Allocator, Heap, HEAP_ALIGNMENT};
use tracing::{debug, error, trace, warn};

use crate::format;
use crate::page::Page;
use crate::raw;

/// A position in a [`TempAllocator`], captured by
/// [`TempAllocator::checkpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TempCheckpoint(usize);

/// Bump-allocated scratch space with a fixed capacity.
///
/// Deallocation is a no-op; space comes back through [`reset`] and
/// [`rewind`].
///
/// [`reset`]: TempAllocator::reset
/// [`rewind`]: TempAllocator::rewind
pub struct TempAllocator {
    capacity: usize,
    /// Backing block. `None` until the first allocation.
    region: RefCell<Option<Page>>,
}

impl TempAllocator {
    /// Default capacity: 64 KiB.
    pub const DEFAULT_CAPACITY: usize = 64 * 1024;

    /// Create a temp allocator with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a temp allocator holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            region: RefCell::new(None),
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently allocated, padding included.
    pub fn used(&self) -> usize {
        self.region.borrow().as_ref().map_or(0, Page::used)
    }

    /// Bytes still free.
    pub fn available(&self) -> usize {
        self.region
            .borrow()
            .as_ref()
            .map_or(self.capacity, Page::remaining)
    }

    fn region(&self) -> Result<RefMut<'_, Page>, AllocError> {
        let mut slot = self.region.borrow_mut();
        if slot.is_none() {
            let base = Heap.allocate(self.capacity)?;
            trace!(capacity = self.capacity, "allocated temp region");
            *slot = Some(Page::new(base, self.capacity, HEAP_ALIGNMENT));
        }
        RefMut::filter_map(slot, Option::as_mut).map_err(|_| AllocError::OutOfMemory {
            requested: self.capacity,
        })
    }

    fn padded(size: usize) -> Result<usize, AllocError> {
        align_up(size, HEAP_ALIGNMENT).ok_or(AllocError::CapacityOverflow)
    }

    fn exhausted(size: usize, available: usize) -> AllocError {
        error!(requested = size, available, "temp allocator exhausted");
        AllocError::AllocationTooLarge {
            requested: size,
            available,
        }
    }

    /// Allocate `size` bytes aligned to 16.
    pub fn alloc(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        if size == 0 {
            return Ok(dangling(HEAP_ALIGNMENT));
        }
        let padded = Self::padded(size)?;
        let mut region = self.region()?;
        region
            .bump(padded)
            .ok_or_else(|| Self::exhausted(size, region.remaining()))
    }

    /// Resize a block: in place when it is the most recent allocation and
    /// still fits, by copying when a non-tail block grows, and not at all
    /// when a non-tail block shrinks.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator since the last
    /// reset or rewind past it, and `old_size` must be its current size.
    pub unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if old_size == 0 {
            return self.alloc(new_size);
        }
        let old_padded = Self::padded(old_size)?;
        let new_padded = Self::padded(new_size)?;

        let mut region = self.region()?;
        if region.is_tail(ptr, old_padded) {
            let offset = region.cursor() - old_padded;
            if !region.set_cursor(offset.saturating_add(new_padded)) {
                let available = region.remaining() + old_padded;
                return Err(Self::exhausted(new_size, available));
            }
            return Ok(ptr);
        }
        drop(region);

        if new_size <= old_size {
            return Ok(ptr);
        }
        let new_ptr = self.alloc(new_size)?;
        // SAFETY: distinct live blocks of `old_size` and `new_size` bytes.
        unsafe { raw::copy(ptr, new_ptr, old_size) };
        Ok(new_ptr)
    }

    /// Release every allocation.
    pub fn reset(&mut self) {
        if let Some(region) = self.region.get_mut() {
            region.reset();
            debug!("temp allocator reset");
        }
    }

    /// Capture the current position.
    pub fn checkpoint(&self) -> TempCheckpoint {
        TempCheckpoint(self.region.borrow().as_ref().map_or(0, Page::cursor))
    }

    /// Release everything allocated since `checkpoint` was taken.
    pub fn rewind(&mut self, checkpoint: TempCheckpoint) -> Result<(), AllocError> {
        let Some(region) = self.region.get_mut() else {
            return Ok(());
        };
        if !region.set_cursor(checkpoint.0) {
            return Err(AllocError::InvalidCheckpoint {
                page: 0,
                page_count: 1,
            });
        }
        debug!(used = region.used(), "temp allocator rewound");
        Ok(())
    }

    /// Copy `s` into temp space.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_str(&self, s: &str) -> Result<&mut str, AllocError> {
        let ptr = self.alloc(s.len())?;
        // SAFETY: fresh block of `s.len()` bytes filled with valid UTF-8.
        unsafe {
            raw::copy(NonNull::from(s.as_bytes()).cast(), ptr, s.len());
            Ok(raw::str_mut(ptr, s.len()))
        }
    }

    /// Format `args` directly into temp space.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_fmt(&self, args: fmt::Arguments<'_>) -> Result<&mut str, AllocError> {
        let len = format::measure(args);
        let ptr = self.alloc(len)?;
        // SAFETY: fresh block of `len` bytes, zeroed before it is borrowed.
        unsafe {
            raw::zero(ptr, len);
            let written = format::write_into(raw::bytes_mut(ptr, len), args);
            Ok(raw::str_mut(ptr, written))
        }
    }
}

impl Default for TempAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for TempAllocator {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.alloc(size)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: forwarded from the caller.
        unsafe { self.realloc(ptr, old_size, new_size) }
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _size: usize) -> Result<(), AllocError> {
        Ok(())
    }

    fn alignment(&self) -> usize {
        HEAP_ALIGNMENT
    }
}

impl Drop for TempAllocator {
    fn drop(&mut self) {
        if let Some(region) = self.region.get_mut().take() {
            // SAFETY: the block came from `Heap` with exactly this size.
            if let Err(err) = unsafe { Heap.deallocate(region.base(), region.size()) } {
                warn!(size = region.size(), %err, "heap refused to release the temp region");
            }
        }
    }
}

impl fmt::Debug for TempAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempAllocator")
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .finish()
    }
}

thread_local! {
    static TEMP: RefCell<TempAllocator> = RefCell::new(TempAllocator::new());
}

/// Run `f` with this thread's temp allocator.
///
/// A nested call (from inside `f`) gets a fresh, separate temp allocator
/// that is dropped when it returns.
pub fn with_temp<R>(f: impl FnOnce(&mut TempAllocator) -> R) -> R {
    TEMP.with(|temp| match temp.try_borrow_mut() {
        Ok(mut temp) => f(&mut temp),
        Err(_) => f(&mut TempAllocator::new()),
    })
}
