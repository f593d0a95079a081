//! Test utilities and instrumented allocators for Strata development.
//!
//! Provides allocator wrappers that check the exact-size contract of
//! [`Allocator`] ([`TrackingAllocator`]), inject failures
//! ([`FailingAllocator`]), and deterministic key fixtures.

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use indexmap::IndexMap;
use strata_core::{AllocError, Allocator, Heap};

/// Allocator wrapper that records every live block.
///
/// Panics when a caller passes a size that differs from the one the block
/// was allocated with, or releases a block it never handed out. Zero-size
/// blocks are not tracked.
///
/// ```
/// use strata_core::Allocator;
/// use strata_test_utils::TrackingAllocator;
///
/// let tracker = TrackingAllocator::new();
/// let ptr = tracker.allocate(24).unwrap();
/// assert_eq!(tracker.outstanding_bytes(), 24);
/// unsafe { tracker.deallocate(ptr, 24).unwrap() };
/// tracker.assert_clean();
/// ```
pub struct TrackingAllocator<A: Allocator = Heap> {
    inner: A,
    /// Address → size, in allocation order.
    live: RefCell<IndexMap<usize, usize>>,
    allocations: Cell<usize>,
    reallocations: Cell<usize>,
    peak: Cell<usize>,
}

impl TrackingAllocator<Heap> {
    pub fn new() -> Self {
        Self::wrapping(Heap)
    }
}

impl Default for TrackingAllocator<Heap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> TrackingAllocator<A> {
    pub fn wrapping(inner: A) -> Self {
        Self {
            inner,
            live: RefCell::new(IndexMap::new()),
            allocations: Cell::new(0),
            reallocations: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    /// Sum of the sizes of every live block.
    pub fn outstanding_bytes(&self) -> usize {
        self.live.borrow().values().sum()
    }

    /// Number of live blocks.
    pub fn live_blocks(&self) -> usize {
        self.live.borrow().len()
    }

    /// Size of the live block at `ptr`, if any.
    pub fn size_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.live.borrow().get(&ptr.as_ptr().addr()).copied()
    }

    /// Successful `allocate` calls (zero-size ones excluded).
    pub fn allocation_count(&self) -> usize {
        self.allocations.get()
    }

    /// Successful `reallocate` calls.
    pub fn reallocation_count(&self) -> usize {
        self.reallocations.get()
    }

    /// Highest value [`outstanding_bytes`](Self::outstanding_bytes) reached.
    pub fn peak_bytes(&self) -> usize {
        self.peak.get()
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Panic if any block is still live.
    pub fn assert_clean(&self) {
        let live = self.live.borrow();
        assert!(
            live.is_empty(),
            "{} blocks ({} bytes) still live: {:?}",
            live.len(),
            live.values().sum::<usize>(),
            live.iter()
                .map(|(addr, size)| format!("{addr:#x}:{size}"))
                .collect::<Vec<_>>()
        );
    }

    fn record(&self, ptr: NonNull<u8>, size: usize) {
        if size == 0 {
            return;
        }
        self.live.borrow_mut().insert(ptr.as_ptr().addr(), size);
        self.peak.set(self.peak.get().max(self.outstanding_bytes()));
    }

    fn forget(&self, ptr: NonNull<u8>, size: usize) {
        if size == 0 {
            return;
        }
        let addr = ptr.as_ptr().addr();
        match self.live.borrow_mut().shift_remove(&addr) {
            Some(recorded) => assert_eq!(
                recorded, size,
                "block {addr:#x} allocated with {recorded} bytes but released with {size}"
            ),
            None => panic!("block {addr:#x} ({size} bytes) was not allocated by this allocator"),
        }
    }
}

impl<A: Allocator> Allocator for TrackingAllocator<A> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(size)?;
        if size > 0 {
            self.allocations.set(self.allocations.get() + 1);
        }
        self.record(ptr, size);
        Ok(ptr)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if old_size > 0 {
            let recorded = self.size_of(ptr);
            assert_eq!(
                recorded,
                Some(old_size),
                "reallocate of {:#x} with old size {old_size}",
                ptr.as_ptr().addr()
            );
        }
        // SAFETY: the block is live with `old_size` (checked above).
        let new_ptr = unsafe { self.inner.reallocate(ptr, old_size, new_size)? };
        self.forget(ptr, old_size);
        self.record(new_ptr, new_size);
        self.reallocations.set(self.reallocations.get() + 1);
        Ok(new_ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        self.forget(ptr, size);
        // SAFETY: the block was live with `size` (checked by `forget`).
        unsafe { self.inner.deallocate(ptr, size) }
    }

    fn alignment(&self) -> usize {
        self.inner.alignment()
    }
}

/// Allocator wrapper that starts failing after a fixed number of
/// successful allocations.
///
/// Both `allocate` and `reallocate` consume the budget. Deallocation
/// always succeeds.
pub struct FailingAllocator<A: Allocator = Heap> {
    inner: A,
    remaining: Cell<usize>,
    failures: Cell<usize>,
}

impl FailingAllocator<Heap> {
    /// Heap-backed allocator that allows `successes` allocations.
    pub fn after(successes: usize) -> Self {
        Self::wrapping(Heap, successes)
    }
}

impl<A: Allocator> FailingAllocator<A> {
    /// Wrap `inner`, allowing `successes` allocations.
    pub fn wrapping(inner: A, successes: usize) -> Self {
        Self {
            inner,
            remaining: Cell::new(successes),
            failures: Cell::new(0),
        }
    }

    /// Number of requests refused so far.
    pub fn failures(&self) -> usize {
        self.failures.get()
    }

    /// Allow `successes` more allocations.
    pub fn refill(&self, successes: usize) {
        self.remaining.set(successes);
    }

    fn take(&self, requested: usize) -> Result<(), AllocError> {
        match self.remaining.get() {
            0 => {
                self.failures.set(self.failures.get() + 1);
                Err(AllocError::OutOfMemory { requested })
            }
            n => {
                self.remaining.set(n - 1);
                Ok(())
            }
        }
    }
}

impl<A: Allocator> Allocator for FailingAllocator<A> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.take(size)?;
        self.inner.allocate(size)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        self.take(new_size)?;
        // SAFETY: forwarded from the caller.
        unsafe { self.inner.reallocate(ptr, old_size, new_size) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        // SAFETY: forwarded from the caller.
        unsafe { self.inner.deallocate(ptr, size) }
    }

    fn alignment(&self) -> usize {
        self.inner.alignment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_outstanding_and_peak() {
        let tracker = TrackingAllocator::new();
        let a = tracker.allocate(32).unwrap();
        let b = tracker.allocate(16).unwrap();
        assert_eq!(tracker.live_blocks(), 2);
        unsafe {
            let a = tracker.reallocate(a, 32, 64).unwrap();
            assert_eq!(tracker.size_of(a), Some(64));
            tracker.deallocate(a, 64).unwrap();
            tracker.deallocate(b, 16).unwrap();
        }
        assert_eq!(tracker.peak_bytes(), 80);
        assert_eq!(tracker.allocation_count(), 2);
        assert_eq!(tracker.reallocation_count(), 1);
        tracker.assert_clean();
    }

    #[test]
    #[should_panic(expected = "allocated with 32 bytes but released with 16")]
    fn size_mismatch_panics() {
        let tracker = TrackingAllocator::new();
        let ptr = tracker.allocate(32).unwrap();
        unsafe { tracker.deallocate(ptr, 16).unwrap() };
    }

    #[test]
    #[should_panic(expected = "still live")]
    fn leak_is_reported() {
        let tracker = TrackingAllocator::new();
        let _ = tracker.allocate(8).unwrap();
        tracker.assert_clean();
    }

    #[test]
    fn failing_allocator_counts_down() {
        let failing = FailingAllocator::after(1);
        let ptr = failing.allocate(8).unwrap();
        assert_eq!(
            failing.allocate(8).unwrap_err(),
            AllocError::OutOfMemory { requested: 8 }
        );
        assert_eq!(failing.failures(), 1);
        failing.refill(1);
        let grown = unsafe { failing.reallocate(ptr, 8, 16).unwrap() };
        unsafe { failing.deallocate(grown, 16).unwrap() };
    }
}
