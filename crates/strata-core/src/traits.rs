//! The allocator capability every other component is built on.

use std::ptr::NonNull;
use std::rc::Rc;

use crate::error::AllocError;

/// A three-operation allocator: allocate, reallocate, deallocate.
///
/// Implementations do not store block sizes. The caller is the source of
/// truth: `reallocate` and `deallocate` must receive exactly the size the
/// block was last allocated or reallocated with.
///
/// Methods take `&self` so one allocator can serve several containers at
/// once (e.g. two maps sharing an arena through `&Arena`). Implementations
/// that mutate state use interior mutability and are therefore `!Sync`;
/// the supported pattern is one allocator per thread.
pub trait Allocator {
    /// Allocate `size` bytes aligned to at least [`Allocator::alignment`].
    ///
    /// A zero-size request returns a dangling, well-aligned pointer that
    /// must not be dereferenced.
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError>;

    /// Resize a block, preserving its first `min(old_size, new_size)` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator and still be live,
    /// and `old_size` must be the size it was last (re)allocated with. On
    /// success the old pointer must no longer be used unless it equals the
    /// returned one.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator and still be live,
    /// and `size` must be the size it was last (re)allocated with.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError>;

    /// Minimum alignment of every pointer this allocator returns.
    fn alignment(&self) -> usize;
}

impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(size)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).reallocate(ptr, old_size, new_size) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).deallocate(ptr, size) }
    }

    fn alignment(&self) -> usize {
        (**self).alignment()
    }
}

impl<A: Allocator + ?Sized> Allocator for Rc<A> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(size)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).reallocate(ptr, old_size, new_size) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).deallocate(ptr, size) }
    }

    fn alignment(&self) -> usize {
        (**self).alignment()
    }
}

/// A dangling pointer aligned to `alignment`, for zero-size allocations.
#[inline]
pub fn dangling(alignment: usize) -> NonNull<u8> {
    // `alignment` is a non-zero power of two, so the address is non-null.
    NonNull::new(std::ptr::without_provenance_mut(alignment)).unwrap_or(NonNull::dangling())
}
