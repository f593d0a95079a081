//! Growable array allocating through an [`Allocator`].

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::rc::Rc;

use strata_core::{context, AllocError, Allocator, Heap};
use tracing::warn;

/// Capacity of the first allocation.
pub const INITIAL_CAPACITY: usize = 8;

/// A contiguous growable array.
///
/// Growth goes through [`Allocator::reallocate`], so an array backed by an
/// arena extends in place while it is the arena's most recent allocation.
/// Fallible operations return [`AllocError`] instead of aborting.
///
/// ```
/// use strata_collections::Array;
///
/// let mut xs = Array::new();
/// xs.extend_from_slice(&[1, 2, 3]).unwrap();
/// xs.push(4).unwrap();
/// assert_eq!(xs.swap_remove(0), Some(1));
/// assert_eq!(&xs[..], &[4, 2, 3]);
/// ```
pub struct Array<T, A: Allocator = Heap> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    alloc: A,
    marker: PhantomData<T>,
}

impl<T> Array<T, Heap> {
    /// An empty heap array. Allocates nothing until the first push.
    pub fn new() -> Self {
        Self::new_in(Heap)
    }
}

impl<T> Default for Array<T, Heap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Array<T, Rc<dyn Allocator>> {
    /// An empty array using the current ambient allocator.
    pub fn in_context() -> Self {
        Self::new_in(context::current())
    }
}

impl<T, A: Allocator> Array<T, A> {
    /// An empty array allocating through `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: if mem::size_of::<T>() == 0 { usize::MAX } else { 0 },
            alloc,
            marker: PhantomData,
        }
    }

    /// An array with room for exactly `capacity` elements.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        let mut array = Self::new_in(alloc);
        array.reserve_exact(capacity)?;
        Ok(array)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current allocation holds.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// The allocator backing the array.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// View as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` elements are initialised.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// View as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` elements are initialised.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn bytes_for(capacity: usize) -> Result<usize, AllocError> {
        capacity
            .checked_mul(mem::size_of::<T>())
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or(AllocError::CapacityOverflow)
    }

    /// Move the contents into an allocation of exactly `new_cap` elements.
    fn set_capacity(&mut self, new_cap: usize) -> Result<(), AllocError> {
        debug_assert!(new_cap >= self.len);
        if mem::size_of::<T>() == 0 || new_cap == self.cap {
            return Ok(());
        }
        let required = mem::align_of::<T>();
        let provided = self.alloc.alignment();
        if required > provided {
            return Err(AllocError::UnsupportedAlignment { required, provided });
        }

        let old_bytes = Self::bytes_for(self.cap)?;
        let new_bytes = Self::bytes_for(new_cap)?;
        let ptr = if self.cap == 0 {
            self.alloc.allocate(new_bytes)?
        } else {
            // SAFETY: `ptr` was (re)allocated by `alloc` with `old_bytes`.
            unsafe { self.alloc.reallocate(self.ptr.cast(), old_bytes, new_bytes)? }
        };
        self.ptr = if new_cap == 0 {
            NonNull::dangling()
        } else {
            ptr.cast()
        };
        self.cap = new_cap;
        Ok(())
    }

    /// Ensure room for `additional` more elements, doubling from
    /// [`INITIAL_CAPACITY`] until they fit.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(AllocError::CapacityOverflow)?;
        if needed <= self.cap {
            return Ok(());
        }
        let mut new_cap = if self.cap == 0 {
            INITIAL_CAPACITY
        } else {
            self.cap
        };
        while new_cap < needed {
            new_cap = new_cap
                .checked_mul(2)
                .ok_or(AllocError::CapacityOverflow)?;
        }
        self.set_capacity(new_cap)
    }

    /// Ensure room for exactly `additional` more elements.
    pub fn reserve_exact(&mut self, additional: usize) -> Result<(), AllocError> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(AllocError::CapacityOverflow)?;
        if needed <= self.cap {
            return Ok(());
        }
        self.set_capacity(needed)
    }

    /// Append `value`.
    pub fn push(&mut self, value: T) -> Result<(), AllocError> {
        if self.len == self.cap {
            self.reserve(1)?;
        }
        // SAFETY: `len < cap` after the reserve.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Append clones of every element of `values`.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<(), AllocError>
    where
        T: Clone,
    {
        self.reserve(values.len())?;
        for value in values {
            // SAFETY: capacity for all of `values` was reserved above; `len`
            // is bumped per element so a panicking `clone` leaves the array
            // consistent.
            unsafe { self.ptr.as_ptr().add(self.len).write(value.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the element at the old `len - 1` is initialised and is no
        // longer counted, so it is read out exactly once.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Remove the element at `index`, shifting later elements down.
    ///
    /// Returns `None` if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        // SAFETY: `index < len`; the tail is shifted over the removed slot.
        unsafe {
            let slot = self.ptr.as_ptr().add(index);
            let value = slot.read();
            ptr::copy(slot.add(1), slot, self.len - index - 1);
            self.len -= 1;
            Some(value)
        }
    }

    /// Remove the element at `index`, replacing it with the last element.
    ///
    /// Returns `None` if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let last = self.len - 1;
        self.as_mut_slice().swap(index, last);
        self.pop()
    }

    /// Drop elements past `len`.
    pub fn truncate(&mut self, len: usize) {
        while self.len > len {
            drop(self.pop());
        }
    }

    /// Drop every element. The allocation stays.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Grow with clones of `value` or shrink to `new_len`.
    pub fn resize(&mut self, new_len: usize, value: T) -> Result<(), AllocError>
    where
        T: Clone,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }
        self.reserve_exact(new_len - self.len)?;
        while self.len + 1 < new_len {
            self.push(value.clone())?;
        }
        self.push(value)
    }

    /// Shrink the allocation to the length, releasing it when empty.
    pub fn shrink_to_fit(&mut self) -> Result<(), AllocError> {
        if mem::size_of::<T>() == 0 || self.cap == self.len {
            return Ok(());
        }
        if self.len == 0 {
            self.release();
            return Ok(());
        }
        self.set_capacity(self.len)
    }

    fn release(&mut self) {
        if mem::size_of::<T>() == 0 || self.cap == 0 {
            return;
        }
        match Self::bytes_for(self.cap) {
            // SAFETY: `ptr` was (re)allocated by `alloc` with `bytes`.
            Ok(bytes) => {
                if let Err(err) = unsafe { self.alloc.deallocate(self.ptr.cast(), bytes) } {
                    warn!(bytes, %err, "allocator refused to release array storage");
                }
            }
            Err(err) => warn!(%err, "array layout overflow on release"),
        }
        self.ptr = NonNull::dangling();
        self.cap = 0;
    }
}

impl<T, A: Allocator> Drop for Array<T, A> {
    fn drop(&mut self) {
        self.clear();
        self.release();
    }
}

impl<T, A: Allocator> Deref for Array<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Array<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Array<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Array<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Array<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq<[T]> for Array<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}
