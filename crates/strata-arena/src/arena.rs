//! Page-chained bump allocator.
//!
//! An [`Arena`] hands out memory by advancing a cursor through a chain of
//! pages obtained from a page allocator. Memory is released in bulk with
//! [`Arena::reset`], [`Arena::rewind`] or [`Arena::destroy`]; individual
//! frees only reclaim space when they hit the most recent allocation.
//!
//! ```text
//! Arena
//! ├── ArenaConfig (alignment, page size, flags)
//! ├── page allocator P: Allocator
//! └── pages: [Page 0] → [Page 1] → ... → [Page current] → [reset pages]
//! ```
//!
//! Sizes are padded up to the alignment ("pad after"), so the cursor is
//! always aligned and `allocated` counts `size + padding` per live block.

#![allow(unsafe_code)]

use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use strata_core::align::align_up;
use strata_core::traits::dangling;
use strata_core::{context, AllocError, Allocator, ConfigError, Heap};
use tracing::{debug, error, trace, warn};

use crate::config::{ArenaConfig, ArenaFlags};
use crate::format;
use crate::page::Page;
use crate::raw;

/// A position in an arena, captured by [`Arena::checkpoint`].
///
/// Rewinding to it releases everything allocated after it was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    /// Page that was current, `None` for an arena that had no pages.
    page: Option<usize>,
    cursor: usize,
    allocated: usize,
}

impl Checkpoint {
    /// Bytes the arena had allocated when the checkpoint was taken.
    pub fn allocated(&self) -> usize {
        self.allocated
    }
}

/// Point-in-time usage figures for an arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Bytes handed out, padding included.
    pub allocated: usize,
    /// Pages owned by the arena.
    pub page_count: usize,
    /// Sum of the sizes of every owned page.
    pub capacity: usize,
}

struct State {
    pages: Vec<Page>,
    /// Index of the page being filled. Every page after it is empty.
    current: usize,
    allocated: usize,
}

impl State {
    fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current)
    }

    fn is_tail(&self, ptr: NonNull<u8>, padded: usize) -> bool {
        self.current_page()
            .is_some_and(|page| page.is_tail(ptr, padded))
    }
}

/// A page-chained bump allocator.
///
/// All allocation methods take `&self`, so an arena can back several
/// containers at once (pass `&arena` as their allocator). Bulk release
/// (`reset`, `rewind`, `destroy`) takes `&mut self`, which statically
/// rules out containers or helper borrows outliving it.
///
/// Dropping the arena returns every page to the page allocator.
pub struct Arena<P: Allocator = Heap> {
    config: ArenaConfig,
    page_alloc: P,
    state: RefCell<State>,
}

impl Arena<Heap> {
    /// Create an arena whose pages come from the global heap.
    pub fn new(config: ArenaConfig) -> Result<Self, ConfigError> {
        Self::with_page_allocator(config, Heap)
    }
}

impl Arena<Rc<dyn Allocator>> {
    /// Create an arena whose pages come from the current ambient allocator.
    ///
    /// The allocator is captured at construction; later scope changes do
    /// not affect this arena.
    pub fn in_context(config: ArenaConfig) -> Result<Self, ConfigError> {
        Self::with_page_allocator(config, context::current())
    }
}

impl<P: Allocator> Arena<P> {
    /// Create an arena whose pages come from `page_alloc`.
    ///
    /// No pages are allocated until the first allocation.
    pub fn with_page_allocator(config: ArenaConfig, page_alloc: P) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Ok(Self {
            config,
            page_alloc,
            state: RefCell::new(State {
                pages: Vec::new(),
                current: 0,
                allocated: 0,
            }),
        })
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The allocator pages are obtained from.
    pub fn page_allocator(&self) -> &P {
        &self.page_alloc
    }

    /// Bytes handed out, padding included.
    pub fn allocated(&self) -> usize {
        self.state.borrow().allocated
    }

    /// Number of pages the arena owns.
    pub fn page_count(&self) -> usize {
        self.state.borrow().pages.len()
    }

    /// Usage snapshot.
    pub fn stats(&self) -> ArenaStats {
        let state = self.state.borrow();
        ArenaStats {
            allocated: state.allocated,
            page_count: state.pages.len(),
            capacity: state.pages.iter().map(Page::size).sum(),
        }
    }

    fn padded(&self, size: usize) -> Result<usize, AllocError> {
        align_up(size, self.config.alignment).ok_or(AllocError::CapacityOverflow)
    }

    /// Allocate `size` bytes.
    ///
    /// The pointer is aligned to the arena's alignment and zero-filled when
    /// [`ArenaFlags::ZERO_ALLOC`] is set. A zero-size request returns a
    /// dangling aligned pointer and consumes nothing.
    pub fn alloc(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        if size == 0 {
            return Ok(dangling(self.config.alignment));
        }
        let ptr = self.bump(size, self.padded(size)?)?;
        if self.config.has(ArenaFlags::ZERO_ALLOC) {
            // SAFETY: `bump` just reserved `size` bytes at `ptr`.
            unsafe { raw::zero(ptr, size) };
        }
        Ok(ptr)
    }

    /// Reserve `padded` bytes without touching their contents.
    fn bump(&self, size: usize, padded: usize) -> Result<NonNull<u8>, AllocError> {
        let mut state = self.state.borrow_mut();

        // Walk forward from the current page; pages past it are empty
        // leftovers from a reset or rewind.
        let start = state.current;
        for index in start..state.pages.len() {
            if let Some(ptr) = state.pages[index].bump(padded) {
                if index != start {
                    trace!(page = index, "reusing arena page");
                }
                state.current = index;
                state.allocated += padded;
                return Ok(ptr);
            }
        }

        let mut page = self.new_page(size, padded)?;
        let ptr = match page.bump(padded) {
            Some(ptr) => ptr,
            None => {
                // `new_page` sized the page to fit `padded`.
                // SAFETY: the page was allocated just above with this size.
                unsafe { self.release_page(&page) };
                return Err(AllocError::CapacityOverflow);
            }
        };
        state.pages.push(page);
        state.current = state.pages.len() - 1;
        state.allocated += padded;
        Ok(ptr)
    }

    /// Allocate a page able to hold `padded` bytes.
    fn new_page(&self, size: usize, padded: usize) -> Result<Page, AllocError> {
        let alignment = self.config.alignment;
        let page_size = self.config.page_size;
        // The page allocator only guarantees its own alignment; the first
        // aligned offset can be up to this far into the block.
        let worst_pad = alignment.saturating_sub(self.page_alloc.alignment());
        let needed = padded
            .checked_add(worst_pad)
            .ok_or(AllocError::CapacityOverflow)?;

        let page_size = if needed <= page_size {
            page_size
        } else if self.config.has(ArenaFlags::FLEXIBLE_PAGE) {
            needed
        } else {
            let available = page_size - worst_pad;
            error!(
                requested = size,
                available, "allocation does not fit in an arena page"
            );
            return Err(AllocError::AllocationTooLarge {
                requested: size,
                available,
            });
        };

        let base = self.page_alloc.allocate(page_size)?;
        trace!(size = page_size, "created arena page");
        Ok(Page::new(base, page_size, alignment))
    }

    /// # Safety
    ///
    /// `page` must have come from `new_page` on this arena and must not be
    /// used afterwards.
    unsafe fn release_page(&self, page: &Page) {
        // SAFETY: the page block was allocated by `page_alloc` with exactly
        // `page.size()` bytes.
        if let Err(err) = unsafe { self.page_alloc.deallocate(page.base(), page.size()) } {
            warn!(size = page.size(), %err, "page allocator refused to release an arena page");
        }
    }

    /// Resize a block, in place when it is the most recent allocation.
    ///
    /// - Tail block: the cursor is rewound and the block re-bumped at the
    ///   new size. The address is unchanged unless the page overflows, in
    ///   which case the contents move to a new page.
    /// - Other blocks, growing: a new block is allocated and the old
    ///   contents copied.
    /// - Other blocks, shrinking: `ptr` is returned unchanged. The arena
    ///   still accounts the old size, so later calls must pass `old_size`.
    ///
    /// With [`ArenaFlags::ZERO_ALLOC`] only the bytes past `old_size` are
    /// zeroed.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this arena, not released since,
    /// and `old_size` must be the size it was last allocated with.
    pub unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if old_size == 0 {
            return self.alloc(new_size);
        }
        if new_size == 0 {
            // SAFETY: forwarded from the caller.
            unsafe { self.free(ptr, old_size)? };
            return Ok(dangling(self.config.alignment));
        }

        let old_padded = self.padded(old_size)?;
        let new_padded = self.padded(new_size)?;
        let zero = self.config.has(ArenaFlags::ZERO_ALLOC);

        let mut state = self.state.borrow_mut();
        if state.is_tail(ptr, old_padded) {
            let current = state.current;
            let page = &mut state.pages[current];
            let offset = page.cursor() - old_padded;

            if page.set_cursor(offset.saturating_add(new_padded)) {
                state.allocated = state.allocated - old_padded + new_padded;
                trace!(old_size, new_size, "resized arena tail in place");
                drop(state);
                if zero {
                    // SAFETY: the block now spans `new_size` bytes at `ptr`.
                    unsafe { raw::zero_grown(ptr, old_size, new_size) };
                }
                return Ok(ptr);
            }

            // The page overflows: release the tail, then bump on a later page.
            page.set_cursor(offset);
            state.allocated -= old_padded;
            drop(state);

            return match self.bump(new_size, new_padded) {
                Ok(new_ptr) => {
                    // SAFETY: the old bytes are untouched (nothing else was
                    // allocated on that page) and the new block holds at
                    // least `min(old_size, new_size)` bytes.
                    unsafe {
                        raw::copy(ptr, new_ptr, old_size.min(new_size));
                        if zero {
                            raw::zero_grown(new_ptr, old_size, new_size);
                        }
                    }
                    Ok(new_ptr)
                }
                Err(err) => {
                    let mut state = self.state.borrow_mut();
                    let page = &mut state.pages[current];
                    page.set_cursor(offset + old_padded);
                    state.allocated += old_padded;
                    Err(err)
                }
            };
        }
        drop(state);

        if new_size <= old_size {
            return Ok(ptr);
        }
        let new_ptr = self.bump(new_size, new_padded)?;
        // SAFETY: distinct live blocks of `old_size` and `new_size` bytes.
        unsafe {
            raw::copy(ptr, new_ptr, old_size);
            if zero {
                raw::zero_grown(new_ptr, old_size, new_size);
            }
        }
        Ok(new_ptr)
    }

    /// Release a block.
    ///
    /// Only the most recent allocation gives its space back. Freeing any
    /// other block is a no-op, or [`AllocError::OutOfOrderFree`] in
    /// [`ArenaFlags::STACK_ALLOC`] mode. When a free empties the current
    /// page the arena steps back to the previous non-empty page, so LIFO
    /// frees keep reclaiming across page boundaries.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this arena, not released since,
    /// and `size` must be the size it was last allocated with.
    pub unsafe fn free(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        if size == 0 {
            return Ok(());
        }
        let padded = self.padded(size)?;
        let mut state = self.state.borrow_mut();

        if state.is_tail(ptr, padded) {
            let current = state.current;
            let page = &mut state.pages[current];
            page.set_cursor(page.cursor() - padded);
            let emptied = page.is_empty();
            state.allocated -= padded;
            trace!(size, "freed arena tail");

            if emptied && current > 0 {
                let previous = state.pages[..current]
                    .iter()
                    .rposition(|page| !page.is_empty())
                    .unwrap_or(0);
                state.current = previous;
            }
            return Ok(());
        }

        if self.config.has(ArenaFlags::STACK_ALLOC) {
            let expected = state
                .current_page()
                .map(|page| page.ptr_at(page.cursor()).as_ptr().addr().wrapping_sub(padded))
                .unwrap_or(0);
            let got = ptr.as_ptr().addr();
            error!("deallocating memory in non-LIFO order: got {got:#x}, expected {expected:#x}");
            return Err(AllocError::OutOfOrderFree { ptr: got, expected });
        }
        Ok(())
    }

    /// Capture the current position.
    pub fn checkpoint(&self) -> Checkpoint {
        let state = self.state.borrow();
        Checkpoint {
            page: state.current_page().map(|_| state.current),
            cursor: state.current_page().map_or(0, Page::cursor),
            allocated: state.allocated,
        }
    }

    /// Release everything allocated since `checkpoint` was taken.
    ///
    /// Pages after the checkpointed one are reset but kept for reuse. A
    /// checkpoint of an empty arena rewinds to the same state as
    /// [`Arena::reset`].
    pub fn rewind(&mut self, checkpoint: Checkpoint) -> Result<(), AllocError> {
        let Some(index) = checkpoint.page else {
            self.reset();
            return Ok(());
        };
        let state = self.state.get_mut();
        let page_count = state.pages.len();
        let invalid = AllocError::InvalidCheckpoint {
            page: index,
            page_count,
        };

        let Some(page) = state.pages.get_mut(index) else {
            error!(page = index, page_count, "rewind to a page the arena no longer owns");
            return Err(invalid);
        };
        if !page.set_cursor(checkpoint.cursor) {
            error!(page = index, cursor = checkpoint.cursor, "rewind cursor outside page");
            return Err(invalid);
        }
        for page in &mut state.pages[index + 1..] {
            page.reset();
        }
        state.current = index;
        state.allocated = checkpoint.allocated;
        debug!(page = index, allocated = checkpoint.allocated, "arena rewound");
        Ok(())
    }

    /// Release every allocation, keeping the pages for reuse.
    ///
    /// The next allocation returns the first page's aligned start.
    pub fn reset(&mut self) {
        let state = self.state.get_mut();
        for page in &mut state.pages {
            page.reset();
        }
        state.current = 0;
        state.allocated = 0;
        debug!(pages = state.pages.len(), "arena reset");
    }

    /// Return every page to the page allocator, newest first.
    ///
    /// The arena stays usable and starts over from no pages.
    pub fn destroy(&mut self) {
        let pages = std::mem::take(&mut self.state.get_mut().pages);
        let count = pages.len();
        for page in pages.iter().rev() {
            // SAFETY: every page was created by `new_page` and the `&mut`
            // receiver guarantees no allocation from it is still borrowed.
            unsafe { self.release_page(page) };
        }
        let state = self.state.get_mut();
        state.current = 0;
        state.allocated = 0;
        if count > 0 {
            debug!(pages = count, "arena destroyed");
        }
    }

    // ── Typed helpers ───────────────────────────────────────────────

    /// Copy `s` into the arena.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_str(&self, s: &str) -> Result<&mut str, AllocError> {
        let ptr = self.alloc(s.len())?;
        // SAFETY: fresh block of `s.len()` bytes, filled with valid UTF-8
        // before the borrow is created; it lives as long as `&self`.
        unsafe {
            raw::copy(NonNull::from(s.as_bytes()).cast(), ptr, s.len());
            Ok(raw::str_mut(ptr, s.len()))
        }
    }

    /// Copy `bytes` into the arena.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_bytes(&self, bytes: &[u8]) -> Result<&mut [u8], AllocError> {
        let ptr = self.alloc(bytes.len())?;
        // SAFETY: fresh block of `bytes.len()` bytes, initialised by the copy.
        unsafe {
            raw::copy(NonNull::from(bytes).cast(), ptr, bytes.len());
            Ok(raw::bytes_mut(ptr, bytes.len()))
        }
    }

    /// Format `args` directly into the arena.
    ///
    /// ```
    /// use strata_arena::{Arena, ArenaConfig};
    ///
    /// let arena = Arena::new(ArenaConfig::default()).unwrap();
    /// let s = arena.alloc_fmt(format_args!("{}-{}", 4, 2)).unwrap();
    /// assert_eq!(s, "4-2");
    /// ```
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_fmt(&self, args: std::fmt::Arguments<'_>) -> Result<&mut str, AllocError> {
        let len = format::measure(args);
        let ptr = self.alloc(len)?;
        // SAFETY: fresh block of `len` bytes; zero it so the whole block is
        // initialised, then expose only the UTF-8 prefix actually written.
        unsafe {
            raw::zero(ptr, len);
            let written = format::write_into(raw::bytes_mut(ptr, len), args);
            Ok(raw::str_mut(ptr, written))
        }
    }

    /// Move `value` into the arena.
    ///
    /// The value is never dropped; the arena only reclaims its bytes.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_value<T>(&self, value: T) -> Result<&mut T, AllocError> {
        let required = std::mem::align_of::<T>();
        if required > self.config.alignment {
            return Err(AllocError::UnsupportedAlignment {
                required,
                provided: self.config.alignment,
            });
        }
        let ptr = self.alloc(std::mem::size_of::<T>())?;
        // SAFETY: fresh block sized and aligned for `T`.
        Ok(unsafe { raw::write_value(ptr, value) })
    }
}

impl<P: Allocator> Allocator for Arena<P> {
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

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        // SAFETY: forwarded from the caller.
        unsafe { self.free(ptr, size) }
    }

    fn alignment(&self) -> usize {
        self.config.alignment
    }
}

impl<P: Allocator> Drop for Arena<P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<P: Allocator> fmt::Debug for Arena<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("Arena")
            .field("config", &self.config)
            .field("allocated", &stats.allocated)
            .field("page_count", &stats.page_count)
            .field("capacity", &stats.capacity)
            .finish()
    }
}
