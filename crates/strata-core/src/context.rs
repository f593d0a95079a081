//! Per-thread ambient allocator.
//!
//! Code that does not take an allocator parameter asks [`current`] for
//! one. Callers change it for a region of code with [`scope`]:
//!
//! ```
//! use std::rc::Rc;
//! use strata_core::{context, Allocator, Heap};
//!
//! let depth = context::depth();
//! context::scope(Rc::new(Heap), || {
//!     assert_eq!(context::depth(), depth + 1);
//!     let alloc = context::current();
//!     let ptr = alloc.allocate(16).unwrap();
//!     unsafe { alloc.deallocate(ptr, 16).unwrap() };
//! });
//! assert_eq!(context::depth(), depth);
//! ```
//!
//! The stack is thread-local and always holds [`Heap`] at the bottom, so
//! [`current`] never fails.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::heap::Heap;
use crate::traits::Allocator;

thread_local! {
    static STACK: RefCell<Vec<Rc<dyn Allocator>>> = RefCell::new(vec![Rc::new(Heap)]);
}

/// The innermost allocator installed on this thread.
pub fn current() -> Rc<dyn Allocator> {
    STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| Rc::new(Heap))
    })
}

/// Number of allocators installed above the bottom [`Heap`].
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len().saturating_sub(1))
}

/// Run `f` with `alloc` as the ambient allocator.
///
/// The previous allocator is restored when `f` returns or unwinds.
pub fn scope<R>(alloc: Rc<dyn Allocator>, f: impl FnOnce() -> R) -> R {
    let depth = STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(alloc);
        stack.len() - 1
    });
    trace!(depth, "ambient allocator installed");
    let _guard = PopOnDrop;
    f()
}

struct PopOnDrop;

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        // `try_with`: the thread-local may already be gone during thread exit.
        let _ = STACK.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.len() > 1 {
                stack.pop();
                trace!(depth = stack.len() - 1, "ambient allocator restored");
            }
        });
    }
}
