//! Core allocator abstractions for the Strata memory toolkit.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! [`Allocator`] capability every container in the workspace allocates
//! through, the default [`Heap`] allocator, the per-thread ambient
//! allocator [`context`], alignment arithmetic and the error types.
//!
//! Unsafe code is confined to the allocator plumbing (`heap`, `traits`);
//! every block carries a `// SAFETY:` comment.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod align;
pub mod context;
pub mod error;
pub mod heap;
pub mod traits;

pub use error::{AllocError, ConfigError};
pub use heap::{Heap, HEAP_ALIGNMENT};
pub use traits::Allocator;
