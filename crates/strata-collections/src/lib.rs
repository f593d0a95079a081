//! Allocator-aware containers for the Strata memory toolkit.
//!
//! Both containers allocate through any [`Allocator`](strata_core::Allocator):
//! the global heap by default, an arena, or whatever allocator is ambient
//! via [`strata_core::context`].
//!
//! - [`HashMap`]: open addressing with linear probing and tombstones, kept
//!   at or below a 0.75 load factor over a power-of-two slot count.
//! - [`Array`]: contiguous growable storage that extends in place when its
//!   allocator can.
//!
//! Allocation failure is reported as
//! [`AllocError`](strata_core::AllocError), never by aborting.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod array;
pub mod hash;
pub mod map;

pub use array::Array;
pub use hash::{DefaultHashBuilder, MixHasher, MixState};
pub use map::HashMap;
