//! Bump allocation for Strata: page-chained arenas and temp space.
//!
//! # Architecture
//!
//! ```text
//! Arena<P> (page-chained bump allocator, implements Allocator)
//! ├── ArenaConfig + ArenaFlags (alignment, page size, STACK/ZERO/FLEXIBLE)
//! ├── P: Allocator (page source: Heap, ambient context, another arena)
//! └── Page[] (bump cursor per page, reused after reset/rewind)
//!
//! TempAllocator (one fixed heap block, lazily allocated, per-thread via with_temp)
//! ```
//!
//! Allocation is `&self` so an arena can back several containers through
//! `&Arena`; bulk release (`reset`, `rewind`, `destroy`) is `&mut self`.
//!
//! # Unsafe
//!
//! `raw` holds the byte-level primitives. `page`, `arena` and `temp` opt
//! in to `unsafe` only for pointer arithmetic and the `Allocator` methods
//! that are `unsafe` by contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
mod format;
mod page;
mod raw;
pub mod temp;

// Public re-exports for the primary API surface.
pub use arena::{Arena, ArenaStats, Checkpoint};
pub use config::{ArenaConfig, ArenaFlags};
pub use temp::{with_temp, TempAllocator, TempCheckpoint};
