//! Strata: page-chained arenas and allocator-aware containers.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Strata sub-crates. For most users, adding `strata` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! // An arena whose pages come from the heap.
//! let mut arena = Arena::new(ArenaConfig::default()).unwrap();
//!
//! // Containers allocate through any `Allocator`, including the arena.
//! let mut counts = HashMap::new_in(&arena);
//! for word in "the cat and the hat".split(' ') {
//!     let n = counts.get(word).copied().unwrap_or(0);
//!     counts.put(word, n + 1).unwrap();
//! }
//! assert_eq!(counts.get("the"), Some(&2));
//! drop(counts);
//!
//! // Strings live as long as the arena borrow.
//! let greeting = arena.alloc_fmt(format_args!("{}, {}!", "hello", "world")).unwrap();
//! assert_eq!(greeting, "hello, world!");
//!
//! // Everything is released in bulk.
//! arena.reset();
//! assert_eq!(arena.allocated(), 0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`allocator`] | `strata-core` | `Allocator` trait, `Heap`, ambient context, errors |
//! | [`arena`] | `strata-arena` | `Arena`, `ArenaConfig`, `TempAllocator` |
//! | [`collections`] | `strata-collections` | `HashMap`, `Array`, hashers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Allocator capability, heap allocator, and ambient context (`strata-core`).
///
/// Implement [`allocator::Allocator`] to plug a new memory source into every
/// arena and container; use [`allocator::context::scope`] to make it ambient.
pub use strata_core as allocator;

/// Page-chained bump arenas and temp allocators (`strata-arena`).
///
/// [`arena::Arena`] supports checkpoints, stack-order freeing, flexible
/// pages and zeroed allocation via [`arena::ArenaFlags`].
pub use strata_arena as arena;

/// Allocator-aware containers (`strata-collections`).
///
/// [`collections::HashMap`] uses open addressing with tombstones;
/// [`collections::Array`] grows in place when its allocator can.
pub use strata_collections as collections;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Allocators
    pub use strata_core::{context, AllocError, Allocator, ConfigError, Heap};

    // Arenas
    pub use strata_arena::{with_temp, Arena, ArenaConfig, ArenaFlags, Checkpoint, TempAllocator};

    // Containers
    pub use strata_collections::{Array, HashMap};
}
