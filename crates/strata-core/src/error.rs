//! Error types for allocator construction and allocation.
//!
//! Two families, kept apart on purpose: [`ConfigError`] is returned while
//! building an allocator from invalid parameters, [`AllocError`] from the
//! allocation operations themselves.

use std::error::Error;
use std::fmt;

/// Invalid construction parameters for an allocator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested alignment is not a power of two.
    AlignmentNotPowerOfTwo {
        /// The rejected alignment.
        alignment: usize,
    },
    /// The page size cannot hold the page header plus one alignment unit.
    PageTooSmall {
        /// The rejected page size in bytes.
        page_size: usize,
        /// Page sizes must be strictly greater than this.
        minimum: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlignmentNotPowerOfTwo { alignment } => {
                write!(f, "alignment {alignment} is not a power of two")
            }
            Self::PageTooSmall { page_size, minimum } => {
                write!(
                    f,
                    "page size {page_size} bytes must be greater than {minimum} bytes (page header + alignment)"
                )
            }
        }
    }
}

impl Error for ConfigError {}

/// Errors returned by [`Allocator`](crate::Allocator) operations.
///
/// `OutOfMemory` and `CapacityOverflow` are environmental. The remaining
/// variants mean the caller broke the allocator's protocol; see
/// [`AllocError::is_protocol_violation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The backing allocator could not satisfy the request.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },
    /// A single allocation does not fit in a page (or in a fixed region)
    /// and the allocator is not allowed to grow one to fit.
    AllocationTooLarge {
        /// Number of bytes requested.
        requested: usize,
        /// Largest allocation the allocator could have served.
        available: usize,
    },
    /// A stack-mode arena was asked to free something other than its
    /// most recent allocation.
    OutOfOrderFree {
        /// Address passed to the free.
        ptr: usize,
        /// Address a LIFO free of that size would have had to pass.
        expected: usize,
    },
    /// The element layout needs stronger alignment than the allocator
    /// guarantees.
    UnsupportedAlignment {
        /// Alignment the element type needs.
        required: usize,
        /// Alignment the allocator provides.
        provided: usize,
    },
    /// A size computation overflowed `usize`.
    CapacityOverflow,
    /// A checkpoint refers to a page the arena no longer owns.
    InvalidCheckpoint {
        /// Page index recorded in the checkpoint.
        page: usize,
        /// Number of pages the arena currently owns.
        page_count: usize,
    },
}

impl AllocError {
    /// Whether this error reports a caller bug rather than an
    /// environmental failure.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::AllocationTooLarge { .. }
                | Self::OutOfOrderFree { .. }
                | Self::InvalidCheckpoint { .. }
        )
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "memory allocation failed: {requested} bytes requested")
            }
            Self::AllocationTooLarge {
                requested,
                available,
            } => {
                write!(
                    f,
                    "allocation too large: {requested} bytes requested, {available} bytes available"
                )
            }
            Self::OutOfOrderFree { ptr, expected } => {
                write!(
                    f,
                    "deallocating memory in non-LIFO order: got {ptr:#x}, expected {expected:#x}"
                )
            }
            Self::UnsupportedAlignment { required, provided } => {
                write!(
                    f,
                    "unsupported alignment: element needs {required}, allocator provides {provided}"
                )
            }
            Self::CapacityOverflow => write!(f, "capacity overflow"),
            Self::InvalidCheckpoint { page, page_count } => {
                write!(
                    f,
                    "invalid checkpoint: page {page} does not exist (arena owns {page_count} pages)"
                )
            }
        }
    }
}

impl Error for AllocError {}
