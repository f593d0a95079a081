//! Arena configuration parameters.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use strata_core::align::is_valid_alignment;
use strata_core::ConfigError;

use crate::page::PAGE_HEADER_SIZE;

/// Behaviour switches for an [`Arena`](crate::Arena).
///
/// Combine with `|`:
///
/// ```
/// use strata_arena::ArenaFlags;
///
/// let flags = ArenaFlags::STACK_ALLOC | ArenaFlags::ZERO_ALLOC;
/// assert!(flags.contains(ArenaFlags::ZERO_ALLOC));
/// assert!(!flags.contains(ArenaFlags::FLEXIBLE_PAGE));
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ArenaFlags(u8);

impl ArenaFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Frees must happen in LIFO order; an out-of-order free is an error.
    pub const STACK_ALLOC: Self = Self(1 << 0);
    /// Every allocation is zero-filled before it is returned.
    pub const ZERO_ALLOC: Self = Self(1 << 1);
    /// Requests larger than a page get a page sized to fit them.
    pub const FLEXIBLE_PAGE: Self = Self(1 << 2);

    /// Whether every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ArenaFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ArenaFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ArenaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::STACK_ALLOC, "STACK_ALLOC"),
            (Self::ZERO_ALLOC, "ZERO_ALLOC"),
            (Self::FLEXIBLE_PAGE, "FLEXIBLE_PAGE"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in names {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Configuration for the arena allocator.
///
/// Zero values mean "use the default". Validated at construction; all
/// values are immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Alignment of every returned pointer, in bytes.
    ///
    /// Default: 16. Must be a power of two.
    pub alignment: usize,

    /// Size of each page requested from the page allocator, in bytes.
    ///
    /// Default: 4096. Must exceed the page header size plus the alignment.
    pub page_size: usize,

    /// Behaviour switches.
    pub flags: ArenaFlags,
}

impl ArenaConfig {
    /// Default alignment in bytes.
    pub const DEFAULT_ALIGNMENT: usize = 16;

    /// Default page size: 4 KiB.
    pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

    /// Create a config with default alignment, page size and no flags.
    pub const fn new() -> Self {
        Self {
            alignment: Self::DEFAULT_ALIGNMENT,
            page_size: Self::DEFAULT_PAGE_SIZE,
            flags: ArenaFlags::NONE,
        }
    }

    /// Set the alignment.
    pub const fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the page size.
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Replace the flags.
    pub const fn with_flags(mut self, flags: ArenaFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Smallest page size that is *not* accepted for `alignment`.
    pub const fn min_page_size(alignment: usize) -> usize {
        PAGE_HEADER_SIZE + alignment
    }

    /// Substitute defaults for zero values and check the result.
    pub fn validate(self) -> Result<Self, ConfigError> {
        let alignment = if self.alignment == 0 {
            Self::DEFAULT_ALIGNMENT
        } else {
            self.alignment
        };
        if !is_valid_alignment(alignment) {
            return Err(ConfigError::AlignmentNotPowerOfTwo { alignment });
        }

        let page_size = if self.page_size == 0 {
            Self::DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        };
        let minimum = Self::min_page_size(alignment);
        if page_size <= minimum {
            return Err(ConfigError::PageTooSmall { page_size, minimum });
        }

        Ok(Self {
            alignment,
            page_size,
            flags: self.flags,
        })
    }

    pub(crate) fn has(&self, flag: ArenaFlags) -> bool {
        self.flags.contains(flag)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}
