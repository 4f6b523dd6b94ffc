//! Kernel Object Handles
//!
//! A handle is the only form in which a module ever sees a kernel object.
//! It is a plain word with no address meaning: the trusted side decodes it
//! into a pool index, a generation and a kind tag, and checks all three
//! against the object table before anything is touched.
//!
//! # Handle Layout
//! ```text
//! ┌───────────────┬──────┬──────────────────┬──────────────┐
//! │ 63 ..... 28   │27..24│ 23 ........... 8 │ 7 ........ 0 │
//! │ must be zero  │ kind │   generation     │  pool index  │
//! └───────────────┴──────┴──────────────────┴──────────────┘
//! ```
//!
//! The kind tag is never zero for a live object, so the all-zero word is
//! free to serve as the null handle.

use core::fmt;

const INDEX_BITS: u32 = 8;
const GENERATION_BITS: u32 = 16;
const KIND_BITS: u32 = 4;

const GENERATION_SHIFT: u32 = INDEX_BITS;
const KIND_SHIFT: u32 = INDEX_BITS + GENERATION_BITS;
const USED_BITS: u32 = KIND_SHIFT + KIND_BITS;

const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: usize = (1 << GENERATION_BITS) - 1;
const KIND_MASK: usize = (1 << KIND_BITS) - 1;

/// Largest pool index a handle can carry.
pub const MAX_HANDLE_INDEX: usize = INDEX_MASK;

/// Types of kernel objects that can be named by a handle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ObjectKind {
    /// Mutual exclusion lock with ownership.
    Mutex = 1,

    /// Counting semaphore.
    Semaphore = 2,

    /// Group of event flags.
    EventFlags = 3,
}

impl ObjectKind {
    /// Decode a kind tag. Tag 0 and unassigned tags yield `None`.
    #[inline]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Mutex),
            2 => Some(Self::Semaphore),
            3 => Some(Self::EventFlags),
            _ => None,
        }
    }

    /// The tag stored in the handle word.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutex => write!(f, "mutex"),
            Self::Semaphore => write!(f, "semaphore"),
            Self::EventFlags => write!(f, "event flags"),
        }
    }
}

/// An opaque reference to a trusted-domain object.
///
/// Anything can be wrapped in a `Handle`; wrapping proves nothing. Only a
/// successful lookup in the object table does.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(usize);

impl Handle {
    /// The null handle. Never names an object.
    pub const NULL: Self = Self(0);

    /// Build a handle for a table slot.
    ///
    /// Only the object table mints handles.
    #[inline]
    pub(crate) const fn new(kind: ObjectKind, index: usize, generation: u16) -> Self {
        debug_assert!(index <= MAX_HANDLE_INDEX);
        Self(
            (index & INDEX_MASK)
                | ((generation as usize) << GENERATION_SHIFT)
                | ((kind.tag() as usize) << KIND_SHIFT),
        )
    }

    /// Wrap an untrusted word received across the boundary.
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The word a module stores and passes back.
    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    /// Check for the null handle.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check that no bits outside the handle layout are set.
    #[inline]
    pub const fn is_well_formed(self) -> bool {
        (self.0 as u64) >> USED_BITS == 0
    }

    /// Decoded kind tag, if it names a known kind.
    #[inline]
    pub const fn kind(self) -> Option<ObjectKind> {
        ObjectKind::from_tag(((self.0 >> KIND_SHIFT) & KIND_MASK) as u8)
    }

    /// Decoded pool index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 & INDEX_MASK
    }

    /// Decoded generation.
    #[inline]
    pub const fn generation(self) -> u16 {
        ((self.0 >> GENERATION_SHIFT) & GENERATION_MASK) as u16
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(
                f,
                "Handle({:#x}: kind={:?}, index={}, gen={})",
                self.0,
                self.kind(),
                self.index(),
                self.generation()
            )
        }
    }
}
