//! Kernel Call Opcodes
//!
//! Module binaries are built against these numbers independently of the
//! kernel, so every value here is ABI. New calls get new numbers; existing
//! numbers never change meaning. Bump [`ABI_VERSION`] on any change that
//! breaks an existing number.
//!
//! Opcodes are grouped by service class in the high byte:
//! - `0x01xx`: mutex
//! - `0x02xx`: semaphore
//! - `0x03xx`: event flags
//! - `0x05xx`: time

use core::fmt;

use crate::kernel::context::ContextSet;
use crate::kernel::module::Services;

/// Version of the call ABI described by [`Opcode`].
pub const ABI_VERSION: u32 = 1;

/// A kernel primitive a module can request.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    MutexCreate = 0x0100,
    MutexDelete = 0x0101,
    MutexGet = 0x0102,
    MutexPut = 0x0103,
    MutexInfoGet = 0x0104,

    SemaphoreCreate = 0x0200,
    SemaphoreDelete = 0x0201,
    SemaphoreGet = 0x0202,
    SemaphorePut = 0x0203,
    SemaphoreCeilingPut = 0x0204,
    SemaphoreInfoGet = 0x0205,

    EventFlagsCreate = 0x0300,
    EventFlagsDelete = 0x0301,
    EventFlagsSet = 0x0302,
    EventFlagsGet = 0x0303,
    EventFlagsInfoGet = 0x0304,

    TimeGet = 0x0500,
    TimeSet = 0x0501,
}

/// Error returned when a word is not a known opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOpcode(pub usize);

impl fmt::Display for UnknownOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown opcode {:#x}", self.0)
    }
}

impl Opcode {
    /// Every opcode in the ABI.
    pub const ALL: [Self; 18] = [
        Self::MutexCreate,
        Self::MutexDelete,
        Self::MutexGet,
        Self::MutexPut,
        Self::MutexInfoGet,
        Self::SemaphoreCreate,
        Self::SemaphoreDelete,
        Self::SemaphoreGet,
        Self::SemaphorePut,
        Self::SemaphoreCeilingPut,
        Self::SemaphoreInfoGet,
        Self::EventFlagsCreate,
        Self::EventFlagsDelete,
        Self::EventFlagsSet,
        Self::EventFlagsGet,
        Self::EventFlagsInfoGet,
        Self::TimeGet,
        Self::TimeSet,
    ];

    /// The word placed in the call record.
    #[inline]
    pub const fn number(self) -> usize {
        self as u32 as usize
    }

    /// Service class a module needs to be granted to make this call.
    pub const fn service(self) -> Services {
        match self {
            Self::MutexCreate
            | Self::MutexDelete
            | Self::MutexGet
            | Self::MutexPut
            | Self::MutexInfoGet => Services::MUTEX,
            Self::SemaphoreCreate
            | Self::SemaphoreDelete
            | Self::SemaphoreGet
            | Self::SemaphorePut
            | Self::SemaphoreCeilingPut
            | Self::SemaphoreInfoGet => Services::SEMAPHORE,
            Self::EventFlagsCreate
            | Self::EventFlagsDelete
            | Self::EventFlagsSet
            | Self::EventFlagsGet
            | Self::EventFlagsInfoGet => Services::EVENT_FLAGS,
            Self::TimeGet | Self::TimeSet => Services::TIME,
        }
    }

    /// Execution contexts this call may be made from.
    ///
    /// Calls that take a wait option are further restricted at validation
    /// time: only threads may ask to wait.
    pub const fn permitted_contexts(self) -> ContextSet {
        match self {
            Self::MutexCreate | Self::SemaphoreCreate | Self::EventFlagsCreate => {
                ContextSet::SETUP
            }
            Self::MutexDelete | Self::SemaphoreDelete | Self::EventFlagsDelete => {
                ContextSet::THREAD
            }
            Self::MutexGet | Self::MutexPut => ContextSet::SETUP,
            Self::SemaphoreGet
            | Self::SemaphorePut
            | Self::SemaphoreCeilingPut
            | Self::EventFlagsSet
            | Self::EventFlagsGet
            | Self::MutexInfoGet
            | Self::SemaphoreInfoGet
            | Self::EventFlagsInfoGet
            | Self::TimeGet
            | Self::TimeSet => ContextSet::ANY,
        }
    }
}

impl TryFrom<usize> for Opcode {
    type Error = UnknownOpcode;

    fn try_from(word: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.number() == word)
            .ok_or(UnknownOpcode(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_are_unique() {
        for (i, a) in Opcode::ALL.iter().enumerate() {
            for b in &Opcode::ALL[i + 1..] {
                assert_ne!(a.number(), b.number(), "{:?} and {:?} collide", a, b);
            }
        }
    }

    #[test]
    fn test_unknown_words_rejected() {
        for word in [0, 0x00FF, 0x0105, 0x0400, 0x0502, usize::MAX] {
            assert_eq!(Opcode::try_from(word), Err(UnknownOpcode(word)));
        }
        assert_eq!(Opcode::try_from(0x0101), Ok(Opcode::MutexDelete));
    }

    #[test]
    fn test_delete_is_thread_only() {
        for op in [
            Opcode::MutexDelete,
            Opcode::SemaphoreDelete,
            Opcode::EventFlagsDelete,
        ] {
            assert_eq!(op.permitted_contexts(), ContextSet::THREAD);
        }
    }
}
