//! Call Status Codes
//!
//! The closed set of values a kernel call can return to a module. The
//! numeric values are part of the module ABI.

use core::fmt;

use crate::object::{ObjectKind, TableError};

use super::validate::ValidateError;

/// Status returned across the module boundary.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The call completed.
    Success = 0x00,
    /// A module-memory pointer failed validation.
    PtrError = 0x03,
    /// A wait option was given where waiting is not allowed.
    WaitError = 0x04,
    /// A size or count argument is out of range.
    SizeError = 0x05,
    /// Invalid event flags handle.
    GroupError = 0x06,
    /// The requested event flags are not set.
    NoEvents = 0x07,
    /// Invalid option argument.
    OptionError = 0x08,
    /// Invalid semaphore handle.
    SemaphoreError = 0x0C,
    /// The semaphore count is zero.
    NoInstance = 0x0D,
    /// The object pool has no room for a new object.
    NoMemory = 0x10,
    /// The call is not permitted from the caller's current context.
    CallerError = 0x13,
    /// Invalid mutex handle.
    MutexError = 0x1C,
    /// The mutex is owned by another thread.
    NotAvailable = 0x1D,
    /// The caller does not own the mutex.
    NotOwned = 0x1E,
    /// Invalid priority inheritance option.
    InheritError = 0x1F,
    /// The semaphore is already at its ceiling.
    CeilingExceeded = 0x21,
    /// Threads are still suspended on the object.
    InUse = 0x22,
    /// The opcode is not part of the call ABI.
    InvalidCall = 0xF0,
}

/// Broad classes of call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The call succeeded.
    Success,
    /// Rejected for the opcode or the caller, not for an argument value.
    Dispatch,
    /// An argument failed trusted-side validation.
    Argument,
    /// The primitive ran and reported a condition of its own.
    Primitive,
}

impl Status {
    const ALL: [Self; 18] = [
        Self::Success,
        Self::PtrError,
        Self::WaitError,
        Self::SizeError,
        Self::GroupError,
        Self::NoEvents,
        Self::OptionError,
        Self::SemaphoreError,
        Self::NoInstance,
        Self::NoMemory,
        Self::CallerError,
        Self::MutexError,
        Self::NotAvailable,
        Self::NotOwned,
        Self::InheritError,
        Self::CeilingExceeded,
        Self::InUse,
        Self::InvalidCall,
    ];

    /// Encode as a return word.
    #[inline]
    pub const fn to_word(self) -> usize {
        self as u32 as usize
    }

    /// Decode a return word.
    pub fn from_word(word: usize) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.to_word() == word)
    }

    /// Check for success.
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// The invalid-handle status for an object kind.
    pub const fn invalid_handle(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Mutex => Self::MutexError,
            ObjectKind::Semaphore => Self::SemaphoreError,
            ObjectKind::EventFlags => Self::GroupError,
        }
    }

    /// Which failure class this status belongs to.
    pub const fn class(self) -> StatusClass {
        match self {
            Self::Success => StatusClass::Success,
            Self::InvalidCall | Self::CallerError => StatusClass::Dispatch,
            Self::PtrError
            | Self::WaitError
            | Self::SizeError
            | Self::GroupError
            | Self::OptionError
            | Self::SemaphoreError
            | Self::MutexError
            | Self::InheritError => StatusClass::Argument,
            Self::NoEvents
            | Self::NoInstance
            | Self::NoMemory
            | Self::NotAvailable
            | Self::NotOwned
            | Self::CeilingExceeded
            | Self::InUse => StatusClass::Primitive,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:#04x})", self, self.to_word())
    }
}

impl From<ValidateError> for Status {
    fn from(_: ValidateError) -> Self {
        Self::PtrError
    }
}

/// Map a failed handle lookup to the kind-specific status.
///
/// Every lookup failure reads the same to the module, so a module cannot
/// probe for objects it does not own.
pub fn handle_status(kind: ObjectKind, _err: TableError) -> Status {
    Status::invalid_handle(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_word_knows_every_status() {
        for s in Status::ALL {
            assert_eq!(Status::from_word(s.to_word()), Some(s));
        }
        assert_eq!(Status::from_word(0xDEAD), None);
    }

    #[test]
    fn test_classes() {
        assert_eq!(Status::InvalidCall.class(), StatusClass::Dispatch);
        assert_eq!(Status::CallerError.class(), StatusClass::Dispatch);
        assert_eq!(Status::MutexError.class(), StatusClass::Argument);
        assert_eq!(Status::InUse.class(), StatusClass::Primitive);
    }
}
