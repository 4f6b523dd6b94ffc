//! Event Flag Group Primitives
//!
//! A word of flags that threads set and wait on, in AND or OR mode.

use crate::call::status::Status;
use crate::call::validate::Wait;
use crate::object::{Handle, KernelObject};

use super::module::ModuleId;
use super::{corrupted, KernelState};

/// How `set` combines the given flags with the current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOption {
    /// current |= flags
    Or,
    /// current &= flags
    And,
}

impl SetOption {
    pub const OR: usize = 0;
    pub const AND: usize = 2;

    pub const fn from_word(word: usize) -> Option<Self> {
        match word {
            Self::OR => Some(Self::Or),
            Self::AND => Some(Self::And),
            _ => None,
        }
    }

    pub const fn to_word(self) -> usize {
        match self {
            Self::Or => Self::OR,
            Self::And => Self::AND,
        }
    }
}

/// What `get` requires of the requested flags, and whether to consume them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetOption {
    Or,
    OrClear,
    And,
    AndClear,
}

impl GetOption {
    pub const OR: usize = 0;
    pub const OR_CLEAR: usize = 1;
    pub const AND: usize = 2;
    pub const AND_CLEAR: usize = 3;

    pub const fn from_word(word: usize) -> Option<Self> {
        match word {
            Self::OR => Some(Self::Or),
            Self::OR_CLEAR => Some(Self::OrClear),
            Self::AND => Some(Self::And),
            Self::AND_CLEAR => Some(Self::AndClear),
            _ => None,
        }
    }

    pub const fn to_word(self) -> usize {
        match self {
            Self::Or => Self::OR,
            Self::OrClear => Self::OR_CLEAR,
            Self::And => Self::AND,
            Self::AndClear => Self::AND_CLEAR,
        }
    }

    const fn requires_all(self) -> bool {
        matches!(self, Self::And | Self::AndClear)
    }

    const fn clears(self) -> bool {
        matches!(self, Self::OrClear | Self::AndClear)
    }
}

/// Event flag group control block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFlagsCb {
    current: usize,
    pub(crate) waiters: usize,
}

impl EventFlagsCb {
    pub const fn new() -> Self {
        Self {
            current: 0,
            waiters: 0,
        }
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn waiters(&self) -> usize {
        self.waiters
    }

    pub fn set(&mut self, flags: usize, option: SetOption) {
        match option {
            SetOption::Or => self.current |= flags,
            SetOption::And => self.current &= flags,
        }
    }

    /// Check the requested flags. On success returns the flags as they
    /// were before any clearing.
    pub fn get(&mut self, requested: usize, option: GetOption) -> Result<usize, Status> {
        let matched = self.current & requested;
        let satisfied = if option.requires_all() {
            matched == requested
        } else {
            matched != 0
        };
        if !satisfied {
            return Err(Status::NoEvents);
        }

        let actual = self.current;
        if option.clears() {
            self.current &= !requested;
        }
        Ok(actual)
    }

    /// Info block: `[current flags, suspended threads]`.
    pub fn info(&self) -> [usize; 2] {
        [self.current, self.waiters]
    }
}

impl Default for EventFlagsCb {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelState {
    fn event_flags_mut(&mut self, handle: Handle) -> &mut EventFlagsCb {
        match self.objects.get_mut(handle) {
            Some(KernelObject::EventFlags(e)) => e,
            _ => corrupted("validated event flags handle", handle),
        }
    }

    pub(crate) fn event_flags_create(&mut self, owner: ModuleId) -> Result<Handle, Status> {
        self.objects
            .insert(owner, KernelObject::EventFlags(EventFlagsCb::new()))
            .map_err(|err| {
                log::warn!("[KERNEL] event flags create: {}", err);
                Status::NoMemory
            })
    }

    pub(crate) fn event_flags_delete(&mut self, handle: Handle) -> Status {
        if self.event_flags_mut(handle).waiters > 0 {
            return Status::InUse;
        }
        if self.objects.remove(handle).is_err() {
            corrupted("event flags vanished during delete", handle);
        }
        Status::Success
    }

    pub(crate) fn event_flags_set(&mut self, handle: Handle, flags: usize, option: SetOption) -> Status {
        self.event_flags_mut(handle).set(flags, option);
        Status::Success
    }

    pub(crate) fn event_flags_get(
        &mut self,
        handle: Handle,
        requested: usize,
        option: GetOption,
        wait: Wait,
    ) -> Result<usize, Status> {
        let result = self.event_flags_mut(handle).get(requested, option);
        if result.is_err() && wait.suspends() {
            log::debug!("[KERNEL] wait {:?} on event flags {:?} expired: no scheduler", wait, handle);
        }
        result
    }

    pub(crate) fn event_flags_info(&mut self, handle: Handle) -> [usize; 2] {
        self.event_flags_mut(handle).info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_and_semantics() {
        let mut e = EventFlagsCb::new();
        e.set(0b0101, SetOption::Or);
        assert_eq!(e.get(0b0001, GetOption::Or), Ok(0b0101));
        assert_eq!(e.get(0b0011, GetOption::Or), Ok(0b0101));
        assert_eq!(e.get(0b0011, GetOption::And), Err(Status::NoEvents));
        assert_eq!(e.get(0b1010, GetOption::Or), Err(Status::NoEvents));

        e.set(0b0100, SetOption::And);
        assert_eq!(e.current(), 0b0100);
    }

    #[test]
    fn test_clear_consumes_requested_only() {
        let mut e = EventFlagsCb::new();
        e.set(0b0111, SetOption::Or);
        assert_eq!(e.get(0b0011, GetOption::AndClear), Ok(0b0111));
        assert_eq!(e.current(), 0b0100);
        assert_eq!(e.get(0b0011, GetOption::OrClear), Err(Status::NoEvents));
    }

    #[test]
    fn test_option_words() {
        assert_eq!(SetOption::from_word(1), None);
        assert_eq!(GetOption::from_word(3), Some(GetOption::AndClear));
        assert_eq!(GetOption::from_word(4), None);
    }
}
