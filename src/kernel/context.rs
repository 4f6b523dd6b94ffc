//! Caller Execution Context
//!
//! What the trap captured about the code that made a kernel call. None of
//! this comes from the module: the gate fills it in from kernel state.

use bitflags::bitflags;

use super::module::ModuleId;

/// Identifier of a thread, assigned by the scheduler.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(transparent)]
pub struct ThreadId(u32);

impl ThreadId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// What the processor was doing when the call was made.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExecContext {
    /// Ordinary thread execution.
    Thread,
    /// System initialization, before the scheduler runs.
    Initialization,
    /// Interrupt service routine.
    Interrupt,
    /// Application timer expiration callback.
    TimerCallback,
}

bitflags! {
    /// A set of execution contexts a call is permitted from.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct ContextSet: u8 {
        const THREAD = 1 << 0;
        const INITIALIZATION = 1 << 1;
        const INTERRUPT = 1 << 2;
        const TIMER_CALLBACK = 1 << 3;

        /// Contexts that may suspend.
        const BLOCKING = Self::THREAD.bits();
        /// Contexts allowed to create objects.
        const SETUP = Self::THREAD.bits() | Self::INITIALIZATION.bits();
        const ANY = Self::THREAD.bits()
            | Self::INITIALIZATION.bits()
            | Self::INTERRUPT.bits()
            | Self::TIMER_CALLBACK.bits();
    }
}

impl ExecContext {
    /// The single-member set for this context.
    pub const fn as_set(self) -> ContextSet {
        match self {
            Self::Thread => ContextSet::THREAD,
            Self::Initialization => ContextSet::INITIALIZATION,
            Self::Interrupt => ContextSet::INTERRUPT,
            Self::TimerCallback => ContextSet::TIMER_CALLBACK,
        }
    }

    /// Check whether a thread in this context may suspend.
    pub const fn can_block(self) -> bool {
        ContextSet::BLOCKING.contains(self.as_set())
    }
}

/// Identity of the caller of one kernel call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CallerContext {
    pub module: ModuleId,
    pub thread: ThreadId,
    pub exec: ExecContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_threads_block() {
        assert!(ExecContext::Thread.can_block());
        assert!(!ExecContext::Initialization.can_block());
        assert!(!ExecContext::Interrupt.can_block());
        assert!(!ExecContext::TimerCallback.can_block());
    }

    #[test]
    fn test_setup_set() {
        assert!(ContextSet::SETUP.contains(ExecContext::Initialization.as_set()));
        assert!(!ContextSet::SETUP.contains(ExecContext::Interrupt.as_set()));
    }
}
