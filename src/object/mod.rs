//! Kernel Object Model
//!
//! Trusted-side storage for the objects modules create through the
//! gateway.
//!
//! # Design
//! - Objects live in a fixed arena owned by the kernel
//! - Modules hold handles (index + generation + kind tag), never addresses
//! - Every handle is re-validated on each call
//!
//! # Security Properties
//! - A handle cannot be turned into a reference without a table lookup
//! - Deleting an object invalidates every copy of its handle
//! - Objects are scoped to the module that created them

pub mod handle;
pub mod table;

pub use handle::{Handle, ObjectKind};
pub use table::{Entry, ObjectTable, TableError, OBJECT_POOL_SIZE};

use crate::kernel::event_flags::EventFlagsCb;
use crate::kernel::mutex::MutexCb;
use crate::kernel::semaphore::SemaphoreCb;

/// A control block stored in the object table.
#[derive(Debug)]
pub enum KernelObject {
    Mutex(MutexCb),
    Semaphore(SemaphoreCb),
    EventFlags(EventFlagsCb),
}

impl KernelObject {
    /// The kind tag handles to this object carry.
    #[inline]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Mutex(_) => ObjectKind::Mutex,
            Self::Semaphore(_) => ObjectKind::Semaphore,
            Self::EventFlags(_) => ObjectKind::EventFlags,
        }
    }

    /// Number of threads suspended on the object.
    pub fn waiters(&self) -> usize {
        match self {
            Self::Mutex(m) => m.waiters(),
            Self::Semaphore(s) => s.waiters(),
            Self::EventFlags(e) => e.waiters(),
        }
    }

    /// Count one more suspended thread. Returns the new count.
    pub fn add_waiter(&mut self) -> usize {
        let waiters = self.waiters_mut();
        *waiters += 1;
        *waiters
    }

    /// Count one fewer suspended thread. Returns the new count.
    pub fn remove_waiter(&mut self) -> usize {
        let waiters = self.waiters_mut();
        *waiters = waiters.saturating_sub(1);
        *waiters
    }

    fn waiters_mut(&mut self) -> &mut usize {
        match self {
            Self::Mutex(m) => &mut m.waiters,
            Self::Semaphore(s) => &mut s.waiters,
            Self::EventFlags(e) => &mut e.waiters,
        }
    }
}
