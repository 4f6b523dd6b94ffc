//! Mutex Primitives
//!
//! Recursive mutexes with an owning thread. Priority inheritance is
//! recorded but not acted on: there are no priorities here.

use crate::call::status::Status;
use crate::call::validate::Wait;
use crate::object::{Handle, KernelObject};

use super::context::ThreadId;
use super::module::ModuleId;
use super::{corrupted, KernelState};

/// Mutex control block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexCb {
    owner: Option<ThreadId>,
    ownership_count: usize,
    inherit: bool,
    pub(crate) waiters: usize,
}

impl MutexCb {
    /// An unowned mutex.
    pub const fn new(inherit: bool) -> Self {
        Self {
            owner: None,
            ownership_count: 0,
            inherit,
            waiters: 0,
        }
    }

    #[inline]
    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    #[inline]
    pub fn ownership_count(&self) -> usize {
        self.ownership_count
    }

    #[inline]
    pub fn inherit(&self) -> bool {
        self.inherit
    }

    #[inline]
    pub fn waiters(&self) -> usize {
        self.waiters
    }

    /// Take the mutex, or take it again if already held.
    pub fn acquire(&mut self, thread: ThreadId) -> Status {
        match self.owner {
            None => {
                self.owner = Some(thread);
                self.ownership_count = 1;
                Status::Success
            }
            Some(owner) if owner == thread => {
                self.ownership_count += 1;
                Status::Success
            }
            Some(_) => Status::NotAvailable,
        }
    }

    /// Drop one level of ownership.
    pub fn release(&mut self, thread: ThreadId) -> Status {
        if self.owner != Some(thread) {
            return Status::NotOwned;
        }
        self.ownership_count -= 1;
        if self.ownership_count == 0 {
            self.owner = None;
        }
        Status::Success
    }

    /// Info block: `[ownership count, owner thread, suspended threads]`.
    ///
    /// The owner word is meaningful only when the count is non-zero.
    pub fn info(&self) -> [usize; 3] {
        [
            self.ownership_count,
            self.owner.map_or(0, |t| t.get() as usize),
            self.waiters,
        ]
    }
}

impl KernelState {
    fn mutex_mut(&mut self, handle: Handle) -> &mut MutexCb {
        match self.objects.get_mut(handle) {
            Some(KernelObject::Mutex(m)) => m,
            _ => corrupted("validated mutex handle", handle),
        }
    }

    pub(crate) fn mutex_create(&mut self, owner: ModuleId, inherit: bool) -> Result<Handle, Status> {
        self.objects
            .insert(owner, KernelObject::Mutex(MutexCb::new(inherit)))
            .map_err(|err| {
                log::warn!("[KERNEL] mutex create: {}", err);
                Status::NoMemory
            })
    }

    pub(crate) fn mutex_delete(&mut self, handle: Handle) -> Status {
        let waiters = self.mutex_mut(handle).waiters;
        if waiters > 0 {
            log::debug!("[KERNEL] mutex {:?} has {} waiters", handle, waiters);
            return Status::InUse;
        }
        if self.objects.remove(handle).is_err() {
            corrupted("mutex vanished during delete", handle);
        }
        Status::Success
    }

    pub(crate) fn mutex_get(&mut self, handle: Handle, thread: ThreadId, wait: Wait) -> Status {
        let status = self.mutex_mut(handle).acquire(thread);
        if status == Status::NotAvailable && wait.suspends() {
            log::debug!(
                "[KERNEL] thread {} wait {:?} on mutex {:?} expired: no scheduler",
                thread.get(),
                wait,
                handle
            );
        }
        status
    }

    pub(crate) fn mutex_put(&mut self, handle: Handle, thread: ThreadId) -> Status {
        self.mutex_mut(handle).release(thread)
    }

    pub(crate) fn mutex_info(&mut self, handle: Handle) -> [usize; 3] {
        self.mutex_mut(handle).info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T1: ThreadId = ThreadId::new(1);
    const T2: ThreadId = ThreadId::new(2);

    #[test]
    fn test_recursive_ownership() {
        let mut m = MutexCb::new(false);
        assert_eq!(m.acquire(T1), Status::Success);
        assert_eq!(m.acquire(T1), Status::Success);
        assert_eq!(m.ownership_count(), 2);
        assert_eq!(m.acquire(T2), Status::NotAvailable);

        assert_eq!(m.release(T1), Status::Success);
        assert_eq!(m.owner(), Some(T1));
        assert_eq!(m.release(T1), Status::Success);
        assert_eq!(m.owner(), None);
        assert_eq!(m.acquire(T2), Status::Success);
    }

    #[test]
    fn test_release_by_non_owner() {
        let mut m = MutexCb::new(true);
        assert_eq!(m.release(T1), Status::NotOwned);
        m.acquire(T1);
        assert_eq!(m.release(T2), Status::NotOwned);
        assert_eq!(m.info(), [1, 1, 0]);
        assert!(m.inherit());
    }
}
