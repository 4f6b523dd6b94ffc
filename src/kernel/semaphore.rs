//! Counting Semaphore Primitives

use crate::call::status::Status;
use crate::call::validate::Wait;
use crate::object::{Handle, KernelObject};

use super::module::ModuleId;
use super::{corrupted, KernelState};

/// Semaphore control block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemaphoreCb {
    count: usize,
    pub(crate) waiters: usize,
}

impl SemaphoreCb {
    pub const fn new(initial: usize) -> Self {
        Self {
            count: initial,
            waiters: 0,
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn waiters(&self) -> usize {
        self.waiters
    }

    /// Take one instance.
    pub fn take(&mut self) -> Status {
        if self.count == 0 {
            return Status::NoInstance;
        }
        self.count -= 1;
        Status::Success
    }

    /// Return one instance. The count wraps at the word limit.
    pub fn give(&mut self) {
        self.count = self.count.wrapping_add(1);
    }

    /// Return one instance unless the count is already at `ceiling`.
    pub fn give_bounded(&mut self, ceiling: usize) -> Status {
        if self.count >= ceiling {
            return Status::CeilingExceeded;
        }
        self.count += 1;
        Status::Success
    }

    /// Info block: `[count, suspended threads]`.
    pub fn info(&self) -> [usize; 2] {
        [self.count, self.waiters]
    }
}

impl KernelState {
    fn semaphore_mut(&mut self, handle: Handle) -> &mut SemaphoreCb {
        match self.objects.get_mut(handle) {
            Some(KernelObject::Semaphore(s)) => s,
            _ => corrupted("validated semaphore handle", handle),
        }
    }

    pub(crate) fn semaphore_create(&mut self, owner: ModuleId, initial: usize) -> Result<Handle, Status> {
        self.objects
            .insert(owner, KernelObject::Semaphore(SemaphoreCb::new(initial)))
            .map_err(|err| {
                log::warn!("[KERNEL] semaphore create: {}", err);
                Status::NoMemory
            })
    }

    pub(crate) fn semaphore_delete(&mut self, handle: Handle) -> Status {
        if self.semaphore_mut(handle).waiters > 0 {
            return Status::InUse;
        }
        if self.objects.remove(handle).is_err() {
            corrupted("semaphore vanished during delete", handle);
        }
        Status::Success
    }

    pub(crate) fn semaphore_get(&mut self, handle: Handle, wait: Wait) -> Status {
        let status = self.semaphore_mut(handle).take();
        if status == Status::NoInstance && wait.suspends() {
            log::debug!("[KERNEL] wait {:?} on semaphore {:?} expired: no scheduler", wait, handle);
        }
        status
    }

    pub(crate) fn semaphore_put(&mut self, handle: Handle) -> Status {
        self.semaphore_mut(handle).give();
        Status::Success
    }

    pub(crate) fn semaphore_ceiling_put(&mut self, handle: Handle, ceiling: usize) -> Status {
        self.semaphore_mut(handle).give_bounded(ceiling)
    }

    pub(crate) fn semaphore_info(&mut self, handle: Handle) -> [usize; 2] {
        self.semaphore_mut(handle).info()
    }
}
