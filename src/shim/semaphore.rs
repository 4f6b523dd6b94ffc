//! Counting semaphore shims.

use crate::call::{Opcode, Status};

use super::{module_addr, module_handle, ModuleCalls};

module_handle!(
    /// A semaphore created through [`ModuleCalls::semaphore_create`].
    SemaphoreHandle
);

/// Filled in by [`ModuleCalls::semaphore_info_get`].
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreInfo {
    pub count: usize,
    pub suspended: usize,
}

const _: () = assert!(core::mem::size_of::<SemaphoreInfo>() == 2 * core::mem::size_of::<usize>());

impl ModuleCalls<'_> {
    pub fn semaphore_create(&self, semaphore: &mut SemaphoreHandle, initial: usize) -> Status {
        self.call_status(Opcode::SemaphoreCreate, module_addr(semaphore), initial, 0)
    }

    pub fn semaphore_delete(&self, semaphore: SemaphoreHandle) -> Status {
        if semaphore.is_null() {
            return Status::SemaphoreError;
        }
        self.call_status(Opcode::SemaphoreDelete, semaphore.raw(), 0, 0)
    }

    pub fn semaphore_get(&self, semaphore: SemaphoreHandle, wait: usize) -> Status {
        if semaphore.is_null() {
            return Status::SemaphoreError;
        }
        self.call_status(Opcode::SemaphoreGet, semaphore.raw(), wait, 0)
    }

    pub fn semaphore_put(&self, semaphore: SemaphoreHandle) -> Status {
        if semaphore.is_null() {
            return Status::SemaphoreError;
        }
        self.call_status(Opcode::SemaphorePut, semaphore.raw(), 0, 0)
    }

    /// Put, unless the count would exceed `ceiling`.
    pub fn semaphore_ceiling_put(&self, semaphore: SemaphoreHandle, ceiling: usize) -> Status {
        if semaphore.is_null() {
            return Status::SemaphoreError;
        }
        self.call_status(Opcode::SemaphoreCeilingPut, semaphore.raw(), ceiling, 0)
    }

    pub fn semaphore_info_get(&self, semaphore: SemaphoreHandle, info: &mut SemaphoreInfo) -> Status {
        if semaphore.is_null() {
            return Status::SemaphoreError;
        }
        self.call_status(Opcode::SemaphoreInfoGet, semaphore.raw(), module_addr(info), 0)
    }
}
