//! Mutex shims.

use crate::call::{Opcode, Status};

use super::{module_addr, module_handle, ModuleCalls};

module_handle!(
    /// A mutex created through [`ModuleCalls::mutex_create`].
    MutexHandle
);

/// Filled in by [`ModuleCalls::mutex_info_get`].
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MutexInfo {
    pub ownership_count: usize,
    /// Owning thread id, or 0 when free.
    pub owner: usize,
    pub suspended: usize,
}

const _: () = assert!(core::mem::size_of::<MutexInfo>() == 3 * core::mem::size_of::<usize>());

impl ModuleCalls<'_> {
    pub fn mutex_create(&self, mutex: &mut MutexHandle, inherit: bool) -> Status {
        self.call_status(Opcode::MutexCreate, module_addr(mutex), inherit as usize, 0)
    }

    pub fn mutex_delete(&self, mutex: MutexHandle) -> Status {
        if mutex.is_null() {
            return Status::MutexError;
        }
        self.call_status(Opcode::MutexDelete, mutex.raw(), 0, 0)
    }

    /// Acquire the mutex. `wait` is [`NO_WAIT`](crate::call::NO_WAIT),
    /// a tick count or [`WAIT_FOREVER`](crate::call::WAIT_FOREVER).
    pub fn mutex_get(&self, mutex: MutexHandle, wait: usize) -> Status {
        if mutex.is_null() {
            return Status::MutexError;
        }
        self.call_status(Opcode::MutexGet, mutex.raw(), wait, 0)
    }

    pub fn mutex_put(&self, mutex: MutexHandle) -> Status {
        if mutex.is_null() {
            return Status::MutexError;
        }
        self.call_status(Opcode::MutexPut, mutex.raw(), 0, 0)
    }

    pub fn mutex_info_get(&self, mutex: MutexHandle, info: &mut MutexInfo) -> Status {
        if mutex.is_null() {
            return Status::MutexError;
        }
        self.call_status(Opcode::MutexInfoGet, mutex.raw(), module_addr(info), 0)
    }
}
