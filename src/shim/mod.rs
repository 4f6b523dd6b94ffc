//! Module-Side Call Shims
//!
//! What module code links against. Each shim looks like an ordinary
//! function but packs its arguments into a [`CallRecord`] and crosses the
//! gate.
//!
//! # Conventions
//! - The object handle, or the out pointer for creates, goes in arg1
//! - Unused argument slots are zero
//! - The only local check is for null handles; everything else is left to
//!   the kernel, which checks again regardless
//! - The kernel's status is returned unchanged

pub mod event_flags;
pub mod mutex;
pub mod semaphore;
pub mod time;

pub use event_flags::{EventFlagsHandle, EventFlagsInfo};
pub use mutex::{MutexHandle, MutexInfo};
pub use semaphore::{SemaphoreHandle, SemaphoreInfo};

use crate::call::{CallRecord, KernelGate, Opcode, Status};

/// Declare a module-side handle type: an opaque word the kernel minted.
macro_rules! module_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(0);

            /// Wrap a word received from the kernel.
            #[inline]
            pub const fn from_raw(raw: usize) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> usize {
                self.0
            }

            #[inline]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

pub(crate) use module_handle;

/// Kernel calls available to module code.
#[derive(Clone, Copy)]
pub struct ModuleCalls<'g> {
    gate: &'g dyn KernelGate,
}

impl<'g> ModuleCalls<'g> {
    pub fn new(gate: &'g dyn KernelGate) -> Self {
        Self { gate }
    }

    /// Cross the gate. Returns the raw result word.
    #[inline]
    fn call(&self, opcode: Opcode, arg1: usize, arg2: usize, arg3: usize) -> usize {
        self.gate.kernel_call(CallRecord::new(opcode, arg1, arg2, arg3))
    }

    /// Cross the gate for a call that returns a status.
    fn call_status(&self, opcode: Opcode, arg1: usize, arg2: usize, arg3: usize) -> Status {
        let word = self.call(opcode, arg1, arg2, arg3);
        Status::from_word(word).unwrap_or_else(|| {
            log::error!("[SHIM] {:?} returned unknown status {:#x}", opcode, word);
            Status::InvalidCall
        })
    }
}

/// Address of a module-memory location, as passed in a call word.
#[inline]
fn module_addr<T>(place: &mut T) -> usize {
    place as *mut T as usize
}
