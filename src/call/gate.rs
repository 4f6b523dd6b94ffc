//! Module Call Gate
//!
//! The crossing from module code into the kernel. On hardware this is the
//! trap instruction and its entry stub; here it is the one type that can
//! hand a call record to the dispatcher.
//!
//! # Security Considerations
//! - [`ModuleGate`] is the only path into the dispatcher
//! - Caller identity comes from the gate, never from the record
//! - The record is consumed into a trap frame before anything reads it

use crate::kernel::context::{CallerContext, ExecContext};
use crate::kernel::Kernel;

use super::dispatch;
use super::record::CallRecord;

/// What module code calls to reach the kernel.
///
/// Shims are written against this trait and never see the kernel.
pub trait KernelGate {
    /// Make one kernel call. Returns the result word from r0.
    fn kernel_call(&self, record: CallRecord) -> usize;
}

/// A gate bound to one thread of one loaded module.
///
/// Created by [`Kernel::gate`].
#[derive(Debug, Clone, Copy)]
pub struct ModuleGate<'k> {
    kernel: &'k Kernel,
    caller: CallerContext,
}

impl<'k> ModuleGate<'k> {
    pub(crate) const fn new(kernel: &'k Kernel, caller: CallerContext) -> Self {
        Self { kernel, caller }
    }

    /// Who calls through this gate.
    #[inline]
    pub fn caller(&self) -> CallerContext {
        self.caller
    }

    /// The same gate as entered from another execution context.
    ///
    /// The kernel's trap entry knows whether it came from a thread, an
    /// interrupt handler or a timer callback; this is how it says so.
    #[inline]
    pub fn with_exec(self, exec: ExecContext) -> Self {
        Self {
            caller: CallerContext { exec, ..self.caller },
            ..self
        }
    }
}

impl KernelGate for ModuleGate<'_> {
    fn kernel_call(&self, record: CallRecord) -> usize {
        let mut frame = record.into_frame();
        // Trusted side from here on: only the frame copy is read.
        dispatch::handle_kernel_call(self.kernel, &self.caller, &mut frame);
        frame.return_word()
    }
}
