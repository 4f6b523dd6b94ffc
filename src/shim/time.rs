//! System clock shims.

use crate::call::{Opcode, Status};

use super::{module_addr, ModuleCalls};

impl ModuleCalls<'_> {
    /// Read the tick count into `ticks`.
    pub fn time_get(&self, ticks: &mut usize) -> Status {
        self.call_status(Opcode::TimeGet, module_addr(ticks), 0, 0)
    }

    pub fn time_set(&self, ticks: usize) -> Status {
        self.call_status(Opcode::TimeSet, ticks, 0, 0)
    }
}
