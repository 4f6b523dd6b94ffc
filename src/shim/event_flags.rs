//! Event flag group shims.
//!
//! `get` takes more arguments than fit in a call record, so the option,
//! wait and result travel in a parameter block in module memory.

use crate::call::{Opcode, Status};

pub use crate::kernel::event_flags::{GetOption, SetOption};

use super::{module_addr, module_handle, ModuleCalls};

module_handle!(
    /// An event flag group created through [`ModuleCalls::event_flags_create`].
    EventFlagsHandle
);

/// Filled in by [`ModuleCalls::event_flags_info_get`].
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventFlagsInfo {
    pub current: usize,
    pub suspended: usize,
}

const _: () = assert!(core::mem::size_of::<EventFlagsInfo>() == 2 * core::mem::size_of::<usize>());

/// Parameter block for `EventFlagsGet`.
#[repr(C)]
struct GetParams {
    option: usize,
    wait: usize,
    actual: usize,
}

impl ModuleCalls<'_> {
    pub fn event_flags_create(&self, group: &mut EventFlagsHandle) -> Status {
        self.call_status(Opcode::EventFlagsCreate, module_addr(group), 0, 0)
    }

    pub fn event_flags_delete(&self, group: EventFlagsHandle) -> Status {
        if group.is_null() {
            return Status::GroupError;
        }
        self.call_status(Opcode::EventFlagsDelete, group.raw(), 0, 0)
    }

    pub fn event_flags_set(&self, group: EventFlagsHandle, flags: usize, option: SetOption) -> Status {
        if group.is_null() {
            return Status::GroupError;
        }
        self.call_status(Opcode::EventFlagsSet, group.raw(), flags, option.to_word())
    }

    /// Wait for `requested` flags. On success `actual` holds the group's
    /// flags as they were before any clearing.
    pub fn event_flags_get(
        &self,
        group: EventFlagsHandle,
        requested: usize,
        option: GetOption,
        actual: &mut usize,
        wait: usize,
    ) -> Status {
        if group.is_null() {
            return Status::GroupError;
        }
        let mut params = GetParams {
            option: option.to_word(),
            wait,
            actual: 0,
        };
        let status = self.call_status(
            Opcode::EventFlagsGet,
            group.raw(),
            requested,
            module_addr(&mut params),
        );
        if status.is_success() {
            *actual = params.actual;
        }
        status
    }

    pub fn event_flags_info_get(&self, group: EventFlagsHandle, info: &mut EventFlagsInfo) -> Status {
        if group.is_null() {
            return Status::GroupError;
        }
        self.call_status(Opcode::EventFlagsInfoGet, group.raw(), module_addr(info), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{NO_WAIT, WAIT_FOREVER};
    use crate::kernel::context::ExecContext;
    use crate::kernel::module::Services;
    use crate::testing::Harness;

    #[test]
    fn test_set_and_get() {
        let h = Harness::new(Services::EVENT_FLAGS);
        let gate = h.gate(1);
        let calls = ModuleCalls::new(&gate);

        let mut group = EventFlagsHandle::NULL;
        assert_eq!(calls.event_flags_create(&mut group), Status::Success);
        assert_eq!(calls.event_flags_set(group, 0b0110, SetOption::Or), Status::Success);

        let mut actual = 0;
        assert_eq!(
            calls.event_flags_get(group, 0b0011, GetOption::And, &mut actual, NO_WAIT),
            Status::NoEvents
        );
        assert_eq!(actual, 0);
        assert_eq!(
            calls.event_flags_get(group, 0b0010, GetOption::OrClear, &mut actual, WAIT_FOREVER),
            Status::Success
        );
        assert_eq!(actual, 0b0110);

        let mut info = EventFlagsInfo::default();
        assert_eq!(calls.event_flags_info_get(group, &mut info), Status::Success);
        assert_eq!(info, EventFlagsInfo { current: 0b0100, suspended: 0 });
        assert_eq!(calls.event_flags_delete(group), Status::Success);
    }

    #[test]
    fn test_timer_callback_cannot_wait() {
        let h = Harness::new(Services::EVENT_FLAGS);
        let gate = h.gate(1);
        let calls = ModuleCalls::new(&gate);
        let mut group = EventFlagsHandle::NULL;
        assert_eq!(calls.event_flags_create(&mut group), Status::Success);

        let timer = gate.with_exec(ExecContext::TimerCallback);
        let timer_calls = ModuleCalls::new(&timer);
        let mut actual = 0;
        assert_eq!(timer_calls.event_flags_set(group, 1, SetOption::Or), Status::Success);
        assert_eq!(
            timer_calls.event_flags_get(group, 1, GetOption::Or, &mut actual, 5),
            Status::WaitError
        );
        assert_eq!(
            timer_calls.event_flags_get(group, 1, GetOption::Or, &mut actual, NO_WAIT),
            Status::Success
        );
        assert_eq!(actual, 1);
    }
}
