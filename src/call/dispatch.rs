//! Kernel Call Dispatcher
//!
//! Runs on the trusted side of the gate, once per call:
//!
//! 1. Decode the opcode. Unknown opcodes are rejected with `InvalidCall`.
//! 2. Check the calling module is loaded and holds the service class.
//! 3. Validate every argument into a typed [`Request`].
//! 4. Check the caller's execution context against the opcode.
//! 5. Route the request to its primitive and encode the result.
//!
//! Steps 1-4 have no side effects. The kernel lock is held from step 2 to
//! step 5, so what was validated is what gets used.
//!
//! # Security
//! - Nothing from the trap frame is used before it is validated here
//! - Routing is an exhaustive match over [`Request`]; there is no table
//!   a module can index

use crate::kernel::context::CallerContext;
use crate::kernel::event_flags::{GetOption, SetOption};
use crate::kernel::module::ModuleRegion;
use crate::kernel::{Kernel, KernelState};
use crate::object::{Handle, ObjectKind};

use super::opcode::Opcode;
use super::record::{TrapFrame, CALL_ARGS};
use super::status::Status;
use super::validate::{
    validate_handle, validate_module_words, validate_wait, ModuleWords, Wait,
};

/// A fully validated call.
#[derive(Debug)]
enum Request {
    MutexCreate { out: ModuleWords<1>, inherit: bool },
    MutexDelete(Handle),
    MutexGet { mutex: Handle, wait: Wait },
    MutexPut(Handle),
    MutexInfoGet { mutex: Handle, out: ModuleWords<3> },

    SemaphoreCreate { out: ModuleWords<1>, initial: usize },
    SemaphoreDelete(Handle),
    SemaphoreGet { semaphore: Handle, wait: Wait },
    SemaphorePut(Handle),
    SemaphoreCeilingPut { semaphore: Handle, ceiling: usize },
    SemaphoreInfoGet { semaphore: Handle, out: ModuleWords<2> },

    EventFlagsCreate { out: ModuleWords<1> },
    EventFlagsDelete(Handle),
    EventFlagsSet { group: Handle, flags: usize, option: SetOption },
    EventFlagsGet {
        group: Handle,
        requested: usize,
        option: GetOption,
        wait: Wait,
        params: ModuleWords<3>,
    },
    EventFlagsInfoGet { group: Handle, out: ModuleWords<2> },

    TimeGet { out: ModuleWords<1> },
    TimeSet(usize),
}

/// Validate a module pointer to `N` words.
fn module_words<const N: usize>(
    region: &ModuleRegion,
    caller: &CallerContext,
    addr: usize,
) -> Result<ModuleWords<N>, Status> {
    validate_module_words::<N>(region, addr).map_err(|err| {
        log::debug!(
            "[VALIDATE] module {} pointer {:#x} rejected: {}",
            caller.module.get(),
            addr,
            err
        );
        Status::from(err)
    })
}

fn decode_inherit(word: usize) -> Result<bool, Status> {
    match word {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Status::InheritError),
    }
}

impl Request {
    fn decode(
        opcode: Opcode,
        args: [usize; CALL_ARGS],
        state: &KernelState,
        caller: &CallerContext,
        region: &ModuleRegion,
    ) -> Result<Self, Status> {
        let [arg1, arg2, arg3] = args;
        let handle = |kind| validate_handle(&state.objects, caller, arg1, kind);

        let request = match opcode {
            Opcode::MutexCreate => Self::MutexCreate {
                out: module_words(region, caller, arg1)?,
                inherit: decode_inherit(arg2)?,
            },
            Opcode::MutexDelete => Self::MutexDelete(handle(ObjectKind::Mutex)?),
            Opcode::MutexGet => Self::MutexGet {
                mutex: handle(ObjectKind::Mutex)?,
                wait: validate_wait(caller.exec, arg2)?,
            },
            Opcode::MutexPut => Self::MutexPut(handle(ObjectKind::Mutex)?),
            Opcode::MutexInfoGet => Self::MutexInfoGet {
                mutex: handle(ObjectKind::Mutex)?,
                out: module_words(region, caller, arg2)?,
            },

            Opcode::SemaphoreCreate => Self::SemaphoreCreate {
                out: module_words(region, caller, arg1)?,
                initial: arg2,
            },
            Opcode::SemaphoreDelete => Self::SemaphoreDelete(handle(ObjectKind::Semaphore)?),
            Opcode::SemaphoreGet => Self::SemaphoreGet {
                semaphore: handle(ObjectKind::Semaphore)?,
                wait: validate_wait(caller.exec, arg2)?,
            },
            Opcode::SemaphorePut => Self::SemaphorePut(handle(ObjectKind::Semaphore)?),
            Opcode::SemaphoreCeilingPut => {
                let semaphore = handle(ObjectKind::Semaphore)?;
                if arg2 == 0 {
                    return Err(Status::SizeError);
                }
                Self::SemaphoreCeilingPut {
                    semaphore,
                    ceiling: arg2,
                }
            }
            Opcode::SemaphoreInfoGet => Self::SemaphoreInfoGet {
                semaphore: handle(ObjectKind::Semaphore)?,
                out: module_words(region, caller, arg2)?,
            },

            Opcode::EventFlagsCreate => Self::EventFlagsCreate {
                out: module_words(region, caller, arg1)?,
            },
            Opcode::EventFlagsDelete => Self::EventFlagsDelete(handle(ObjectKind::EventFlags)?),
            Opcode::EventFlagsSet => Self::EventFlagsSet {
                group: handle(ObjectKind::EventFlags)?,
                flags: arg2,
                option: SetOption::from_word(arg3).ok_or(Status::OptionError)?,
            },
            Opcode::EventFlagsGet => {
                let group = handle(ObjectKind::EventFlags)?;
                let params = module_words::<3>(region, caller, arg3)?;
                // Copy in once: the module may rewrite the block under us.
                let [option, wait, _] = params.read();
                Self::EventFlagsGet {
                    group,
                    requested: arg2,
                    option: GetOption::from_word(option).ok_or(Status::OptionError)?,
                    wait: validate_wait(caller.exec, wait)?,
                    params,
                }
            }
            Opcode::EventFlagsInfoGet => Self::EventFlagsInfoGet {
                group: handle(ObjectKind::EventFlags)?,
                out: module_words(region, caller, arg2)?,
            },

            Opcode::TimeGet => Self::TimeGet {
                out: module_words(region, caller, arg1)?,
            },
            Opcode::TimeSet => Self::TimeSet(arg1),
        };
        Ok(request)
    }
}

/// Write a freshly created handle back to the module.
fn publish(out: &mut ModuleWords<1>, created: Result<Handle, Status>) -> Status {
    match created {
        Ok(handle) => {
            out.write([handle.raw()]);
            Status::Success
        }
        Err(status) => status,
    }
}

/// Run a validated request. Returns the result word.
fn execute(state: &mut KernelState, caller: &CallerContext, request: Request) -> usize {
    state.stats.primitives += 1;

    let status = match request {
        Request::MutexCreate { mut out, inherit } => {
            let created = state.mutex_create(caller.module, inherit);
            publish(&mut out, created)
        }
        Request::MutexDelete(mutex) => state.mutex_delete(mutex),
        Request::MutexGet { mutex, wait } => state.mutex_get(mutex, caller.thread, wait),
        Request::MutexPut(mutex) => state.mutex_put(mutex, caller.thread),
        Request::MutexInfoGet { mutex, mut out } => {
            out.write(state.mutex_info(mutex));
            Status::Success
        }

        Request::SemaphoreCreate { mut out, initial } => {
            let created = state.semaphore_create(caller.module, initial);
            publish(&mut out, created)
        }
        Request::SemaphoreDelete(semaphore) => state.semaphore_delete(semaphore),
        Request::SemaphoreGet { semaphore, wait } => state.semaphore_get(semaphore, wait),
        Request::SemaphorePut(semaphore) => state.semaphore_put(semaphore),
        Request::SemaphoreCeilingPut { semaphore, ceiling } => {
            state.semaphore_ceiling_put(semaphore, ceiling)
        }
        Request::SemaphoreInfoGet { semaphore, mut out } => {
            out.write(state.semaphore_info(semaphore));
            Status::Success
        }

        Request::EventFlagsCreate { mut out } => {
            let created = state.event_flags_create(caller.module);
            publish(&mut out, created)
        }
        Request::EventFlagsDelete(group) => state.event_flags_delete(group),
        Request::EventFlagsSet { group, flags, option } => {
            state.event_flags_set(group, flags, option)
        }
        Request::EventFlagsGet {
            group,
            requested,
            option,
            wait,
            mut params,
        } => match state.event_flags_get(group, requested, option, wait) {
            Ok(actual) => {
                params.write([option.to_word(), wait.to_word(), actual]);
                Status::Success
            }
            Err(status) => status,
        },
        Request::EventFlagsInfoGet { group, mut out } => {
            out.write(state.event_flags_info(group));
            Status::Success
        }

        Request::TimeGet { mut out } => {
            out.write([state.time_get()]);
            Status::Success
        }
        Request::TimeSet(ticks) => {
            state.time_set(ticks);
            Status::Success
        }
    };
    status.to_word()
}

/// Validate and route one call. Errors are rejections: no primitive ran.
fn route(
    state: &mut KernelState,
    caller: &CallerContext,
    opcode: usize,
    args: [usize; CALL_ARGS],
) -> Result<usize, Status> {
    let opcode = Opcode::try_from(opcode).map_err(|err| {
        log::warn!("[DISPATCH] module {}: {}", caller.module.get(), err);
        Status::InvalidCall
    })?;

    let module = *state.modules.get(caller.module).map_err(|err| {
        log::warn!("[DISPATCH] module {} {:?}: {}", caller.module.get(), opcode, err);
        Status::CallerError
    })?;

    if !module.services.contains(opcode.service()) {
        log::warn!(
            "[DISPATCH] module {} not granted {:?} for {:?}",
            caller.module.get(),
            opcode.service(),
            opcode
        );
        return Err(Status::CallerError);
    }

    let request = Request::decode(opcode, args, state, caller, &module.region)?;

    if !opcode.permitted_contexts().contains(caller.exec.as_set()) {
        log::warn!(
            "[DISPATCH] module {} {:?} not permitted from {:?}",
            caller.module.get(),
            opcode,
            caller.exec
        );
        return Err(Status::CallerError);
    }

    log::trace!(
        "[DISPATCH] module {} thread {} {:?}",
        caller.module.get(),
        caller.thread.get(),
        request
    );
    Ok(execute(state, caller, request))
}

/// Handle a kernel call trapped from module code.
///
/// Reads the opcode and arguments from the frame and leaves the result
/// word in r0.
pub(crate) fn handle_kernel_call(kernel: &Kernel, caller: &CallerContext, frame: &mut TrapFrame) {
    let mut state = kernel.lock();
    state.stats.calls += 1;

    let word = match route(&mut state, caller, frame.opcode(), frame.args()) {
        Ok(word) => word,
        Err(status) => {
            state.stats.rejected += 1;
            status.to_word()
        }
    };
    drop(state);

    frame.set_return(word);
}
