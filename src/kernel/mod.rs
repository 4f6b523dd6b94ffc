//! Trusted Kernel
//!
//! The kernel side of the gateway: loaded modules, the object pool, the
//! tick counter, and the primitives the dispatcher routes to.
//!
//! # Design
//! - All mutable kernel state sits behind one spinlock
//! - The dispatcher validates and executes under a single acquisition, so
//!   nothing can be deleted between the check and the use
//! - Primitives never block: there is no scheduler here. A wait that
//!   cannot be satisfied at once expires at once; threads suspended by an
//!   external scheduler are accounted with [`Kernel::suspend_waiter`]
//!
//! # Security Properties
//! - Module code never holds a reference into this state
//! - The only path from a module into a primitive is [`Kernel::gate`]

pub mod context;
pub mod event_flags;
pub mod module;
pub mod mutex;
pub mod semaphore;

use spin::{Mutex, MutexGuard};

use crate::call::gate::ModuleGate;
use crate::object::{Handle, KernelObject, ObjectTable, TableError};

use context::{CallerContext, ExecContext, ThreadId};
use module::{ModuleDescriptor, ModuleError, ModuleId, ModuleRegistry};

/// Call accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelStats {
    /// Calls that reached the dispatcher.
    pub calls: usize,
    /// Calls rejected before any primitive ran.
    pub rejected: usize,
    /// Primitive invocations.
    pub primitives: usize,
}

/// Mutable kernel state.
#[derive(Debug)]
pub struct KernelState {
    pub(crate) objects: ObjectTable,
    pub(crate) modules: ModuleRegistry,
    pub(crate) ticks: usize,
    pub(crate) stats: KernelStats,
}

impl KernelState {
    const fn new() -> Self {
        Self {
            objects: ObjectTable::new(),
            modules: ModuleRegistry::new(),
            ticks: 0,
            stats: KernelStats {
                calls: 0,
                rejected: 0,
                primitives: 0,
            },
        }
    }

    /// Read the tick counter.
    pub(crate) fn time_get(&self) -> usize {
        self.ticks
    }

    /// Set the tick counter.
    pub(crate) fn time_set(&mut self, ticks: usize) {
        log::debug!("[KERNEL] time set {} -> {}", self.ticks, ticks);
        self.ticks = ticks;
    }
}

/// Halt on a broken kernel invariant.
///
/// Only for states validation makes impossible, such as a handle that
/// resolved a moment ago under the same lock no longer resolving.
#[cold]
pub(crate) fn corrupted(what: &str, handle: Handle) -> ! {
    log::error!("[KERNEL] internal consistency violation: {} ({:?})", what, handle);
    panic!("kernel state corrupted: {}", what);
}

/// The trusted kernel.
#[derive(Debug)]
pub struct Kernel {
    state: Mutex<KernelState>,
}

impl Kernel {
    /// Create a kernel with no modules and no objects.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(KernelState::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock()
    }

    /// Admit a module.
    pub fn load_module(&self, desc: ModuleDescriptor) -> Result<ModuleId, ModuleError> {
        let id = self.lock().modules.load(desc)?;
        log::info!(
            "[MODULE] loaded module {} region {:#x}..{:#x} services {:?}",
            id.get(),
            desc.region.start(),
            desc.region.end(),
            desc.services
        );
        Ok(id)
    }

    /// Remove a module and delete every object it owns.
    ///
    /// Returns the number of objects reclaimed. Gates bound to the module
    /// fail every call afterwards.
    pub fn unload_module(&self, id: ModuleId) -> Result<usize, ModuleError> {
        let mut state = self.lock();
        state.modules.unload(id)?;
        let reclaimed = state.objects.remove_owned_by(id);
        log::info!("[MODULE] unloaded module {}, reclaimed {} objects", id.get(), reclaimed);
        Ok(reclaimed)
    }

    /// Bind a gate for a thread of a loaded module.
    ///
    /// The gate starts in thread context; see [`ModuleGate::with_exec`].
    pub fn gate(&self, module: ModuleId, thread: ThreadId) -> Result<ModuleGate<'_>, ModuleError> {
        self.lock().modules.get(module)?;
        Ok(ModuleGate::new(
            self,
            CallerContext {
                module,
                thread,
                exec: ExecContext::Thread,
            },
        ))
    }

    /// Advance the tick counter by one. Called from the timer interrupt.
    pub fn tick(&self) {
        let mut state = self.lock();
        state.ticks = state.ticks.wrapping_add(1);
    }

    /// Current tick count.
    pub fn ticks(&self) -> usize {
        self.lock().ticks
    }

    /// Snapshot of call accounting.
    pub fn stats(&self) -> KernelStats {
        self.lock().stats
    }

    /// Number of live objects in the pool.
    pub fn live_objects(&self) -> usize {
        self.lock().objects.live()
    }

    /// Inspect an object without going through a module.
    pub fn with_object<R>(&self, handle: Handle, f: impl FnOnce(&KernelObject) -> R) -> Option<R> {
        let state = self.lock();
        state.objects.lookup(handle).ok().map(|entry| f(&entry.object))
    }

    /// Record a thread suspended on an object by the scheduler.
    pub fn suspend_waiter(&self, handle: Handle) -> Result<usize, TableError> {
        let mut state = self.lock();
        let object = state.objects.get_mut(handle).ok_or(TableError::Stale)?;
        Ok(object.add_waiter())
    }

    /// Record a suspended thread leaving an object's wait list.
    pub fn resume_waiter(&self, handle: Handle) -> Result<usize, TableError> {
        let mut state = self.lock();
        let object = state.objects.get_mut(handle).ok_or(TableError::Stale)?;
        Ok(object.remove_waiter())
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::module::{ModuleRegion, Services};
    use crate::kernel::mutex::MutexCb;

    fn desc() -> ModuleDescriptor {
        ModuleDescriptor::new(ModuleRegion::new(0x1000, 0x2000).unwrap(), Services::all())
    }

    #[test]
    fn test_unload_reclaims_objects() {
        let kernel = Kernel::new();
        let id = kernel.load_module(desc()).unwrap();
        let h = kernel
            .lock()
            .objects
            .insert(id, KernelObject::Mutex(MutexCb::new(false)))
            .unwrap();
        assert_eq!(kernel.live_objects(), 1);

        assert_eq!(kernel.unload_module(id), Ok(1));
        assert_eq!(kernel.live_objects(), 0);
        assert!(kernel.with_object(h, |_| ()).is_none());
        assert!(kernel.gate(id, ThreadId::new(1)).is_err());
    }

    #[test]
    fn test_waiter_accounting() {
        let kernel = Kernel::new();
        let id = kernel.load_module(desc()).unwrap();
        let h = kernel
            .lock()
            .objects
            .insert(id, KernelObject::Mutex(MutexCb::new(false)))
            .unwrap();

        assert_eq!(kernel.suspend_waiter(h), Ok(1));
        assert_eq!(kernel.suspend_waiter(h), Ok(2));
        assert_eq!(kernel.resume_waiter(h), Ok(1));
        assert_eq!(kernel.with_object(h, KernelObject::waiters), Some(1));
        assert_eq!(kernel.suspend_waiter(Handle::NULL), Err(TableError::Stale));
    }

    #[test]
    fn test_tick() {
        let kernel = Kernel::new();
        kernel.tick();
        kernel.tick();
        assert_eq!(kernel.ticks(), 2);
    }
}
