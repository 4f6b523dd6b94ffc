//! Test support: a kernel with one module whose data region covers the
//! current thread's stack, so stack locals can be passed as module memory.

use crate::call::gate::ModuleGate;
use crate::kernel::context::ThreadId;
use crate::kernel::module::{ModuleDescriptor, ModuleId, ModuleRegion, Services};
use crate::kernel::Kernel;

const STACK_BELOW: usize = 256 * 1024;
const STACK_ABOVE: usize = 64 * 1024;

/// A region around the calling thread's stack.
///
/// Callee frames grow downwards from here; the caller's frames sit just
/// above.
#[inline(never)]
pub(crate) fn stack_region() -> ModuleRegion {
    let anchor = 0usize;
    let addr = core::hint::black_box(&anchor) as *const usize as usize;
    ModuleRegion::new(addr - STACK_BELOW, addr + STACK_ABOVE).unwrap()
}

pub(crate) struct Harness {
    pub kernel: Kernel,
    pub module: ModuleId,
}

impl Harness {
    pub fn new(services: Services) -> Self {
        let kernel = Kernel::new();
        let module = kernel
            .load_module(ModuleDescriptor::new(stack_region(), services))
            .unwrap();
        Self { kernel, module }
    }

    pub fn gate(&self, thread: u32) -> ModuleGate<'_> {
        self.kernel.gate(self.module, ThreadId::new(thread)).unwrap()
    }
}
