//! modgate - Module Kernel-Call Gateway
//!
//! Lets separately loaded, memory-isolated modules call kernel services
//! (mutexes, semaphores, event flags, the system clock) through a single
//! validated entry point.
//!
//! # Layers
//! - [`shim`]: module-side functions that pack a call record and cross
//! - [`call`]: the gate, opcode set, status codes and the dispatcher
//! - [`kernel`]: module registry, execution contexts and primitives
//! - [`object`]: the handle-indexed object table
//!
//! # Security Features
//! - Closed opcode set, routed by exhaustive match
//! - Handles are re-validated on every call and scoped to their module
//! - Module pointers are range-checked against the module's data region
//! - Rejected calls return a status and change nothing

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod call;
pub mod kernel;
pub mod object;
pub mod shim;

#[cfg(test)]
mod testing;

pub use call::{KernelGate, ModuleGate, Opcode, Status, NO_WAIT, WAIT_FOREVER};
pub use kernel::module::{ModuleDescriptor, ModuleId, ModuleRegion, Services};
pub use kernel::Kernel;
pub use shim::ModuleCalls;
