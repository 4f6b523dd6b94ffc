//! Module Kernel-Call Interface
//!
//! The gateway between isolated modules and the trusted kernel.
//!
//! # Security Model
//! - Closed opcode set: anything not in [`Opcode`] is rejected
//! - All arguments are validated on the trusted side, after the crossing
//! - Invalid inputs return a status, never panic
//! - Rejected calls have no side effects
//!
//! # Call Path
//! module code → shim → [`KernelGate`] → dispatcher → primitive

mod dispatch;
pub mod gate;
pub mod opcode;
pub mod record;
pub mod status;
pub mod validate;

pub use gate::{KernelGate, ModuleGate};
pub use opcode::{Opcode, ABI_VERSION};
pub use record::{CallRecord, TrapFrame};
pub use status::{Status, StatusClass};
pub use validate::{NO_WAIT, WAIT_FOREVER};
