//! Call Records and the Trap Frame
//!
//! The calling convention across the module boundary is four words:
//!
//! ```text
//! ┌─────────┬─────────┬─────────┬─────────┐
//! │   r0    │   r1    │   r2    │   r3    │
//! ├─────────┼─────────┼─────────┼─────────┤
//! │ opcode  │  arg1   │  arg2   │  arg3   │  on entry
//! │ result  │    -    │    -    │    -    │  on return
//! └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! A [`CallRecord`] is what a shim builds; a [`TrapFrame`] is the register
//! copy the trusted side works from. Turning one into the other consumes
//! the record.

use super::opcode::Opcode;

/// Number of argument words in a call.
pub const CALL_ARGS: usize = 3;

/// One kernel call, as packed by a shim.
///
/// Not `Clone`: a record is built once and crosses the boundary once.
#[derive(Debug, PartialEq, Eq)]
pub struct CallRecord {
    opcode: usize,
    args: [usize; CALL_ARGS],
}

impl CallRecord {
    /// Pack a call. Unused argument slots must be zero.
    #[inline]
    pub const fn new(opcode: Opcode, arg1: usize, arg2: usize, arg3: usize) -> Self {
        Self::from_words(opcode.number(), arg1, arg2, arg3)
    }

    /// Pack arbitrary words, including opcodes the ABI does not define.
    #[inline]
    pub const fn from_words(opcode: usize, arg1: usize, arg2: usize, arg3: usize) -> Self {
        Self {
            opcode,
            args: [arg1, arg2, arg3],
        }
    }

    #[inline]
    pub const fn opcode(&self) -> usize {
        self.opcode
    }

    #[inline]
    pub const fn args(&self) -> [usize; CALL_ARGS] {
        self.args
    }

    /// Load the record into trap registers.
    #[inline]
    pub fn into_frame(self) -> TrapFrame {
        TrapFrame {
            gpr: [self.opcode, self.args[0], self.args[1], self.args[2]],
        }
    }
}

/// Registers saved by the trap into the trusted domain.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    /// r0-r3
    pub gpr: [usize; 4],
}

impl TrapFrame {
    #[inline]
    pub const fn opcode(&self) -> usize {
        self.gpr[0]
    }

    #[inline]
    pub const fn args(&self) -> [usize; CALL_ARGS] {
        [self.gpr[1], self.gpr[2], self.gpr[3]]
    }

    /// Place the result in r0 and scrub the argument registers.
    #[inline]
    pub fn set_return(&mut self, word: usize) {
        self.gpr = [word, 0, 0, 0];
    }

    #[inline]
    pub const fn return_word(&self) -> usize {
        self.gpr[0]
    }
}
