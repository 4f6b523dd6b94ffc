//! Kernel Call Argument Validation
//!
//! Everything a module passes is re-checked here, on the trusted side,
//! before the dispatcher builds a request from it.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Out-of-region writes (pointer must lie in the caller's data region)
//!   - Use-after-delete (handles carry a generation)
//!   - TOCTOU races (input blocks are copied into the kernel once)
//!   - Null pointer dereference (explicit checks)

use core::mem::{align_of, size_of};
use core::ptr;

use crate::kernel::context::{CallerContext, ExecContext};
use crate::kernel::module::ModuleRegion;
use crate::object::{Handle, ObjectKind, ObjectTable};

use super::status::{handle_status, Status};

/// Wait option meaning "return at once".
pub const NO_WAIT: usize = 0;
/// Wait option meaning "suspend until satisfied".
pub const WAIT_FOREVER: usize = usize::MAX;

/// Why a module pointer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateError {
    /// The pointer is null.
    Null,
    /// The pointer is not word-aligned.
    Misaligned,
    /// The block wraps the address space.
    Overflow,
    /// The block is not entirely inside the caller's data region.
    OutOfRegion,
}

impl core::fmt::Display for ValidateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Null => write!(f, "null pointer"),
            Self::Misaligned => write!(f, "misaligned pointer"),
            Self::Overflow => write!(f, "block wraps address space"),
            Self::OutOfRegion => write!(f, "block outside module region"),
        }
    }
}

/// A validated block of `N` words in module memory.
///
/// This type guarantees that:
/// - The block is within the caller's data region
/// - The block is word-aligned
/// - The length doesn't overflow
///
/// # Safety
/// Only constructed by [`validate_module_words`].
#[derive(Debug)]
pub struct ModuleWords<const N: usize> {
    ptr: *mut usize,
}

impl<const N: usize> ModuleWords<N> {
    /// Copy the block into kernel memory.
    ///
    /// Read once; later changes by the module are not observed.
    pub fn read(&self) -> [usize; N] {
        let mut words = [0usize; N];
        for (i, word) in words.iter_mut().enumerate() {
            // SAFETY:
            // - The block was checked to lie inside the module's data region
            // - The pointer is word-aligned and i < N
            // - Module memory is mapped while the module is loaded
            *word = unsafe { ptr::read_volatile(self.ptr.add(i)) };
        }
        words
    }

    /// Write the whole block.
    pub fn write(&mut self, words: [usize; N]) {
        for (i, word) in words.into_iter().enumerate() {
            // SAFETY: Same as ModuleWords::read.
            unsafe { ptr::write_volatile(self.ptr.add(i), word) }
        }
    }
}

/// Validate a block of `N` words in module memory.
///
/// # Security Checks
/// 1. Pointer is not null
/// 2. Pointer is word-aligned
/// 3. Pointer + length doesn't overflow
/// 4. The whole block is within the caller's data region
pub fn validate_module_words<const N: usize>(
    region: &ModuleRegion,
    addr: usize,
) -> Result<ModuleWords<N>, ValidateError> {
    if addr == 0 {
        return Err(ValidateError::Null);
    }

    if addr % align_of::<usize>() != 0 {
        return Err(ValidateError::Misaligned);
    }

    let len = N.checked_mul(size_of::<usize>()).ok_or(ValidateError::Overflow)?;
    addr.checked_add(len).ok_or(ValidateError::Overflow)?;

    if !region.contains(addr, len) {
        return Err(ValidateError::OutOfRegion);
    }

    Ok(ModuleWords {
        ptr: addr as *mut usize,
    })
}

/// Validate a handle word: it must name a live object of `kind` owned by
/// the calling module.
pub fn validate_handle(
    objects: &ObjectTable,
    caller: &CallerContext,
    word: usize,
    kind: ObjectKind,
) -> Result<Handle, Status> {
    let handle = Handle::from_raw(word);
    objects
        .lookup_typed(handle, kind, caller.module)
        .map(|_| handle)
        .map_err(|err| {
            log::debug!(
                "[VALIDATE] module {} {} handle {:#x} rejected: {}",
                caller.module.get(),
                kind,
                word,
                err
            );
            handle_status(kind, err)
        })
}

/// A decoded wait option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Return at once if the object is unavailable.
    NoWait,
    /// Suspend for at most this many ticks.
    Ticks(usize),
    /// Suspend until the object is available.
    Forever,
}

impl Wait {
    /// Whether this option asks the caller to be suspended.
    #[inline]
    pub const fn suspends(self) -> bool {
        !matches!(self, Self::NoWait)
    }

    /// The option word this was decoded from.
    pub const fn to_word(self) -> usize {
        match self {
            Self::NoWait => NO_WAIT,
            Self::Ticks(ticks) => ticks,
            Self::Forever => WAIT_FOREVER,
        }
    }
}

/// Validate a wait option against the caller's context.
///
/// Only threads may suspend. Anyone may poll.
pub fn validate_wait(exec: ExecContext, word: usize) -> Result<Wait, Status> {
    let wait = match word {
        NO_WAIT => Wait::NoWait,
        WAIT_FOREVER => Wait::Forever,
        ticks => Wait::Ticks(ticks),
    };
    if wait.suspends() && !exec.can_block() {
        return Err(Status::WaitError);
    }
    Ok(wait)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::context::ThreadId;
    use crate::kernel::module::ModuleId;
    use crate::kernel::mutex::MutexCb;
    use crate::object::KernelObject;

    fn region() -> ModuleRegion {
        ModuleRegion::new(0x4000_0000, 0x4008_0000).unwrap()
    }

    #[test]
    fn test_null_pointer() {
        assert_eq!(
            validate_module_words::<1>(&region(), 0).unwrap_err(),
            ValidateError::Null
        );
    }

    #[test]
    fn test_misaligned() {
        assert_eq!(
            validate_module_words::<1>(&region(), 0x4000_0001).unwrap_err(),
            ValidateError::Misaligned
        );
    }

    #[test]
    fn test_overflow() {
        let top = usize::MAX & !(align_of::<usize>() - 1);
        assert_eq!(
            validate_module_words::<4>(&region(), top).unwrap_err(),
            ValidateError::Overflow
        );
    }

    #[test]
    fn test_region_edges() {
        let r = region();
        let word = size_of::<usize>();
        assert!(validate_module_words::<1>(&r, r.end() - word).is_ok());
        assert_eq!(
            validate_module_words::<2>(&r, r.end() - word).unwrap_err(),
            ValidateError::OutOfRegion
        );
        assert_eq!(
            validate_module_words::<1>(&r, r.start() - word).unwrap_err(),
            ValidateError::OutOfRegion
        );
    }

    #[test]
    fn test_block_is_copied_in() {
        let mut backing = [7usize, 8, 9];
        let start = backing.as_mut_ptr() as usize;
        let r = ModuleRegion::new(start, start + 3 * size_of::<usize>()).unwrap();

        let mut block = validate_module_words::<3>(&r, start).unwrap();
        let copy = block.read();
        block.write([copy[0], copy[1], 42]);
        assert_eq!(copy, [7, 8, 9]);
        assert_eq!(block.read(), [7, 8, 42]);
    }

    #[test]
    fn test_wait_from_interrupt() {
        assert_eq!(validate_wait(ExecContext::Interrupt, NO_WAIT), Ok(Wait::NoWait));
        assert_eq!(
            validate_wait(ExecContext::Interrupt, 10).unwrap_err(),
            Status::WaitError
        );
        assert_eq!(validate_wait(ExecContext::Thread, WAIT_FOREVER), Ok(Wait::Forever));
        assert_eq!(validate_wait(ExecContext::Thread, 5), Ok(Wait::Ticks(5)));
    }

    #[test]
    fn test_handle_of_other_module_reads_as_invalid() {
        let owner = ModuleId::new(1);
        let mut objects = ObjectTable::new();
        let h = objects
            .insert(owner, KernelObject::Mutex(MutexCb::new(false)))
            .unwrap();

        let intruder = CallerContext {
            module: ModuleId::new(2),
            thread: ThreadId::new(1),
            exec: ExecContext::Thread,
        };
        assert_eq!(
            validate_handle(&objects, &intruder, h.raw(), ObjectKind::Mutex).unwrap_err(),
            Status::MutexError
        );

        let caller = CallerContext { module: owner, ..intruder };
        assert_eq!(
            validate_handle(&objects, &caller, h.raw(), ObjectKind::Mutex),
            Ok(h)
        );
        assert_eq!(
            validate_handle(&objects, &caller, h.raw(), ObjectKind::Semaphore).unwrap_err(),
            Status::SemaphoreError
        );
    }
}
