//! Kernel Object Table
//!
//! The trusted-side arena that holds every object created through the
//! gateway. Modules never see addresses into it, only [`Handle`]s.
//!
//! # Design
//! - Fixed-size array of slots, owned by the kernel
//! - Each slot carries a generation that is bumped on removal, so a
//!   handle to a deleted object stays dead even after the slot is reused
//! - A slot whose generation is used up is retired rather than wrapped;
//!   no handle word is ever minted twice
//! - Every entry records the module that created it

use super::handle::{Handle, ObjectKind, MAX_HANDLE_INDEX};
use super::KernelObject;
use crate::kernel::module::ModuleId;

/// Number of slots in the object pool.
pub const OBJECT_POOL_SIZE: usize = 64;

const _: () = assert!(OBJECT_POOL_SIZE - 1 <= MAX_HANDLE_INDEX);

/// Error type for object table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// The handle is null or has bits set outside the handle layout.
    Malformed,
    /// The handle's index is past the end of the pool.
    OutOfRange,
    /// The slot is empty or has been reused since the handle was minted.
    Stale,
    /// The handle names a different kind of object than required.
    KindMismatch,
    /// The object belongs to another module.
    NotOwner,
    /// No free slot is left.
    PoolExhausted,
}

impl core::fmt::Display for TableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed handle"),
            Self::OutOfRange => write!(f, "handle index out of range"),
            Self::Stale => write!(f, "handle does not name a live object"),
            Self::KindMismatch => write!(f, "object kind mismatch"),
            Self::NotOwner => write!(f, "object owned by another module"),
            Self::PoolExhausted => write!(f, "object pool exhausted"),
        }
    }
}

/// A live object and its owner.
#[derive(Debug)]
pub struct Entry {
    /// Module that created the object.
    pub owner: ModuleId,
    /// The control block.
    pub object: KernelObject,
}

#[derive(Debug)]
struct Slot {
    generation: u16,
    retired: bool,
    entry: Option<Entry>,
}

impl Slot {
    const EMPTY: Self = Self {
        generation: 0,
        retired: false,
        entry: None,
    };

    #[inline]
    fn is_free(&self) -> bool {
        self.entry.is_none() && !self.retired
    }

    /// Drop the entry and advance the generation.
    fn vacate(&mut self, index: usize) -> Option<Entry> {
        let entry = self.entry.take()?;
        match self.generation.checked_add(1) {
            Some(next) => self.generation = next,
            None => {
                log::warn!("[KERNEL] object slot {} retired: generations exhausted", index);
                self.retired = true;
            }
        }
        Some(entry)
    }
}

/// The kernel's object pool.
#[derive(Debug)]
pub struct ObjectTable {
    slots: [Slot; OBJECT_POOL_SIZE],
    live: usize,
}

impl ObjectTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            slots: [Slot::EMPTY; OBJECT_POOL_SIZE],
            live: 0,
        }
    }

    /// Number of live objects.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Store a new object and mint its handle.
    pub fn insert(&mut self, owner: ModuleId, object: KernelObject) -> Result<Handle, TableError> {
        let index = self
            .slots
            .iter()
            .position(Slot::is_free)
            .ok_or(TableError::PoolExhausted)?;

        let slot = &mut self.slots[index];
        let handle = Handle::new(object.kind(), index, slot.generation);
        slot.entry = Some(Entry { owner, object });
        self.live += 1;
        Ok(handle)
    }

    /// Resolve a handle to its slot index after structural checks.
    fn resolve(&self, handle: Handle) -> Result<usize, TableError> {
        if handle.is_null() || !handle.is_well_formed() {
            return Err(TableError::Malformed);
        }
        let kind = handle.kind().ok_or(TableError::Malformed)?;

        let index = handle.index();
        let slot = self.slots.get(index).ok_or(TableError::OutOfRange)?;

        let entry = slot.entry.as_ref().ok_or(TableError::Stale)?;
        if slot.generation != handle.generation() {
            return Err(TableError::Stale);
        }
        if entry.object.kind() != kind {
            // The generation matched but the slot holds another kind:
            // the handle was forged from a live one.
            return Err(TableError::Stale);
        }
        Ok(index)
    }

    /// Look up the entry a handle names.
    pub fn lookup(&self, handle: Handle) -> Result<&Entry, TableError> {
        let index = self.resolve(handle)?;
        self.slots[index].entry.as_ref().ok_or(TableError::Stale)
    }

    /// Look up an entry with kind and ownership checks.
    pub fn lookup_typed(
        &self,
        handle: Handle,
        expected: ObjectKind,
        caller: ModuleId,
    ) -> Result<&Entry, TableError> {
        let entry = self.lookup(handle)?;
        if entry.object.kind() != expected {
            return Err(TableError::KindMismatch);
        }
        if entry.owner != caller {
            return Err(TableError::NotOwner);
        }
        Ok(entry)
    }

    /// Mutable access to the object a handle names.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut KernelObject> {
        let index = self.resolve(handle).ok()?;
        self.slots[index].entry.as_mut().map(|entry| &mut entry.object)
    }

    /// Remove an object, killing every outstanding copy of its handle.
    pub fn remove(&mut self, handle: Handle) -> Result<Entry, TableError> {
        let index = self.resolve(handle)?;
        let entry = self.slots[index].vacate(index).ok_or(TableError::Stale)?;
        self.live -= 1;
        Ok(entry)
    }

    /// Remove every object owned by a module.
    ///
    /// Returns the number of objects removed.
    pub fn remove_owned_by(&mut self, owner: ModuleId) -> usize {
        let mut removed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if matches!(&slot.entry, Some(entry) if entry.owner == owner) {
                slot.vacate(index);
                removed += 1;
            }
        }
        self.live -= removed;
        removed
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::mutex::MutexCb;
    use crate::kernel::semaphore::SemaphoreCb;

    const A: ModuleId = ModuleId::new(1);
    const B: ModuleId = ModuleId::new(2);

    fn mutex() -> KernelObject {
        KernelObject::Mutex(MutexCb::new(false))
    }

    #[test]
    fn test_insert_lookup() {
        let mut table = ObjectTable::new();
        let h = table.insert(A, mutex()).unwrap();
        assert_eq!(h.kind(), Some(ObjectKind::Mutex));
        assert!(table.lookup_typed(h, ObjectKind::Mutex, A).is_ok());
        assert_eq!(table.live(), 1);
    }

    #[test]
    fn test_removed_handle_is_stale() {
        let mut table = ObjectTable::new();
        let h = table.insert(A, mutex()).unwrap();
        table.remove(h).unwrap();
        assert_eq!(table.lookup(h).unwrap_err(), TableError::Stale);
        assert_eq!(table.remove(h).unwrap_err(), TableError::Stale);

        // Slot reuse must not revive the old handle.
        let h2 = table.insert(A, mutex()).unwrap();
        assert_eq!(h2.index(), h.index());
        assert_ne!(h2, h);
        assert_eq!(table.lookup(h).unwrap_err(), TableError::Stale);
    }

    #[test]
    fn test_kind_and_owner_checked() {
        let mut table = ObjectTable::new();
        let h = table
            .insert(A, KernelObject::Semaphore(SemaphoreCb::new(1)))
            .unwrap();
        assert_eq!(
            table.lookup_typed(h, ObjectKind::Mutex, A).unwrap_err(),
            TableError::KindMismatch
        );
        assert_eq!(
            table.lookup_typed(h, ObjectKind::Semaphore, B).unwrap_err(),
            TableError::NotOwner
        );
    }

    #[test]
    fn test_forged_kind_tag_rejected() {
        let mut table = ObjectTable::new();
        let h = table.insert(A, mutex()).unwrap();
        let forged = Handle::new(ObjectKind::Semaphore, h.index(), h.generation());
        assert_eq!(table.lookup(forged).unwrap_err(), TableError::Stale);
    }

    #[test]
    fn test_malformed_handles() {
        let table = ObjectTable::new();
        assert_eq!(table.lookup(Handle::NULL).unwrap_err(), TableError::Malformed);
        assert_eq!(
            table.lookup(Handle::from_raw(usize::MAX)).unwrap_err(),
            TableError::Malformed
        );
        let far = Handle::new(ObjectKind::Mutex, OBJECT_POOL_SIZE, 0);
        assert_eq!(table.lookup(far).unwrap_err(), TableError::OutOfRange);
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut table = ObjectTable::new();
        for _ in 0..OBJECT_POOL_SIZE {
            table.insert(A, mutex()).unwrap();
        }
        assert_eq!(table.insert(A, mutex()).unwrap_err(), TableError::PoolExhausted);
    }

    #[test]
    fn test_slot_retired_instead_of_wrapping() {
        let mut table = ObjectTable::new();
        let first = table.insert(A, mutex()).unwrap();
        table.remove(first).unwrap();

        // Every remaining generation of slot 0.
        for _ in 0..u16::MAX {
            let h = table.insert(A, mutex()).unwrap();
            assert_eq!(h.index(), first.index());
            assert_ne!(h, first);
            table.remove(h).unwrap();
        }

        let fresh = table.insert(A, mutex()).unwrap();
        assert_ne!(fresh.index(), first.index());
        assert_eq!(table.lookup(first).unwrap_err(), TableError::Stale);
        assert_eq!(table.remove(first).unwrap_err(), TableError::Stale);
        assert!(table.lookup(fresh).is_ok());
    }

    #[test]
    fn test_retired_slot_shrinks_pool() {
        let mut table = ObjectTable::new();
        table.slots[0].generation = u16::MAX;
        let h = table.insert(A, mutex()).unwrap();
        assert_eq!(h.generation(), u16::MAX);
        table.remove(h).unwrap();

        for _ in 1..OBJECT_POOL_SIZE {
            table.insert(B, mutex()).unwrap();
        }
        assert_eq!(table.insert(B, mutex()).unwrap_err(), TableError::PoolExhausted);
        assert_eq!(table.remove_owned_by(B), OBJECT_POOL_SIZE - 1);
        assert_eq!(table.live(), 0);
    }

    #[test]
    fn test_remove_owned_by() {
        let mut table = ObjectTable::new();
        let a1 = table.insert(A, mutex()).unwrap();
        let b1 = table.insert(B, mutex()).unwrap();
        let a2 = table.insert(A, mutex()).unwrap();
        assert_eq!(table.remove_owned_by(A), 2);
        assert!(table.lookup(a1).is_err());
        assert!(table.lookup(a2).is_err());
        assert!(table.lookup(b1).is_ok());
        assert_eq!(table.live(), 1);
    }
}
