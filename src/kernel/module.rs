//! Loaded Module Registry
//!
//! Tracks the modules the kernel has admitted: where their data lives and
//! which service classes they may call. Loading itself (relocation, region
//! setup) happens elsewhere; this is what the dispatcher consults.

use bitflags::bitflags;

use crate::call::opcode::ABI_VERSION;

/// Maximum number of loaded modules.
pub const MAX_MODULES: usize = 8;

/// Identifier of a loaded module.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(transparent)]
pub struct ModuleId(u16);

impl ModuleId {
    #[inline]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }
}

bitflags! {
    /// Kernel service classes a module may be granted.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Services: u32 {
        const MUTEX = 1 << 0;
        const SEMAPHORE = 1 << 1;
        const EVENT_FLAGS = 1 << 2;
        const TIME = 1 << 3;
    }
}

/// A module's data region in its own address space.
///
/// Pointers a module passes to the kernel must fall inside this range.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ModuleRegion {
    start: usize,
    end: usize,
}

impl ModuleRegion {
    /// Create a region covering `[start, end)`.
    ///
    /// Returns None if the range is empty or inverted.
    pub const fn new(start: usize, end: usize) -> Option<Self> {
        if start == 0 || end <= start {
            None
        } else {
            Some(Self { start, end })
        }
    }

    #[inline]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Check whether `[addr, addr + len)` lies inside the region.
    #[inline]
    pub const fn contains(&self, addr: usize, len: usize) -> bool {
        match addr.checked_add(len) {
            Some(end) => addr >= self.start && end <= self.end,
            None => false,
        }
    }
}

/// What the loader hands the kernel when admitting a module.
#[derive(Clone, Copy, Debug)]
pub struct ModuleDescriptor {
    pub region: ModuleRegion,
    pub services: Services,
    /// Call ABI version the module binary was built against.
    pub abi_version: u32,
}

impl ModuleDescriptor {
    /// Descriptor for a module built against this kernel's ABI.
    pub const fn new(region: ModuleRegion, services: Services) -> Self {
        Self {
            region,
            services,
            abi_version: ABI_VERSION,
        }
    }
}

/// Error type for module registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleError {
    /// Every module slot is in use.
    TooManyModules,
    /// The module was built against another call ABI.
    AbiMismatch { expected: u32, found: u32 },
    /// No module with that id is loaded.
    NotLoaded,
}

impl core::fmt::Display for ModuleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooManyModules => write!(f, "module table full"),
            Self::AbiMismatch { expected, found } => {
                write!(f, "module ABI v{} does not match kernel ABI v{}", found, expected)
            }
            Self::NotLoaded => write!(f, "module not loaded"),
        }
    }
}

/// A loaded module.
#[derive(Clone, Copy, Debug)]
pub struct LoadedModule {
    pub id: ModuleId,
    pub region: ModuleRegion,
    pub services: Services,
}

/// Fixed table of loaded modules.
#[derive(Debug)]
pub struct ModuleRegistry {
    slots: [Option<LoadedModule>; MAX_MODULES],
    next_id: u16,
}

impl ModuleRegistry {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_MODULES],
            next_id: 1,
        }
    }

    /// Admit a module and assign it an id.
    pub fn load(&mut self, desc: ModuleDescriptor) -> Result<ModuleId, ModuleError> {
        if desc.abi_version != ABI_VERSION {
            return Err(ModuleError::AbiMismatch {
                expected: ABI_VERSION,
                found: desc.abi_version,
            });
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ModuleError::TooManyModules)?;

        // Ids are not reused while the counter lasts. Id 0 is never assigned.
        let id = ModuleId::new(self.next_id);
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        self.slots[index] = Some(LoadedModule {
            id,
            region: desc.region,
            services: desc.services,
        });
        Ok(id)
    }

    /// Remove a module from the table.
    pub fn unload(&mut self, id: ModuleId) -> Result<LoadedModule, ModuleError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(m) if m.id == id))
            .ok_or(ModuleError::NotLoaded)?;
        slot.take().ok_or(ModuleError::NotLoaded)
    }

    /// Look up a loaded module.
    pub fn get(&self, id: ModuleId) -> Result<&LoadedModule, ModuleError> {
        self.slots
            .iter()
            .flatten()
            .find(|m| m.id == id)
            .ok_or(ModuleError::NotLoaded)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
