//! Translation of emulated physical addresses to host-readable bytes.
//!
//! Framebuffers live either in VRAM or in FCRAM. The compositor only ever
//! reads from them; populating the memory is the emulation core's job (or the
//! viewer's, when it loads dumps).

use oxidiz3ds_hw::memory_map;
use thiserror::Error;
use tracing::debug;

// Memory constants from hardware definitions
pub const VRAM_BASE: u32 = memory_map::vram::BASE;
pub const VRAM_SIZE: usize = memory_map::vram::SIZE;
pub const FCRAM_BASE: u32 = memory_map::fcram::BASE;
pub const FCRAM_SIZE: usize = memory_map::fcram::SIZE;

/// Address translation service
pub trait AddressSpace {
    /// Host bytes from `physical_address` up to the end of the region that
    /// contains it, or `None` if the address is not backed by memory.
    fn host_slice(&self, physical_address: u32) -> Option<&[u8]>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("{len:#X} bytes at {address:#X} are outside mapped memory")]
    Unmapped { address: u32, len: usize },
}

/// Host backing for VRAM and FCRAM
pub struct PhysicalMemory {
    vram: Vec<u8>,
    fcram: Vec<u8>,
}

impl Default for PhysicalMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalMemory {
    /// Full-size VRAM and FCRAM, zeroed
    pub fn new() -> Self {
        Self::with_fcram_size(FCRAM_SIZE)
    }

    /// Full-size VRAM and a truncated FCRAM. Addresses past `fcram_size` are
    /// unmapped.
    pub fn with_fcram_size(fcram_size: usize) -> Self {
        let fcram_size = fcram_size.min(FCRAM_SIZE);
        debug!(
            "Allocating VRAM ({}MB) and FCRAM ({}KB)",
            VRAM_SIZE / (1024 * 1024),
            fcram_size / 1024
        );
        Self {
            vram: vec![0u8; VRAM_SIZE],
            fcram: vec![0u8; fcram_size],
        }
    }

    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    pub fn fcram(&self) -> &[u8] {
        &self.fcram
    }

    /// Copy `data` into emulated memory at `physical_address`
    pub fn write(&mut self, physical_address: u32, data: &[u8]) -> Result<(), MemoryError> {
        let unmapped = MemoryError::Unmapped {
            address: physical_address,
            len: data.len(),
        };
        let region = self.host_slice_mut(physical_address).ok_or(unmapped.clone())?;
        region
            .get_mut(..data.len())
            .ok_or(unmapped)?
            .copy_from_slice(data);
        Ok(())
    }

    fn host_slice_mut(&mut self, physical_address: u32) -> Option<&mut [u8]> {
        let (region, offset) = match physical_address {
            a if a >= VRAM_BASE && ((a - VRAM_BASE) as usize) < self.vram.len() => {
                (&mut self.vram, (a - VRAM_BASE) as usize)
            }
            a if a >= FCRAM_BASE && ((a - FCRAM_BASE) as usize) < self.fcram.len() => {
                (&mut self.fcram, (a - FCRAM_BASE) as usize)
            }
            _ => return None,
        };
        Some(&mut region[offset..])
    }
}

impl AddressSpace for PhysicalMemory {
    fn host_slice(&self, physical_address: u32) -> Option<&[u8]> {
        if let Some(offset) = physical_address.checked_sub(VRAM_BASE)
            && let Some(bytes) = self.vram.get(offset as usize..)
            && !bytes.is_empty()
        {
            return Some(bytes);
        }

        if let Some(offset) = physical_address.checked_sub(FCRAM_BASE)
            && let Some(bytes) = self.fcram.get(offset as usize..)
            && !bytes.is_empty()
        {
            return Some(bytes);
        }

        None
    }
}
