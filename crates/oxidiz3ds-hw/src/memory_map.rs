//! # References
//! - <https://www.3dbrew.org/wiki/Memory_layout>

/// FCRAM (Fast Cycle RAM) - Main system memory shared between ARM9 and ARM11
///
/// Reference: <https://www.3dbrew.org/wiki/Memory_layout#FCRAM>
pub mod fcram {
    /// FCRAM physical base address
    pub const BASE: u32 = 0x20000000;
    /// FCRAM size (128 MB)
    pub const SIZE: usize = 128 * 1024 * 1024;
}

/// VRAM (Video RAM) - Shared between ARM9 and ARM11
///
/// Reference: <https://www.3dbrew.org/wiki/Memory_layout#VRAM>
pub mod vram {
    /// VRAM physical base address
    pub const BASE: u32 = 0x18000000;
    /// VRAM size (6 MB)
    pub const SIZE: usize = 6 * 1024 * 1024;
}
