//! Hardware definitions for the Nintendo 3DS video path.
//!
//! Pure constants: register offsets, bit fields, memory map and display specs.
//! Nothing in here carries state.

pub mod memory_map;
pub mod specs;

/// Memory-mapped register blocks
pub mod mmio {
    pub mod gpu;
    pub mod lcd;
}
