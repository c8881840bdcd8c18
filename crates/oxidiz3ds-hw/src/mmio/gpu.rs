//! # References
//! - <https://www.3dbrew.org/wiki/GPU/External_Registers>

/// GPU MMIO region base address (ARM11 only)
pub const BASE: u32 = 0x10400000;

/// GPU MMIO region end address (exclusive)
pub const END: u32 = 0x10500000;

/// Framebuffer setup blocks (offsets relative to `BASE`)
///
/// Each screen has one block of `BLOCK_SIZE` bytes; the register offsets in
/// [`registers`] are relative to the start of a block.
///
/// Reference: <https://www.3dbrew.org/wiki/GPU/External_Registers#Framebuffers>
pub mod framebuffer {
    /// Top screen framebuffer setup block
    pub const TOP: u32 = 0x400;

    /// Bottom screen framebuffer setup block
    pub const BOTTOM: u32 = 0x500;

    /// Size of one framebuffer setup block
    pub const BLOCK_SIZE: u32 = 0x100;

    /// Register offsets within a framebuffer setup block
    pub mod registers {
        /// Framebuffer width (bits 0-15) and height (bits 16-31)
        pub const SIZE: u32 = 0x5C;

        /// Primary (left eye) framebuffer address
        pub const ADDRESS_PRIMARY: u32 = 0x68;

        /// Secondary (left eye) framebuffer address
        pub const ADDRESS_SECONDARY: u32 = 0x6C;

        /// Pixel format, see [`super::super::pixel_format`]
        pub const FORMAT: u32 = 0x70;

        /// Active framebuffer select (bit 0)
        pub const SELECT: u32 = 0x78;

        /// Row stride in bytes
        pub const STRIDE: u32 = 0x90;
    }

    /// Bit layout of the size register
    pub mod size {
        pub const WIDTH_MASK: u32 = 0xFFFF;
        pub const HEIGHT_SHIFT: u32 = 16;
    }

    /// Bit layout of the select register
    pub mod select {
        /// Set when the secondary address is the one scanned out
        pub const SECONDARY: u32 = 1 << 0;
    }
}

/// Pixel format values for framebuffer format registers
///
/// These correspond to bits 0-2 of the format register.
///
/// Reference: <https://www.3dbrew.org/wiki/GPU/External_Registers#Framebuffer_format>
pub mod pixel_format {
    /// Mask selecting the color format bits
    pub const MASK: u32 = 0x7;
    /// RGBA8 (32 bits per pixel)
    pub const RGBA8: u32 = 0;
    /// RGB8 (24 bits per pixel)
    pub const RGB8: u32 = 1;
    /// RGB565 (16 bits per pixel)
    pub const RGB565: u32 = 2;
    /// RGB5A1 (16 bits per pixel)
    pub const RGB5A1: u32 = 3;
    /// RGBA4 (16 bits per pixel)
    pub const RGBA4: u32 = 4;
}
