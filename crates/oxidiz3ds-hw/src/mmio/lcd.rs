//! # References
//! - <https://www.3dbrew.org/wiki/LCD_Registers>

/// LCD MMIO region base address
pub const BASE: u32 = 0x10202000;

/// LCD MMIO region end address (exclusive)
pub const END: u32 = 0x10203000;

/// LCD register offsets (relative to `BASE`)
pub mod registers {
    /// Top screen color fill register
    ///
    /// Reference: <https://www.3dbrew.org/wiki/LCD_Registers#LCD_color_fill>
    pub const COLOR_FILL_TOP: u32 = 0x204;

    /// Bottom screen color fill register
    pub const COLOR_FILL_BOTTOM: u32 = 0xA04;
}

/// Bit layout of the color fill registers
pub mod color_fill {
    pub const RED_SHIFT: u32 = 0;
    pub const GREEN_SHIFT: u32 = 8;
    pub const BLUE_SHIFT: u32 = 16;

    /// When set the LCD outputs the fill color instead of the framebuffer
    pub const ENABLE: u32 = 1 << 24;
}
