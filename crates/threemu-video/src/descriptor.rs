//! Per-frame snapshot of one screen's framebuffer configuration.

use crate::pixel_format::PixelFormat;

/// Which of the two latched framebuffer addresses is scanned out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FramebufferSelect {
    #[default]
    Primary,
    Secondary,
}

/// LCD color fill: when enabled the screen shows one constant color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorFill {
    pub enabled: bool,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorFill {
    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Framebuffer configuration of one screen, read once per frame.
///
/// `width` is the length of one stored scanline in pixels and `height` the
/// number of scanlines. Because the panels are mounted rotated, the top
/// screen's framebuffer is 240 wide and 400 high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    pub address_primary: u32,
    pub address_secondary: u32,
    pub active: FramebufferSelect,
    pub width: u32,
    pub height: u32,
    /// Distance between scanlines in bytes
    pub stride: u32,
    pub format: PixelFormat,
    pub color_fill: ColorFill,
}

impl FramebufferDescriptor {
    /// Physical address of the framebuffer being scanned out
    pub fn active_address(&self) -> u32 {
        match self.active {
            FramebufferSelect::Primary => self.address_primary,
            FramebufferSelect::Secondary => self.address_secondary,
        }
    }
}
