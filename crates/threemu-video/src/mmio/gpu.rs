//! GPU framebuffer setup registers.
//!
//! The GPU is mapped at 0x10400000-0x10500000. Of its registers only the two
//! framebuffer setup blocks matter for presentation; each describes where one
//! screen's framebuffer lives and how it is laid out.
//!
//! # References
//! - [GPU External Registers](https://www.3dbrew.org/wiki/GPU/External_Registers)
//!
//! # Framebuffer Format
//! The 3DS framebuffers have an unusual orientation: pixels are stored left-to-right
//! (as if the screen is rotated 90° clockwise). This means for a 400×240 screen, the
//! framebuffer is actually stored as 400 rows of 240 pixels each.

use crate::descriptor::FramebufferSelect;
use crate::pixel_format::PixelFormat;
use crate::screen::{PerScreen, Screen};
use oxidiz3ds_hw::mmio::gpu::framebuffer::{self as hw_fb, registers as hw_regs};
use tracing::{debug, instrument, trace, warn};

/// Raw contents of one framebuffer setup block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramebufferRegs {
    pub size: u32,
    pub address_primary: u32,
    pub address_secondary: u32,
    pub format: u32,
    pub select: u32,
    pub stride: u32,
}

impl FramebufferRegs {
    pub fn width(&self) -> u32 {
        self.size & hw_fb::size::WIDTH_MASK
    }

    pub fn height(&self) -> u32 {
        self.size >> hw_fb::size::HEIGHT_SHIFT
    }

    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::from(self.format)
    }

    pub fn active(&self) -> FramebufferSelect {
        if self.select & hw_fb::select::SECONDARY != 0 {
            FramebufferSelect::Secondary
        } else {
            FramebufferSelect::Primary
        }
    }
}

/// GPU state tracking framebuffer configuration
#[derive(Debug, Default)]
pub struct GpuState {
    pub framebuffers: PerScreen<FramebufferRegs>,
}

impl GpuState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a GPU offset into the screen whose setup block contains it and
    /// the offset within that block
    fn decode(offset: u32) -> Option<(Screen, u32)> {
        [(Screen::Top, hw_fb::TOP), (Screen::Bottom, hw_fb::BOTTOM)]
            .into_iter()
            .find(|(_, base)| (*base..*base + hw_fb::BLOCK_SIZE).contains(&offset))
            .map(|(screen, base)| (screen, offset - base))
    }

    /// Handle a write to a GPU register
    #[instrument(level = "trace", skip(self))]
    pub fn write(&mut self, offset: u32, _size: usize, value: u32) {
        trace!(
            "GPU register write: offset={:#X}, value={:#X}",
            offset, value
        );

        let Some((screen, register)) = Self::decode(offset) else {
            warn!(
                "Unknown GPU register write: offset={:#X}, value={:#X}",
                offset, value
            );
            return;
        };
        let regs = &mut self.framebuffers[screen];
        let name = screen.name();

        match register {
            hw_regs::SIZE => {
                regs.size = value;
                debug!(
                    "{} screen framebuffer size: {}x{}",
                    name,
                    regs.width(),
                    regs.height()
                );
            }
            hw_regs::ADDRESS_PRIMARY => {
                regs.address_primary = value;
                debug!("{} screen primary framebuffer: {:#X}", name, value);
            }
            hw_regs::ADDRESS_SECONDARY => {
                regs.address_secondary = value;
                debug!("{} screen secondary framebuffer: {:#X}", name, value);
            }
            hw_regs::FORMAT => {
                regs.format = value;
                debug!("{} screen format: {:?}", name, regs.pixel_format());
            }
            hw_regs::SELECT => {
                regs.select = value;
                trace!("{} screen active framebuffer: {:?}", name, regs.active());
            }
            hw_regs::STRIDE => {
                regs.stride = value;
                debug!("{} screen stride: {:#X}", name, value);
            }
            _ => {
                warn!(
                    "Unknown GPU register write: offset={:#X}, value={:#X}",
                    offset, value
                );
            }
        }
    }

    /// Handle a read from a GPU register
    #[instrument(level = "trace", skip(self))]
    pub fn read(&self, offset: u32, _size: usize) -> u32 {
        trace!("GPU register read: offset={:#X}", offset);

        let Some((screen, register)) = Self::decode(offset) else {
            warn!("Unknown GPU register read: offset={:#X}", offset);
            return 0;
        };
        let regs = &self.framebuffers[screen];

        match register {
            hw_regs::SIZE => regs.size,
            hw_regs::ADDRESS_PRIMARY => regs.address_primary,
            hw_regs::ADDRESS_SECONDARY => regs.address_secondary,
            hw_regs::FORMAT => regs.format,
            hw_regs::SELECT => regs.select,
            hw_regs::STRIDE => regs.stride,
            _ => {
                warn!("Unknown GPU register read: offset={:#X}", offset);
                0
            }
        }
    }
}
