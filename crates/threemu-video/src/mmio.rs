//! Memory-mapped video registers of the emulated console.
//!
//! This is the producer side of the compositor: guest writes land here and
//! once per frame the renderer reads a [`FramebufferDescriptor`] per screen.
//!
//! # Memory Map
//! According to [3DBrew IO Registers](https://www.3dbrew.org/wiki/IO_Registers):
//! - `0x10202000-0x10203000`: LCD registers (color fill)
//! - `0x10400000-0x10500000`: GPU registers (framebuffer setup)
//! - `0x18000000-0x18600000`: VRAM (6MB)
//! - `0x20000000-0x28000000`: FCRAM (128MB)

pub mod gpu;
pub mod lcd;

use crate::descriptor::FramebufferDescriptor;
use crate::memory::{AddressSpace, PhysicalMemory};
use crate::renderer::FrameSource;
use crate::screen::Screen;
use oxidiz3ds_hw::mmio as hw_mmio;
use oxidiz3ds_hw::mmio::gpu::framebuffer as hw_fb;
use tracing::warn;

// Re-export types for convenience
pub use gpu::{FramebufferRegs, GpuState};
pub use lcd::LcdState;

/// Register state the compositor reads each frame
#[derive(Debug, Default)]
pub struct VideoRegisters {
    pub gpu: GpuState,
    pub lcd: LcdState,
}

impl VideoRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch a write by physical address
    pub fn write(&mut self, address: u32, size: usize, value: u32) {
        match address {
            a if (hw_mmio::gpu::BASE..hw_mmio::gpu::END).contains(&a) => {
                self.gpu.write(a - hw_mmio::gpu::BASE, size, value)
            }
            a if (hw_mmio::lcd::BASE..hw_mmio::lcd::END).contains(&a) => {
                self.lcd.write(a - hw_mmio::lcd::BASE, size, value)
            }
            _ => warn!(
                "Write outside video MMIO: addr={:#X}, value={:#X}",
                address, value
            ),
        }
    }

    /// Dispatch a read by physical address
    pub fn read(&self, address: u32, size: usize) -> u32 {
        match address {
            a if (hw_mmio::gpu::BASE..hw_mmio::gpu::END).contains(&a) => {
                self.gpu.read(a - hw_mmio::gpu::BASE, size)
            }
            a if (hw_mmio::lcd::BASE..hw_mmio::lcd::END).contains(&a) => {
                self.lcd.read(a - hw_mmio::lcd::BASE, size)
            }
            _ => {
                warn!("Read outside video MMIO: addr={:#X}", address);
                0
            }
        }
    }

    /// Toggle the active framebuffer of both screens, as the guest does after
    /// finishing a frame
    pub fn swap_framebuffers(&mut self) {
        for screen in Screen::ALL {
            let block = hw_mmio::gpu::BASE
                + match screen {
                    Screen::Top => hw_fb::TOP,
                    Screen::Bottom => hw_fb::BOTTOM,
                };
            let select = block + hw_fb::registers::SELECT;
            let value = self.read(select, 4) ^ hw_fb::select::SECONDARY;
            self.write(select, 4, value);
        }
    }

    /// Snapshot of one screen's configuration
    pub fn descriptor(&self, screen: Screen) -> FramebufferDescriptor {
        let regs = &self.gpu.framebuffers[screen];
        FramebufferDescriptor {
            address_primary: regs.address_primary,
            address_secondary: regs.address_secondary,
            active: regs.active(),
            width: regs.width(),
            height: regs.height(),
            stride: regs.stride,
            format: regs.pixel_format(),
            color_fill: self.lcd.fill(screen),
        }
    }
}

/// Video registers together with the memory their framebuffers point into
#[derive(Default)]
pub struct EmulatedVideo {
    pub registers: VideoRegisters,
    pub memory: PhysicalMemory,
}

impl EmulatedVideo {
    pub fn new(memory: PhysicalMemory) -> Self {
        Self {
            registers: VideoRegisters::new(),
            memory,
        }
    }
}

impl FrameSource for EmulatedVideo {
    fn descriptor(&self, screen: Screen) -> FramebufferDescriptor {
        self.registers.descriptor(screen)
    }

    fn memory(&self) -> &dyn AddressSpace {
        &self.memory
    }
}
