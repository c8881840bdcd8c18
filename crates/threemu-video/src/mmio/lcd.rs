//! LCD color fill registers.
//!
//! # References
//! - [LCD Registers](https://www.3dbrew.org/wiki/LCD_Registers)

use crate::descriptor::ColorFill;
use crate::screen::{PerScreen, Screen};
use oxidiz3ds_hw::mmio::lcd::{color_fill as hw_fill, registers as hw_regs};
use tracing::{debug, instrument, warn};

#[derive(Debug, Default)]
pub struct LcdState {
    pub color_fill: PerScreen<u32>,
}

impl LcdState {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(offset: u32) -> Option<Screen> {
        match offset {
            hw_regs::COLOR_FILL_TOP => Some(Screen::Top),
            hw_regs::COLOR_FILL_BOTTOM => Some(Screen::Bottom),
            _ => None,
        }
    }

    /// Handle a write to an LCD register
    #[instrument(level = "trace", skip(self))]
    pub fn write(&mut self, offset: u32, _size: usize, value: u32) {
        match Self::decode(offset) {
            Some(screen) => {
                self.color_fill[screen] = value;
                debug!("{} screen color fill: {:?}", screen.name(), self.fill(screen));
            }
            None => warn!(
                "Unknown LCD register write: offset={:#X}, value={:#X}",
                offset, value
            ),
        }
    }

    /// Handle a read from an LCD register
    #[instrument(level = "trace", skip(self))]
    pub fn read(&self, offset: u32, _size: usize) -> u32 {
        match Self::decode(offset) {
            Some(screen) => self.color_fill[screen],
            None => {
                warn!("Unknown LCD register read: offset={:#X}", offset);
                0
            }
        }
    }

    /// Decoded color fill of one screen
    pub fn fill(&self, screen: Screen) -> ColorFill {
        let raw = self.color_fill[screen];
        ColorFill {
            enabled: raw & hw_fill::ENABLE != 0,
            r: (raw >> hw_fill::RED_SHIFT) as u8,
            g: (raw >> hw_fill::GREEN_SHIFT) as u8,
            b: (raw >> hw_fill::BLUE_SHIFT) as u8,
        }
    }
}
