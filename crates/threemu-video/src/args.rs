use crate::config::RendererConfig;
use crate::memory::{FCRAM_BASE, PhysicalMemory, VRAM_BASE};
use crate::mmio::EmulatedVideo;
use crate::pixel_format::PixelFormat;
use crate::screen::Screen;
use crate::software::{Filter, SoftwareBackend};
use crate::test_pattern;
use clap::{Parser, ValueEnum};
use oxidiz3ds_hw::memory_map;
use oxidiz3ds_hw::mmio::gpu::{self as hw_gpu, framebuffer as hw_fb};
use oxidiz3ds_hw::mmio::lcd::{self as hw_lcd, color_fill};
use oxidiz3ds_hw::specs::display;
use std::path::PathBuf;
use tracing::info;

/// Space reserved per framebuffer in the default VRAM layout (fits 240x400 RGBA8)
const TOP_SLOT_SIZE: u32 = 0x60000;

/// Space reserved per framebuffer for the bottom screen (fits 240x320 RGBA8)
const BOTTOM_SLOT_SIZE: u32 = 0x50000;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Rgba8,
    Rgb8,
    Rgb565,
    Rgb5a1,
    Rgba4,
}

impl From<FormatArg> for PixelFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Rgba8 => PixelFormat::Rgba8,
            FormatArg::Rgb8 => PixelFormat::Rgb8,
            FormatArg::Rgb565 => PixelFormat::Rgb565,
            FormatArg::Rgb5a1 => PixelFormat::Rgb5A1,
            FormatArg::Rgba4 => PixelFormat::Rgba4,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterArg {
    Nearest,
    Linear,
}

impl From<FilterArg> for Filter {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::Nearest => Filter::Nearest,
            FilterArg::Linear => Filter::Linear,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct Args {
    /// Raw VRAM dump, loaded at 0x18000000
    #[arg(long)]
    pub vram: Option<PathBuf>,

    /// Raw FCRAM dump, loaded at 0x20000000
    #[arg(long)]
    pub fcram: Option<PathBuf>,

    /// Draw a gradient into both framebuffers of each screen
    #[arg(long)]
    pub test_pattern: bool,

    /// Top screen primary framebuffer address (hex: 0x1234 or decimal: 1234).
    /// The secondary framebuffer follows it.
    #[arg(long, value_parser = parse_hex_or_dec, default_value = "0x18000000")]
    pub top_addr: u32,

    /// Bottom screen primary framebuffer address
    #[arg(long, value_parser = parse_hex_or_dec, default_value = "0x180C0000")]
    pub bottom_addr: u32,

    #[arg(long, value_enum, default_value_t = FormatArg::Rgb8)]
    pub top_format: FormatArg,

    #[arg(long, value_enum, default_value_t = FormatArg::Rgb8)]
    pub bottom_format: FormatArg,

    /// Top screen row stride in bytes (default: tightly packed)
    #[arg(long, value_parser = parse_hex_or_dec)]
    pub top_stride: Option<u32>,

    /// Bottom screen row stride in bytes (default: tightly packed)
    #[arg(long, value_parser = parse_hex_or_dec)]
    pub bottom_stride: Option<u32>,

    /// Show a solid color (RRGGBB) on the top screen instead of its framebuffer
    #[arg(long, value_parser = parse_rgb)]
    pub top_fill: Option<[u8; 3]>,

    /// Show a solid color (RRGGBB) on the bottom screen instead of its framebuffer
    #[arg(long, value_parser = parse_rgb)]
    pub bottom_fill: Option<[u8; 3]>,

    /// Background color as r,g,b components in 0.0-1.0
    #[arg(long, value_parser = parse_background, default_value = "0.2,0.2,0.2")]
    pub background: [f32; 3],

    /// Swap primary and secondary framebuffers every N frames (0: never)
    #[arg(long, default_value_t = 0)]
    pub swap_interval: u64,

    /// Texture filtering when the screens are scaled
    #[arg(long, value_enum, default_value_t = FilterArg::Linear)]
    pub filter: FilterArg,

    /// Output size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size, default_value = "400x480")]
    pub size: (u32, u32),

    /// Number of frames to render (headless only)
    #[arg(long, short = 'n', default_value_t = 1)]
    pub frames: u64,

    /// Write the last frame as a binary PPM image (headless only)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Args {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.frames == 0 {
            return Err("--frames must be at least 1".to_string());
        }
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err("--size must be non-zero in both dimensions".to_string());
        }
        if self.test_pattern && self.vram.is_some() {
            return Err("--test-pattern would overwrite the --vram dump".to_string());
        }
        Ok(())
    }

    pub fn to_renderer_config(&self) -> RendererConfig {
        RendererConfig {
            background: self.background,
        }
    }

    pub fn to_software_backend(&self) -> SoftwareBackend {
        let mut backend = SoftwareBackend::new();
        backend.set_filter(self.filter.into());
        backend
    }

    /// Per-screen settings: (primary address, format, stride, fill)
    fn screen(&self, screen: Screen) -> (u32, PixelFormat, Option<u32>, Option<[u8; 3]>) {
        match screen {
            Screen::Top => (
                self.top_addr,
                self.top_format.into(),
                self.top_stride,
                self.top_fill,
            ),
            Screen::Bottom => (
                self.bottom_addr,
                self.bottom_format.into(),
                self.bottom_stride,
                self.bottom_fill,
            ),
        }
    }
}

/// Framebuffer dimensions (width, height) as stored in memory
pub fn native_framebuffer_size(screen: Screen) -> (u32, u32) {
    match screen {
        Screen::Top => (display::TOP_FRAMEBUFFER_WIDTH, display::TOP_FRAMEBUFFER_HEIGHT),
        Screen::Bottom => (
            display::BOTTOM_FRAMEBUFFER_WIDTH,
            display::BOTTOM_FRAMEBUFFER_HEIGHT,
        ),
    }
}

fn slot_size(screen: Screen) -> u32 {
    match screen {
        Screen::Top => TOP_SLOT_SIZE,
        Screen::Bottom => BOTTOM_SLOT_SIZE,
    }
}

fn framebuffer_block(screen: Screen) -> u32 {
    hw_gpu::BASE
        + match screen {
            Screen::Top => hw_fb::TOP,
            Screen::Bottom => hw_fb::BOTTOM,
        }
}

fn color_fill_register(screen: Screen) -> u32 {
    hw_lcd::BASE
        + match screen {
            Screen::Top => hw_lcd::registers::COLOR_FILL_TOP,
            Screen::Bottom => hw_lcd::registers::COLOR_FILL_BOTTOM,
        }
}

/// Set up emulated memory and registers as described by the arguments
pub fn build_video(args: &Args) -> Result<EmulatedVideo, Box<dyn std::error::Error>> {
    let fcram = args.fcram.as_ref().map(std::fs::read).transpose()?;
    let memory = PhysicalMemory::with_fcram_size(
        fcram.as_ref().map_or(memory_map::fcram::SIZE, |data| data.len()),
    );
    let mut video = EmulatedVideo::new(memory);

    if let Some(data) = &fcram {
        info!("Loading FCRAM dump: {} bytes", data.len());
        video.memory.write(FCRAM_BASE, data)?;
    }
    if let Some(path) = &args.vram {
        info!("Loading VRAM dump from file: {:?}", path);
        let data = std::fs::read(path)?;
        video.memory.write(VRAM_BASE, &data)?;
    }

    for screen in Screen::ALL {
        let (address, format, stride, fill) = args.screen(screen);
        let (width, height) = native_framebuffer_size(screen);
        let bpp = crate::pixel_format::resolve(format).bytes_per_pixel;
        let stride = stride.unwrap_or(width * bpp);
        let secondary = address.checked_add(slot_size(screen)).ok_or_else(|| {
            format!(
                "{} screen framebuffer {:#X} leaves no room for a secondary buffer",
                screen.name(),
                address
            )
        })?;

        let block = framebuffer_block(screen);
        let regs = &mut video.registers;
        regs.write(block + hw_fb::registers::SIZE, 4, (height << hw_fb::size::HEIGHT_SHIFT) | width);
        regs.write(block + hw_fb::registers::ADDRESS_PRIMARY, 4, address);
        regs.write(block + hw_fb::registers::ADDRESS_SECONDARY, 4, secondary);
        regs.write(block + hw_fb::registers::FORMAT, 4, format.raw());
        regs.write(block + hw_fb::registers::STRIDE, 4, stride);

        if let Some([r, g, b]) = fill {
            let value = color_fill::ENABLE
                | u32::from(r) << color_fill::RED_SHIFT
                | u32::from(g) << color_fill::GREEN_SHIFT
                | u32::from(b) << color_fill::BLUE_SHIFT;
            regs.write(color_fill_register(screen), 4, value);
        }

        if args.test_pattern {
            info!(
                "Writing {} screen test pattern at {:#X} and {:#X}",
                screen.name(),
                address,
                secondary
            );
            video
                .memory
                .write(address, &test_pattern::gradient(format, width, height, stride, 0x40))?;
            video
                .memory
                .write(secondary, &test_pattern::gradient(format, width, height, stride, 0xC0))?;
        }
    }

    Ok(video)
}

pub fn parse_hex_or_dec(s: &str) -> Result<u32, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

/// Parse an RRGGBB color, with or without a `0x`/`#` prefix
pub fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let hex = s.trim_start_matches("0x").trim_start_matches('#');
    if hex.len() != 6 {
        return Err(format!("expected RRGGBB, got {s:?}"));
    }
    let value = u32::from_str_radix(hex, 16).map_err(|e| e.to_string())?;
    Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

/// Parse `r,g,b` with each component in 0.0-1.0
pub fn parse_background(s: &str) -> Result<[f32; 3], String> {
    let components = s
        .split(',')
        .map(|c| c.trim().parse::<f32>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    let [r, g, b] = components[..] else {
        return Err(format!("expected three components, got {s:?}"));
    };
    if [r, g, b].iter().any(|c| !(0.0..=1.0).contains(c)) {
        return Err(format!("components must be within 0.0-1.0, got {s:?}"));
    }
    Ok([r, g, b])
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (width, height) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| v.parse::<u32>().map_err(|e| e.to_string());
    Ok((parse(width)?, parse(height)?))
}
