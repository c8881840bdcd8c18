//! Framebuffer pixel formats and how they are handed to the host backend.
//!
//! The emulated format register selects one of five color encodings. Each
//! maps to a fixed host upload description: how many bytes one pixel takes in
//! emulated memory, how the backend should interpret those bytes, and what it
//! stores them as.
//!
//! # References
//! - [Framebuffer format](https://www.3dbrew.org/wiki/GPU/External_Registers#Framebuffer_format)

use oxidiz3ds_hw::mmio::gpu::pixel_format as hw_format;

/// Pixel format for framebuffers.
///
/// These correspond to the values in bits 0-2 of the format register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit RGBA (8 bits per component)
    Rgba8,
    /// 24-bit RGB (8 bits per component)
    Rgb8,
    /// 16-bit RGB (5-6-5)
    Rgb565,
    /// 16-bit RGB with 1-bit alpha (5-5-5-1)
    Rgb5A1,
    /// 16-bit RGBA (4 bits per component)
    Rgba4,
    /// A format value the hardware accepts but nothing here can display
    Unknown(u32),
}

impl From<u32> for PixelFormat {
    fn from(value: u32) -> Self {
        match value & hw_format::MASK {
            hw_format::RGBA8 => PixelFormat::Rgba8,
            hw_format::RGB8 => PixelFormat::Rgb8,
            hw_format::RGB565 => PixelFormat::Rgb565,
            hw_format::RGB5A1 => PixelFormat::Rgb5A1,
            hw_format::RGBA4 => PixelFormat::Rgba4,
            other => PixelFormat::Unknown(other),
        }
    }
}

impl PixelFormat {
    /// Raw register value
    pub fn raw(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => hw_format::RGBA8,
            PixelFormat::Rgb8 => hw_format::RGB8,
            PixelFormat::Rgb565 => hw_format::RGB565,
            PixelFormat::Rgb5A1 => hw_format::RGB5A1,
            PixelFormat::Rgba4 => hw_format::RGBA4,
            PixelFormat::Unknown(raw) => raw,
        }
    }
}

/// Component layout of the bytes handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFormat {
    Rgba,
    Rgb,
    Bgr,
}

/// Component packing of the bytes handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    /// One byte per component, in memory order
    UnsignedByte,
    /// Native-endian u32, first component in the most significant byte
    UnsignedInt8888,
    /// Native-endian u16, 5-6-5
    UnsignedShort565,
    /// Native-endian u16, 5-5-5-1
    UnsignedShort5551,
    /// Native-endian u16, 4-4-4-4
    UnsignedShort4444,
}

/// Host-side storage layout of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Rgba,
    Rgb,
}

/// Everything the backend needs to allocate and fill a surface of one format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub bytes_per_pixel: u32,
    pub transfer_format: TransferFormat,
    pub transfer_type: TransferType,
    pub storage_format: StorageFormat,
}

/// Upload description for solid-fill surfaces: one R, G, B byte triple
pub const SOLID_FILL_FORMAT: FormatInfo = FormatInfo {
    bytes_per_pixel: 3,
    transfer_format: TransferFormat::Rgb,
    transfer_type: TransferType::UnsignedByte,
    storage_format: StorageFormat::Rgb,
};

/// Look up the host upload description for a framebuffer format.
///
/// # Panics
///
/// Panics on [`PixelFormat::Unknown`]. A guest selecting a format outside the
/// supported set is an unimplemented hardware configuration, not something a
/// frame can be rendered around.
pub fn resolve(format: PixelFormat) -> FormatInfo {
    match format {
        PixelFormat::Rgba8 => FormatInfo {
            bytes_per_pixel: 4,
            transfer_format: TransferFormat::Rgba,
            transfer_type: TransferType::UnsignedInt8888,
            storage_format: StorageFormat::Rgba,
        },
        // The bytes are stored B, G, R in memory; an unsigned-byte transfer
        // reads them in byte order rather than as a little-endian word.
        PixelFormat::Rgb8 => FormatInfo {
            bytes_per_pixel: 3,
            transfer_format: TransferFormat::Bgr,
            transfer_type: TransferType::UnsignedByte,
            storage_format: StorageFormat::Rgb,
        },
        PixelFormat::Rgb565 => FormatInfo {
            bytes_per_pixel: 2,
            transfer_format: TransferFormat::Rgb,
            transfer_type: TransferType::UnsignedShort565,
            storage_format: StorageFormat::Rgb,
        },
        PixelFormat::Rgb5A1 => FormatInfo {
            bytes_per_pixel: 2,
            transfer_format: TransferFormat::Rgba,
            transfer_type: TransferType::UnsignedShort5551,
            storage_format: StorageFormat::Rgba,
        },
        PixelFormat::Rgba4 => FormatInfo {
            bytes_per_pixel: 2,
            transfer_format: TransferFormat::Rgba,
            transfer_type: TransferType::UnsignedShort4444,
            storage_format: StorageFormat::Rgba,
        },
        PixelFormat::Unknown(raw) => {
            panic!("unimplemented framebuffer pixel format {raw:#X}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_supported_format() {
        let cases = [
            (PixelFormat::Rgba8, 4, TransferFormat::Rgba, TransferType::UnsignedInt8888),
            (PixelFormat::Rgb8, 3, TransferFormat::Bgr, TransferType::UnsignedByte),
            (PixelFormat::Rgb565, 2, TransferFormat::Rgb, TransferType::UnsignedShort565),
            (PixelFormat::Rgb5A1, 2, TransferFormat::Rgba, TransferType::UnsignedShort5551),
            (PixelFormat::Rgba4, 2, TransferFormat::Rgba, TransferType::UnsignedShort4444),
        ];

        for (format, bpp, transfer_format, transfer_type) in cases {
            let info = resolve(format);
            assert_eq!(info.bytes_per_pixel, bpp, "{format:?}");
            assert_eq!(info.transfer_format, transfer_format, "{format:?}");
            assert_eq!(info.transfer_type, transfer_type, "{format:?}");
        }
    }

    #[test]
    fn only_low_bits_select_format() {
        assert_eq!(PixelFormat::from(0x41), PixelFormat::Rgb8);
        assert_eq!(PixelFormat::from(6), PixelFormat::Unknown(6));
    }

    #[test]
    #[should_panic(expected = "unimplemented framebuffer pixel format")]
    fn unknown_format_faults() {
        resolve(PixelFormat::from(5));
    }
}
