//! Synthetic framebuffer contents for running without a memory dump.

use crate::pixel_format::{PixelFormat, TransferFormat, TransferType, resolve};

/// Encode an opaque color the way the guest stores it in memory.
///
/// # Panics
///
/// On an unsupported pixel format.
pub fn encode_pixel(format: PixelFormat, r: u8, g: u8, b: u8) -> Vec<u8> {
    let info = resolve(format);
    let (r16, g16, b16) = (u16::from(r), u16::from(g), u16::from(b));
    match (info.transfer_type, info.transfer_format) {
        (TransferType::UnsignedInt8888, _) => vec![0xFF, b, g, r],
        (TransferType::UnsignedByte, TransferFormat::Bgr) => vec![b, g, r],
        (TransferType::UnsignedByte, _) => vec![r, g, b],
        (TransferType::UnsignedShort565, _) => {
            ((r16 >> 3) << 11 | (g16 >> 2) << 5 | (b16 >> 3)).to_le_bytes().to_vec()
        }
        (TransferType::UnsignedShort5551, _) => {
            ((r16 >> 3) << 11 | (g16 >> 3) << 6 | (b16 >> 3) << 1 | 1).to_le_bytes().to_vec()
        }
        (TransferType::UnsignedShort4444, _) => {
            ((r16 >> 4) << 12 | (g16 >> 4) << 8 | (b16 >> 4) << 4 | 0xF).to_le_bytes().to_vec()
        }
    }
}

/// A `width` x `height` framebuffer with rows `stride` bytes apart.
///
/// Red grows along each row, green down the rows, and blue is the constant
/// `tint`, which makes the two buffers of a double-buffered screen tell apart.
/// A stride narrower than a row truncates each row to the pixels that fit.
pub fn gradient(format: PixelFormat, width: u32, height: u32, stride: u32, tint: u8) -> Vec<u8> {
    let stride = stride as usize;
    let mut out = vec![0u8; stride * height as usize];
    for (y, row) in (0..height).zip(out.chunks_exact_mut(stride.max(1))) {
        let g = (u64::from(y) * 255 / u64::from(height.max(2) - 1)) as u8;
        let mut offset = 0;
        for x in 0..width {
            let r = (u64::from(x) * 255 / u64::from(width.max(2) - 1)) as u8;
            let pixel = encode_pixel(format, r, g, tint);
            let Some(dst) = row.get_mut(offset..offset + pixel.len()) else {
                break;
            };
            dst.copy_from_slice(&pixel);
            offset += pixel.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::decode_texel;

    #[test]
    fn encoding_survives_decoding() {
        let formats = [
            PixelFormat::Rgba8,
            PixelFormat::Rgb8,
            PixelFormat::Rgb565,
            PixelFormat::Rgb5A1,
            PixelFormat::Rgba4,
        ];
        for format in formats {
            // Pure channel values are exact in every format
            for (r, g, b) in [(0xFF, 0, 0), (0, 0xFF, 0), (0, 0, 0xFF), (0, 0, 0)] {
                let bytes = encode_pixel(format, r, g, b);
                let expected = (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
                assert_eq!(decode_texel(&resolve(format), &bytes), expected, "{format:?}");
            }
        }
    }

    #[test]
    fn gradient_respects_stride() {
        let fb = gradient(PixelFormat::Rgb8, 2, 2, 8, 0x40);
        assert_eq!(fb.len(), 16);
        // First row: red 0 then 255; padding stays zero
        assert_eq!(&fb[..8], &[0x40, 0, 0, 0x40, 0, 0xFF, 0, 0]);
        // Second row: green 255
        assert_eq!(&fb[8..14], &[0x40, 0xFF, 0, 0x40, 0xFF, 0xFF]);
    }

    #[test]
    fn narrow_stride_truncates_rows() {
        // Rows of 4 RGB8 pixels in a 7-byte stride: only 2 pixels fit
        let fb = gradient(PixelFormat::Rgb8, 4, 3, 7, 0x40);
        assert_eq!(fb.len(), 21);
        assert_eq!(&fb[7..14], &[0x40, 0x7F, 0, 0x40, 0x7F, 0x55, 0]);

        assert!(gradient(PixelFormat::Rgba8, 240, 400, 0, 0).is_empty());
    }
}
