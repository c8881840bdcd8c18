//! Moving a screen's pixels from emulated memory into its surface.

use crate::backend::{GraphicsBackend, UploadRegion};
use crate::descriptor::FramebufferDescriptor;
use crate::memory::AddressSpace;
use crate::pixel_format::{FormatInfo, SOLID_FILL_FORMAT};
use crate::surface::{SurfaceRecord, TransferPlan};
use tracing::{instrument, trace, warn};

/// Host row alignment, in pixels, the row pitch must be a multiple of
const ROW_ALIGNMENT: u32 = 4;

/// Fill the record's storage according to a plan from [`crate::surface::sync`].
///
/// A fill plan uploads a single pixel no matter how large the screen is; the
/// compositor stretches it over the whole destination rectangle.
///
/// A raster whose stride is narrower than a row, or whose bytes are not all
/// backed by memory, is skipped with a warning. The storage then holds
/// whatever `sync` left in it: the previous frame if the shape is unchanged,
/// zeroes if it was just reallocated.
///
/// # Panics
///
/// For raster plans, panics if the stride is not a whole number of pixels or
/// the resulting pixel pitch is not a multiple of four.
#[instrument(level = "trace", skip_all, fields(texture = ?record.texture))]
pub fn ingest<B, M>(
    plan: &TransferPlan,
    descriptor: &FramebufferDescriptor,
    record: &SurfaceRecord,
    memory: &M,
    backend: &mut B,
) where
    B: GraphicsBackend + ?Sized,
    M: AddressSpace + ?Sized,
{
    match *plan {
        TransferPlan::Fill { color } => {
            backend.upload(record.texture, UploadRegion::packed(1, 1), &SOLID_FILL_FORMAT, &color);
        }
        TransferPlan::Raster {
            width,
            height,
            format,
        } => load_framebuffer(descriptor, width, height, &format, record, memory, backend),
    }
}

/// Row pitch in pixels for a byte stride.
///
/// # Panics
///
/// If `stride` is not a multiple of `bytes_per_pixel`, or the pitch is not a
/// multiple of the host row alignment.
pub fn pixel_stride(stride: u32, bytes_per_pixel: u32) -> u32 {
    let pixel_stride = stride / bytes_per_pixel;
    assert_eq!(
        pixel_stride * bytes_per_pixel,
        stride,
        "framebuffer stride {stride} is not a multiple of {bytes_per_pixel} bytes per pixel"
    );
    assert!(
        pixel_stride % ROW_ALIGNMENT == 0,
        "framebuffer pixel stride {pixel_stride} is not a multiple of {ROW_ALIGNMENT}"
    );
    pixel_stride
}

fn load_framebuffer<B, M>(
    descriptor: &FramebufferDescriptor,
    width: u32,
    height: u32,
    format: &FormatInfo,
    record: &SurfaceRecord,
    memory: &M,
    backend: &mut B,
) where
    B: GraphicsBackend + ?Sized,
    M: AddressSpace + ?Sized,
{
    let row_length = pixel_stride(descriptor.stride, format.bytes_per_pixel);
    if width == 0 || height == 0 {
        trace!("Empty framebuffer, nothing to transfer");
        return;
    }
    if row_length < width {
        warn!(
            "Framebuffer stride {:#X} is narrower than a {}-pixel row, not updating surface",
            descriptor.stride, width
        );
        return;
    }

    let address = descriptor.active_address();
    let region = UploadRegion {
        width,
        height,
        row_length,
    };
    let len = region.source_len(format.bytes_per_pixel);
    let Some(data) = memory.host_slice(address).and_then(|bytes| bytes.get(..len)) else {
        warn!(
            "Framebuffer {:#X} ({}x{}, {:#X} bytes) is not backed by memory, not updating surface",
            address, width, height, len
        );
        return;
    };

    trace!(
        "{:#X} bytes from {:#X} ({}x{}), fmt {:?}",
        u64::from(descriptor.stride) * u64::from(height),
        address,
        width,
        height,
        descriptor.format
    );
    backend.upload(record.texture, region, format, data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColorFill, FramebufferSelect};
    use crate::memory::{PhysicalMemory, VRAM_BASE};
    use crate::pixel_format::PixelFormat;
    use crate::software::SoftwareBackend;
    use crate::surface::{SurfaceShape, sync};
    use proptest::prelude::*;

    fn descriptor(width: u32, height: u32, stride: u32, format: PixelFormat) -> FramebufferDescriptor {
        FramebufferDescriptor {
            address_primary: VRAM_BASE,
            address_secondary: VRAM_BASE + 0x100000,
            active: FramebufferSelect::Primary,
            width,
            height,
            stride,
            format,
            color_fill: ColorFill::default(),
        }
    }

    fn run(
        fb: &FramebufferDescriptor,
        memory: &PhysicalMemory,
        backend: &mut SoftwareBackend,
        record: &mut SurfaceRecord,
    ) {
        let plan = sync(record, fb, backend);
        ingest(&plan, fb, record, memory, backend);
    }

    #[test]
    fn copies_rgba8_frame() {
        let mut memory = PhysicalMemory::with_fcram_size(0);
        let frame: Vec<u8> = (0..1600 * 240).map(|i| (i % 251) as u8).collect();
        memory.write(VRAM_BASE, &frame).unwrap();

        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let fb = descriptor(400, 240, 1600, PixelFormat::Rgba8);
        run(&fb, &memory, &mut backend, &mut record);

        assert_eq!(backend.take_error(), None);
        assert_eq!(backend.texture_size(record.texture), Some((400, 240)));
        assert_eq!(backend.texture_bytes(record.texture).unwrap(), frame.as_slice());
    }

    #[test]
    fn reads_selected_framebuffer() {
        let mut memory = PhysicalMemory::with_fcram_size(0);
        memory.write(VRAM_BASE, &[0xAA; 16]).unwrap();
        memory.write(VRAM_BASE + 0x100000, &[0x55; 16]).unwrap();

        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let mut fb = descriptor(4, 2, 8, PixelFormat::Rgb565);
        fb.active = FramebufferSelect::Secondary;
        run(&fb, &memory, &mut backend, &mut record);

        assert_eq!(backend.texture_bytes(record.texture).unwrap(), &[0x55; 16]);
    }

    #[test]
    fn solid_fill_is_one_pixel() {
        let memory = PhysicalMemory::with_fcram_size(0);
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let mut fb = descriptor(240, 400, 960, PixelFormat::Rgba8);
        fb.color_fill = ColorFill {
            enabled: true,
            r: 255,
            g: 0,
            b: 0,
        };
        run(&fb, &memory, &mut backend, &mut record);

        assert_eq!(record.shape(), Some(SurfaceShape::SolidFill));
        assert_eq!((record.width(), record.height()), (1, 1));
        assert_eq!(backend.texture_size(record.texture), Some((1, 1)));
        assert_eq!(backend.texel(record.texture, 0, 0), Some(0xFF0000));
    }

    #[test]
    #[should_panic(expected = "is not a multiple of 4 bytes per pixel")]
    fn stride_not_whole_pixels_faults() {
        let mut memory = PhysicalMemory::with_fcram_size(0);
        memory.write(VRAM_BASE, &[0x11; 64]).unwrap();
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let fb = descriptor(2, 2, 11, PixelFormat::Rgba8);

        let plan = sync(&mut record, &fb, &mut backend);
        // Fault must happen before anything reaches the storage
        let before = backend.texture_bytes(record.texture).unwrap().to_vec();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ingest(&plan, &fb, &record, &memory, &mut backend)
        }));
        assert_eq!(backend.texture_bytes(record.texture).unwrap(), before.as_slice());
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
    }

    #[test]
    #[should_panic(expected = "is not a multiple of 4")]
    fn unaligned_pixel_stride_faults() {
        // 6 pixels of RGB8 per row
        pixel_stride(18, 3);
    }

    #[test]
    fn unmapped_source_is_skipped() {
        let memory = PhysicalMemory::with_fcram_size(0);
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let mut fb = descriptor(4, 4, 16, PixelFormat::Rgba8);
        fb.address_primary = 0x0800_0000;
        run(&fb, &memory, &mut backend, &mut record);

        assert_eq!(backend.take_error(), None);
        assert!(backend.texture_bytes(record.texture).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn skipped_transfer_leaves_synced_storage() {
        let mut memory = PhysicalMemory::with_fcram_size(0);
        memory.write(VRAM_BASE, &[0x77; 64]).unwrap();
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let mut fb = descriptor(4, 4, 16, PixelFormat::Rgba8);
        run(&fb, &memory, &mut backend, &mut record);

        // Same shape, source gone: the previous frame stays
        fb.address_primary = 0x0800_0000;
        run(&fb, &memory, &mut backend, &mut record);
        assert_eq!(backend.texture_bytes(record.texture).unwrap(), &[0x77; 64]);

        // New shape, source gone: the fresh storage stays zeroed
        fb.height = 2;
        run(&fb, &memory, &mut backend, &mut record);
        assert_eq!(backend.texture_bytes(record.texture).unwrap(), &[0; 32]);
    }

    #[test]
    fn source_running_off_the_end_is_skipped() {
        let mut memory = PhysicalMemory::with_fcram_size(0);
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let mut fb = descriptor(4, 4, 16, PixelFormat::Rgba8);
        // Last row would straddle the end of VRAM
        fb.address_primary = VRAM_BASE + crate::memory::VRAM_SIZE as u32 - 60;
        memory.write(fb.address_primary, &[0xFF; 60]).unwrap();
        run(&fb, &memory, &mut backend, &mut record);

        assert!(backend.texture_bytes(record.texture).unwrap().iter().all(|&b| b == 0));
    }

    proptest! {
        #[test]
        fn rows_come_from_stride_offsets(
            width in 1u32..16,
            height in 1u32..16,
            padding in 0u32..4,
            format_index in 0usize..5,
        ) {
            let format = [
                PixelFormat::Rgba8,
                PixelFormat::Rgb8,
                PixelFormat::Rgb565,
                PixelFormat::Rgb5A1,
                PixelFormat::Rgba4,
            ][format_index];
            let bpp = crate::pixel_format::resolve(format).bytes_per_pixel;
            // Smallest aligned pitch that fits the row, plus some padding
            let row_length = width.div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT + padding * ROW_ALIGNMENT;
            let stride = row_length * bpp;

            let mut memory = PhysicalMemory::with_fcram_size(0);
            let source: Vec<u8> = (0..stride * height).map(|i| (i * 7 % 256) as u8).collect();
            memory.write(VRAM_BASE, &source).unwrap();

            let mut backend = SoftwareBackend::new();
            let mut record = SurfaceRecord::new(backend.create_texture());
            let fb = descriptor(width, height, stride, format);
            run(&fb, &memory, &mut backend, &mut record);

            let row_bytes = (width * bpp) as usize;
            let stored = backend.texture_bytes(record.texture).unwrap();
            prop_assert_eq!(stored.len(), row_bytes * height as usize);
            for k in 0..height as usize {
                let expected = &source[k * stride as usize..][..row_bytes];
                prop_assert_eq!(&stored[k * row_bytes..][..row_bytes], expected);
            }
        }
    }
}
