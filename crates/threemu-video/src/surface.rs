//! Per-screen backing storage and the decision of when to reallocate it.
//!
//! Every screen owns exactly one texture for the whole session. Its storage is
//! reallocated only when the shape the guest asks for differs from the shape
//! it currently has; otherwise frames just overwrite it in place.

use crate::backend::{GraphicsBackend, TextureHandle};
use crate::descriptor::FramebufferDescriptor;
use crate::pixel_format::{self, FormatInfo, PixelFormat, SOLID_FILL_FORMAT};
use crate::screen::{PerScreen, Screen};
use tracing::debug;

/// Allocated shape of a surface's backing storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceShape {
    /// 1x1 constant color
    SolidFill,
    /// Framebuffer-sized raster
    Raster {
        width: u32,
        height: u32,
        format: PixelFormat,
    },
}

impl SurfaceShape {
    /// Shape a descriptor asks for
    pub fn of(descriptor: &FramebufferDescriptor) -> Self {
        if descriptor.color_fill.enabled {
            SurfaceShape::SolidFill
        } else {
            SurfaceShape::Raster {
                width: descriptor.width,
                height: descriptor.height,
                format: descriptor.format,
            }
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            SurfaceShape::SolidFill => 1,
            SurfaceShape::Raster { width, .. } => *width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            SurfaceShape::SolidFill => 1,
            SurfaceShape::Raster { height, .. } => *height,
        }
    }
}

/// Backing storage of one screen and the shape it was last allocated with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceRecord {
    pub texture: TextureHandle,
    /// `None` until the first allocation
    shape: Option<SurfaceShape>,
}

impl SurfaceRecord {
    /// Record for a freshly created texture; the first sync always allocates
    pub fn new(texture: TextureHandle) -> Self {
        Self {
            texture,
            shape: None,
        }
    }

    pub fn shape(&self) -> Option<SurfaceShape> {
        self.shape
    }

    pub fn width(&self) -> u32 {
        self.shape.map_or(0, |s| s.width())
    }

    pub fn height(&self) -> u32 {
        self.shape.map_or(0, |s| s.height())
    }

    /// Guest color format the storage holds, if it holds a raster
    pub fn format(&self) -> Option<PixelFormat> {
        match self.shape {
            Some(SurfaceShape::Raster { format, .. }) => Some(format),
            _ => None,
        }
    }
}

/// Outcome of comparing a record against a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeCheck {
    pub current: Option<SurfaceShape>,
    pub wanted: SurfaceShape,
}

impl ShapeCheck {
    pub fn needs_reallocation(&self) -> bool {
        self.current != Some(self.wanted)
    }
}

/// Compare without touching anything
pub fn check_shape(record: &SurfaceRecord, descriptor: &FramebufferDescriptor) -> ShapeCheck {
    ShapeCheck {
        current: record.shape,
        wanted: SurfaceShape::of(descriptor),
    }
}

/// What the ingest step has to write after a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPlan {
    /// Upload one pixel of this color
    Fill { color: [u8; 3] },
    /// Upload a `width` x `height` raster of this format
    Raster {
        width: u32,
        height: u32,
        format: FormatInfo,
    },
}

/// Bring a record's storage in line with a descriptor.
///
/// Storage is reallocated (old contents discarded) only if the shape differs,
/// and the record is updated in the same step. After this returns the storage
/// has exactly the returned plan's dimensions and format.
///
/// # Panics
///
/// Panics if a raster descriptor uses an unsupported pixel format.
pub fn sync<B>(record: &mut SurfaceRecord, descriptor: &FramebufferDescriptor, backend: &mut B) -> TransferPlan
where
    B: GraphicsBackend + ?Sized,
{
    let check = check_shape(record, descriptor);
    let plan = match check.wanted {
        SurfaceShape::SolidFill => TransferPlan::Fill {
            color: descriptor.color_fill.rgb(),
        },
        SurfaceShape::Raster {
            width,
            height,
            format,
        } => TransferPlan::Raster {
            width,
            height,
            format: pixel_format::resolve(format),
        },
    };

    if check.needs_reallocation() {
        let (width, height, format) = match plan {
            TransferPlan::Fill { .. } => (1, 1, SOLID_FILL_FORMAT),
            TransferPlan::Raster {
                width,
                height,
                format,
            } => (width, height, format),
        };
        debug!(
            "Reallocating surface {:?}: {:?} -> {:?}",
            record.texture, check.current, check.wanted
        );
        backend.allocate_storage(record.texture, width, height, &format);
        record.shape = Some(check.wanted);
    }

    plan
}

/// One surface record per screen
#[derive(Debug)]
pub struct SurfaceCache {
    records: PerScreen<SurfaceRecord>,
}

impl SurfaceCache {
    /// Create the per-screen textures. Storage is allocated lazily by the first
    /// [`sync`], once the framebuffer shape is known.
    pub fn new<B: GraphicsBackend + ?Sized>(backend: &mut B) -> Self {
        Self {
            records: PerScreen::from_fn(|_| SurfaceRecord::new(backend.create_texture())),
        }
    }

    pub fn get(&self, screen: Screen) -> &SurfaceRecord {
        &self.records[screen]
    }

    pub fn get_mut(&mut self, screen: Screen) -> &mut SurfaceRecord {
        &mut self.records[screen]
    }

    pub fn textures(&self) -> PerScreen<TextureHandle> {
        PerScreen::from_fn(|screen| self.records[screen].texture)
    }

    /// Delete the textures
    pub fn release<B: GraphicsBackend + ?Sized>(self, backend: &mut B) {
        for (_, record) in self.records.iter() {
            backend.delete_texture(record.texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColorFill, FramebufferSelect};
    use crate::software::SoftwareBackend;

    fn descriptor(width: u32, height: u32, format: PixelFormat) -> FramebufferDescriptor {
        FramebufferDescriptor {
            address_primary: 0x18000000,
            address_secondary: 0x18000000,
            active: FramebufferSelect::Primary,
            width,
            height,
            stride: width * 4,
            format,
            color_fill: ColorFill::default(),
        }
    }

    #[test]
    fn fresh_record_needs_allocation() {
        let record = SurfaceRecord::new(TextureHandle(1));
        let check = check_shape(&record, &descriptor(240, 400, PixelFormat::Rgb8));
        assert!(check.needs_reallocation());
        assert_eq!(check.current, None);
        assert_eq!(record.width(), 0);
    }

    #[test]
    fn sync_is_idempotent() {
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let fb = descriptor(240, 400, PixelFormat::Rgba8);

        let first = sync(&mut record, &fb, &mut backend);
        let generation = backend.storage_generation(record.texture);
        let second = sync(&mut record, &fb, &mut backend);

        assert_eq!(first, second);
        assert_eq!(backend.allocations(), 1);
        assert_eq!(backend.storage_generation(record.texture), generation);
        assert!(!check_shape(&record, &fb).needs_reallocation());
    }

    #[test]
    fn any_shape_change_reallocates() {
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());

        sync(&mut record, &descriptor(240, 400, PixelFormat::Rgba8), &mut backend);
        sync(&mut record, &descriptor(240, 320, PixelFormat::Rgba8), &mut backend);
        sync(&mut record, &descriptor(240, 320, PixelFormat::Rgb565), &mut backend);
        sync(&mut record, &descriptor(200, 320, PixelFormat::Rgb565), &mut backend);

        assert_eq!(backend.allocations(), 4);
        assert_eq!(backend.texture_size(record.texture), Some((200, 320)));
        assert_eq!(record.format(), Some(PixelFormat::Rgb565));
        assert_eq!((record.width(), record.height()), (200, 320));
    }

    #[test]
    fn fill_then_raster_reallocates() {
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let raster = descriptor(1, 1, PixelFormat::Rgb8);
        let mut fill = raster;
        fill.color_fill = ColorFill {
            enabled: true,
            r: 1,
            g: 2,
            b: 3,
        };

        assert_eq!(
            sync(&mut record, &fill, &mut backend),
            TransferPlan::Fill { color: [1, 2, 3] }
        );
        assert_eq!(record.shape(), Some(SurfaceShape::SolidFill));
        // A 1x1 raster in the fill's own dimensions is still a different shape
        sync(&mut record, &raster, &mut backend);

        assert_eq!(backend.allocations(), 2);
        assert_eq!(
            backend.texture_format(record.texture),
            Some(pixel_format::resolve(PixelFormat::Rgb8))
        );
    }

    #[test]
    fn fill_ignores_unknown_format() {
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        let mut fb = descriptor(240, 400, PixelFormat::Unknown(7));
        fb.color_fill.enabled = true;

        sync(&mut record, &fb, &mut backend);
        assert_eq!(backend.texture_size(record.texture), Some((1, 1)));
    }

    #[test]
    #[should_panic(expected = "unimplemented framebuffer pixel format")]
    fn raster_with_unknown_format_faults() {
        let mut backend = SoftwareBackend::new();
        let mut record = SurfaceRecord::new(backend.create_texture());
        sync(&mut record, &descriptor(240, 400, PixelFormat::Unknown(5)), &mut backend);
    }

    #[test]
    fn cache_owns_one_texture_per_screen() {
        let mut backend = SoftwareBackend::new();
        let cache = SurfaceCache::new(&mut backend);
        let textures = cache.textures();
        assert_ne!(textures.top, textures.bottom);
        assert_eq!(backend.live_textures(), 2);

        cache.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }
}
