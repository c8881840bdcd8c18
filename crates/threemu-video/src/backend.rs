//! Host graphics backend abstraction.
//!
//! The compositor only needs a handful of capabilities from the host:
//! allocate texture storage, upload a sub-region with a row pitch, clear, set
//! a projection and draw a textured quad. Errors follow the "poll after every
//! call" model; [`Diagnosed`] turns that into logging without threading checks
//! through the compositor itself.

use crate::pixel_format::FormatInfo;
use std::panic::Location;
use thiserror::Error;
use tracing::error;

/// Opaque identifier of one texture owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Vertex of a screen rectangle: viewport position and texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRectVertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

impl ScreenRectVertex {
    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            tex_coord: [u, v],
        }
    }
}

/// Sub-region upload starting at texel (0, 0).
///
/// `row_length` is the distance between source rows in pixels and may exceed
/// `width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRegion {
    pub width: u32,
    pub height: u32,
    pub row_length: u32,
}

impl UploadRegion {
    /// Region whose source rows are tightly packed
    pub fn packed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            row_length: width,
        }
    }

    /// Number of source bytes the region spans
    pub fn source_len(&self, bytes_per_pixel: u32) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let bpp = bytes_per_pixel as usize;
        (self.height as usize - 1) * self.row_length as usize * bpp + self.width as usize * bpp
    }
}

/// Read-only view of the composited image, 0x00RRGGBB per pixel
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub pixels: &'a [u32],
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("invalid value")]
    InvalidValue,
    #[error("invalid operation")]
    InvalidOperation,
    #[error("out of memory")]
    OutOfMemory,
}

/// Capability set the compositor draws through
pub trait GraphicsBackend {
    /// Color used by [`GraphicsBackend::clear`]
    fn set_clear_color(&mut self, color: [f32; 3]);

    fn create_texture(&mut self) -> TextureHandle;

    fn delete_texture(&mut self, texture: TextureHandle);

    /// (Re)allocate storage, discarding the previous contents
    fn allocate_storage(&mut self, texture: TextureHandle, width: u32, height: u32, format: &FormatInfo);

    /// Overwrite the top-left `region` of the texture from `data`
    fn upload(&mut self, texture: TextureHandle, region: UploadRegion, format: &FormatInfo, data: &[u8]);

    fn set_viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    /// 3x2 column-major affine transform from viewport pixels to clip space
    fn set_projection(&mut self, matrix: &[f32; 6]);

    /// Draw a textured quad given as a four-vertex triangle strip
    fn draw_quad(&mut self, texture: TextureHandle, vertices: &[ScreenRectVertex; 4]);

    /// The image produced by the draws since the last clear
    fn frame(&self) -> Frame<'_>;

    /// Return and reset the oldest unreported error
    fn take_error(&mut self) -> Option<BackendError> {
        None
    }
}

/// Receiver for backend errors detected after a call
pub trait DiagnosticHook {
    fn report(&mut self, call: &'static str, location: &'static Location<'static>, error: BackendError);
}

impl<F> DiagnosticHook for F
where
    F: FnMut(&'static str, &'static Location<'static>, BackendError),
{
    fn report(&mut self, call: &'static str, location: &'static Location<'static>, error: BackendError) {
        self(call, location, error)
    }
}

/// Reports backend errors through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticHook for LogDiagnostics {
    fn report(&mut self, call: &'static str, location: &'static Location<'static>, error: BackendError) {
        error!(
            "Backend error in {} @ line {} ({}): {}",
            location.file(),
            location.line(),
            call,
            error
        );
    }
}

/// Backend decorator that checks for errors after every call.
///
/// Errors are handed to the hook and otherwise ignored.
pub struct Diagnosed<B, H> {
    inner: B,
    hook: H,
}

impl<B: GraphicsBackend, H: DiagnosticHook> Diagnosed<B, H> {
    pub fn new(inner: B, hook: H) -> Self {
        Self { inner, hook }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    #[track_caller]
    fn check(&mut self, call: &'static str) {
        while let Some(error) = self.inner.take_error() {
            self.hook.report(call, Location::caller(), error);
        }
    }
}

impl<B: GraphicsBackend, H: DiagnosticHook> GraphicsBackend for Diagnosed<B, H> {
    #[track_caller]
    fn set_clear_color(&mut self, color: [f32; 3]) {
        self.inner.set_clear_color(color);
        self.check("set_clear_color");
    }

    #[track_caller]
    fn create_texture(&mut self) -> TextureHandle {
        let texture = self.inner.create_texture();
        self.check("create_texture");
        texture
    }

    #[track_caller]
    fn delete_texture(&mut self, texture: TextureHandle) {
        self.inner.delete_texture(texture);
        self.check("delete_texture");
    }

    #[track_caller]
    fn allocate_storage(&mut self, texture: TextureHandle, width: u32, height: u32, format: &FormatInfo) {
        self.inner.allocate_storage(texture, width, height, format);
        self.check("allocate_storage");
    }

    #[track_caller]
    fn upload(&mut self, texture: TextureHandle, region: UploadRegion, format: &FormatInfo, data: &[u8]) {
        self.inner.upload(texture, region, format, data);
        self.check("upload");
    }

    #[track_caller]
    fn set_viewport(&mut self, width: u32, height: u32) {
        self.inner.set_viewport(width, height);
        self.check("set_viewport");
    }

    #[track_caller]
    fn clear(&mut self) {
        self.inner.clear();
        self.check("clear");
    }

    #[track_caller]
    fn set_projection(&mut self, matrix: &[f32; 6]) {
        self.inner.set_projection(matrix);
        self.check("set_projection");
    }

    #[track_caller]
    fn draw_quad(&mut self, texture: TextureHandle, vertices: &[ScreenRectVertex; 4]) {
        self.inner.draw_quad(texture, vertices);
        self.check("draw_quad");
    }

    fn frame(&self) -> Frame<'_> {
        self.inner.frame()
    }

    // Errors are consumed by the hook after each call.
    fn take_error(&mut self) -> Option<BackendError> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::SOLID_FILL_FORMAT;
    use crate::software::SoftwareBackend;

    #[test]
    fn region_source_len_honors_row_length() {
        let region = UploadRegion {
            width: 3,
            height: 4,
            row_length: 8,
        };
        // Three full pitches plus one tight final row
        assert_eq!(region.source_len(2), 3 * 8 * 2 + 3 * 2);
        assert_eq!(UploadRegion::packed(0, 10).source_len(4), 0);
    }

    #[test]
    fn diagnosed_reports_errors_without_changing_control_flow() {
        let mut reports = Vec::new();
        {
            let hook = |call: &'static str, location: &'static Location<'static>, error: BackendError| {
                reports.push((call, location.file(), error));
            };
            let mut backend = Diagnosed::new(SoftwareBackend::new(), hook);

            // Unknown texture handle
            backend.allocate_storage(TextureHandle(99), 1, 1, &SOLID_FILL_FORMAT);

            let texture = backend.create_texture();
            backend.allocate_storage(texture, 1, 1, &SOLID_FILL_FORMAT);
            backend.upload(texture, UploadRegion::packed(1, 1), &SOLID_FILL_FORMAT, &[1, 2, 3]);

            assert_eq!(backend.take_error(), None);
            assert_eq!(backend.inner().texture_bytes(texture), Some(&[1u8, 2, 3][..]));
        }

        assert_eq!(reports.len(), 1);
        let (call, file, error) = reports[0];
        assert_eq!(call, "allocate_storage");
        assert!(file.ends_with("backend.rs"), "{file}");
        assert_eq!(error, BackendError::InvalidValue);
    }
}
