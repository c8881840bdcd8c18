//! CPU implementation of [`GraphicsBackend`].
//!
//! Textures keep the bytes exactly as they were transferred (tightly packed,
//! in the transfer format) and are decoded when sampled. Drawing rasterizes
//! axis-aligned textured rectangles, which is all the compositor ever submits.

use crate::backend::{BackendError, Frame, GraphicsBackend, ScreenRectVertex, TextureHandle, UploadRegion};
use crate::pixel_format::{FormatInfo, TransferFormat, TransferType};
use std::collections::HashMap;
use tracing::trace;

/// Identity projection: clip space in, clip space out
const IDENTITY_PROJECTION: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Texel returned when sampling a texture without storage
const INCOMPLETE_TEXEL: u32 = 0x000000;

/// Largest texture edge accepted by default, like `GL_MAX_TEXTURE_SIZE`
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 4096;

/// Texture filtering used when a quad is scaled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    /// Bilinear interpolation between the four closest texels
    #[default]
    Linear,
}

#[derive(Debug, Default)]
struct Texture {
    width: u32,
    height: u32,
    format: Option<FormatInfo>,
    bytes: Vec<u8>,
    generation: u64,
}

impl Texture {
    fn texel(&self, x: u32, y: u32) -> Option<u32> {
        let format = self.format.as_ref()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = format.bytes_per_pixel as usize;
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        Some(decode_texel(format, &self.bytes[offset..offset + bpp]))
    }

    /// Look up normalized coordinates, clamped to the edge
    fn sample(&self, u: f32, v: f32, filter: Filter) -> u32 {
        if self.width == 0 || self.height == 0 || self.format.is_none() {
            return INCOMPLETE_TEXEL;
        }
        let clamp = |c: f32, size: u32| (c.max(0.0) as u32).min(size - 1);
        let fetch = |x: u32, y: u32| self.texel(x, y).unwrap_or(INCOMPLETE_TEXEL);

        match filter {
            Filter::Nearest => fetch(
                clamp((u * self.width as f32).floor(), self.width),
                clamp((v * self.height as f32).floor(), self.height),
            ),
            Filter::Linear => {
                // Texel centers sit at half-integer coordinates
                let x = u * self.width as f32 - 0.5;
                let y = v * self.height as f32 - 0.5;
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (xa, xb) = (clamp(x0, self.width), clamp(x0 + 1.0, self.width));
                let (ya, yb) = (clamp(y0, self.height), clamp(y0 + 1.0, self.height));

                let taps = [
                    (fetch(xa, ya), (1.0 - fx) * (1.0 - fy)),
                    (fetch(xb, ya), fx * (1.0 - fy)),
                    (fetch(xa, yb), (1.0 - fx) * fy),
                    (fetch(xb, yb), fx * fy),
                ];
                let channel = |shift: u32| {
                    let sum: f32 = taps
                        .iter()
                        .map(|&(texel, weight)| ((texel >> shift) & 0xFF) as f32 * weight)
                        .sum();
                    sum.round().clamp(0.0, 255.0) as u32
                };
                (channel(16) << 16) | (channel(8) << 8) | channel(0)
            }
        }
    }
}

/// Zeroed storage for a `width` x `height` texture, or the error a GL driver
/// would raise for it
fn zeroed_storage(width: u32, height: u32, bytes_per_pixel: u32, max_size: u32) -> Result<Vec<u8>, BackendError> {
    if width > max_size || height > max_size {
        return Err(BackendError::InvalidValue);
    }
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|texels| texels.checked_mul(bytes_per_pixel as usize))
        .ok_or(BackendError::OutOfMemory)?;

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| BackendError::OutOfMemory)?;
    bytes.resize(len, 0);
    Ok(bytes)
}

/// Software rasterizer backend
pub struct SoftwareBackend {
    textures: HashMap<u32, Texture>,
    next_handle: u32,
    clear_color: u32,
    projection: [f32; 6],
    canvas: Vec<u32>,
    viewport_width: u32,
    viewport_height: u32,
    error: Option<BackendError>,
    allocations: u64,
    draw_calls: u64,
    max_texture_size: u32,
    filter: Filter,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            // Handle 0 is never valid
            next_handle: 1,
            clear_color: 0,
            projection: IDENTITY_PROJECTION,
            canvas: Vec::new(),
            viewport_width: 0,
            viewport_height: 0,
            error: None,
            allocations: 0,
            draw_calls: 0,
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
            filter: Filter::default(),
        }
    }

    /// Backend that refuses textures with an edge longer than `max_size`
    pub fn with_max_texture_size(max_size: u32) -> Self {
        Self {
            max_texture_size: max_size,
            ..Self::new()
        }
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Total number of storage allocations performed
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Total number of quads drawn
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Allocated size of a texture
    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&texture.0).map(|t| (t.width, t.height))
    }

    pub fn texture_format(&self, texture: TextureHandle) -> Option<FormatInfo> {
        self.textures.get(&texture.0).and_then(|t| t.format)
    }

    /// Raw texel bytes, rows tightly packed
    pub fn texture_bytes(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.textures.get(&texture.0).map(|t| t.bytes.as_slice())
    }

    /// Incremented on every storage allocation of this texture
    pub fn storage_generation(&self, texture: TextureHandle) -> Option<u64> {
        self.textures.get(&texture.0).map(|t| t.generation)
    }

    /// Decoded texel as 0x00RRGGBB
    pub fn texel(&self, texture: TextureHandle, x: u32, y: u32) -> Option<u32> {
        self.textures.get(&texture.0)?.texel(x, y)
    }

    /// Canvas pixel as 0x00RRGGBB
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.viewport_width || y >= self.viewport_height {
            return None;
        }
        self.canvas
            .get(y as usize * self.viewport_width as usize + x as usize)
            .copied()
    }

    fn set_error(&mut self, error: BackendError) {
        // Like a GL error flag, the first error sticks until it is read
        self.error.get_or_insert(error);
    }

    /// Map a vertex position through the projection into window pixels
    fn to_window(&self, position: [f32; 2]) -> (f32, f32) {
        let m = &self.projection;
        let [x, y] = position;
        let clip_x = m[0] * x + m[2] * y + m[4];
        let clip_y = m[1] * x + m[3] * y + m[5];
        (
            (clip_x + 1.0) * 0.5 * self.viewport_width as f32,
            (1.0 - clip_y) * 0.5 * self.viewport_height as f32,
        )
    }
}

impl GraphicsBackend for SoftwareBackend {
    fn set_clear_color(&mut self, color: [f32; 3]) {
        let [r, g, b] = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u32);
        self.clear_color = (r << 16) | (g << 8) | b;
    }

    fn create_texture(&mut self) -> TextureHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.textures.insert(handle, Texture::default());
        TextureHandle(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.0).is_none() {
            self.set_error(BackendError::InvalidValue);
        }
    }

    fn allocate_storage(&mut self, texture: TextureHandle, width: u32, height: u32, format: &FormatInfo) {
        let Some(entry) = self.textures.get_mut(&texture.0) else {
            self.set_error(BackendError::InvalidValue);
            return;
        };

        match zeroed_storage(width, height, format.bytes_per_pixel, self.max_texture_size) {
            Ok(bytes) => {
                entry.width = width;
                entry.height = height;
                entry.format = Some(*format);
                entry.bytes = bytes;
                entry.generation += 1;
                self.allocations += 1;
            }
            Err(error) => {
                // The previous storage is gone either way; the texture is left incomplete
                *entry = Texture {
                    generation: entry.generation,
                    ..Texture::default()
                };
                self.set_error(error);
            }
        }
    }

    fn upload(&mut self, texture: TextureHandle, region: UploadRegion, format: &FormatInfo, data: &[u8]) {
        let Some(entry) = self.textures.get_mut(&texture.0) else {
            self.set_error(BackendError::InvalidValue);
            return;
        };

        let error = match entry.format {
            None => Some(BackendError::InvalidOperation),
            Some(stored) if stored != *format => Some(BackendError::InvalidOperation),
            _ if region.width > entry.width || region.height > entry.height => {
                Some(BackendError::InvalidValue)
            }
            _ if region.row_length < region.width => Some(BackendError::InvalidValue),
            _ if data.len() < region.source_len(format.bytes_per_pixel) => {
                Some(BackendError::InvalidOperation)
            }
            _ => None,
        };
        if let Some(error) = error {
            self.set_error(error);
            return;
        }

        let bpp = format.bytes_per_pixel as usize;
        let row_bytes = region.width as usize * bpp;
        let src_pitch = region.row_length as usize * bpp;
        let dst_pitch = entry.width as usize * bpp;
        for row in 0..region.height as usize {
            let src = &data[row * src_pitch..row * src_pitch + row_bytes];
            entry.bytes[row * dst_pitch..row * dst_pitch + row_bytes].copy_from_slice(src);
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if (width, height) != (self.viewport_width, self.viewport_height) {
            trace!("Software viewport resized to {}x{}", width, height);
            self.viewport_width = width;
            self.viewport_height = height;
            self.canvas = vec![0; width as usize * height as usize];
        }
    }

    fn clear(&mut self) {
        self.canvas.fill(self.clear_color);
    }

    fn set_projection(&mut self, matrix: &[f32; 6]) {
        self.projection = *matrix;
    }

    fn draw_quad(&mut self, texture: TextureHandle, vertices: &[ScreenRectVertex; 4]) {
        if !self.textures.contains_key(&texture.0) {
            self.set_error(BackendError::InvalidValue);
            return;
        }
        self.draw_calls += 1;

        let corners = vertices.map(|v| (self.to_window(v.position), v.tex_coord));
        let x0 = corners.iter().map(|((x, _), _)| *x).fold(f32::INFINITY, f32::min);
        let x1 = corners.iter().map(|((x, _), _)| *x).fold(f32::NEG_INFINITY, f32::max);
        let y0 = corners.iter().map(|((_, y), _)| *y).fold(f32::INFINITY, f32::min);
        let y1 = corners.iter().map(|((_, y), _)| *y).fold(f32::NEG_INFINITY, f32::max);
        if !(x1 - x0 > 0.0 && y1 - y0 > 0.0) {
            return;
        }

        // Texture coordinate at each corner: [top-left, top-right, bottom-left, bottom-right]
        let (mid_x, mid_y) = ((x0 + x1) * 0.5, (y0 + y1) * 0.5);
        let mut uv = [[0.0f32; 2]; 4];
        for ((x, y), tex_coord) in corners {
            let corner = usize::from(x > mid_x) | (usize::from(y > mid_y) << 1);
            uv[corner] = tex_coord;
        }

        // Pixels whose centers fall inside the rectangle
        let span = |lo: f32, hi: f32, limit: u32| {
            let first = (lo - 0.5).ceil().max(0.0) as u32;
            let last = ((hi - 0.5).ceil().max(0.0) as u32).min(limit);
            first.min(last)..last
        };
        let lerp = |a: [f32; 2], b: [f32; 2], t: f32| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t];

        let filter = self.filter;
        let Some(source) = self.textures.get(&texture.0) else {
            return;
        };
        let width = self.viewport_width as usize;
        for py in span(y0, y1, self.viewport_height) {
            let t = (py as f32 + 0.5 - y0) / (y1 - y0);
            let left = lerp(uv[0], uv[2], t);
            let right = lerp(uv[1], uv[3], t);
            for px in span(x0, x1, self.viewport_width) {
                let s = (px as f32 + 0.5 - x0) / (x1 - x0);
                let [u, v] = lerp(left, right, s);
                self.canvas[py as usize * width + px as usize] = source.sample(u, v, filter);
            }
        }
    }

    fn frame(&self) -> Frame<'_> {
        Frame {
            pixels: &self.canvas,
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    fn take_error(&mut self) -> Option<BackendError> {
        self.error.take()
    }
}

/// Decode one transferred pixel to 0x00RRGGBB. Alpha is dropped; screens are
/// composited opaque.
pub fn decode_texel(format: &FormatInfo, bytes: &[u8]) -> u32 {
    let expand5 = |c: u16| u32::from((c << 3) | (c >> 2)) & 0xFF;
    let expand6 = |c: u16| u32::from((c << 2) | (c >> 4)) & 0xFF;
    let expand4 = |c: u16| u32::from(c) * 0x11;
    let half = || u16::from_le_bytes([bytes[0], bytes[1]]);

    let (r, g, b) = match (format.transfer_type, format.transfer_format) {
        (TransferType::UnsignedInt8888, _) => {
            let v = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (v >> 24, (v >> 16) & 0xFF, (v >> 8) & 0xFF)
        }
        (TransferType::UnsignedByte, TransferFormat::Bgr) => {
            (u32::from(bytes[2]), u32::from(bytes[1]), u32::from(bytes[0]))
        }
        (TransferType::UnsignedByte, TransferFormat::Rgb | TransferFormat::Rgba) => {
            (u32::from(bytes[0]), u32::from(bytes[1]), u32::from(bytes[2]))
        }
        (TransferType::UnsignedShort565, _) => {
            let v = half();
            (expand5(v >> 11), expand6((v >> 5) & 0x3F), expand5(v & 0x1F))
        }
        (TransferType::UnsignedShort5551, _) => {
            let v = half();
            (expand5(v >> 11), expand5((v >> 6) & 0x1F), expand5((v >> 1) & 0x1F))
        }
        (TransferType::UnsignedShort4444, _) => {
            let v = half();
            (expand4(v >> 12), expand4((v >> 8) & 0xF), expand4((v >> 4) & 0xF))
        }
    };

    (r << 16) | (g << 8) | b
}
