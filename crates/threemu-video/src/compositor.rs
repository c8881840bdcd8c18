//! Drawing both screens into the output viewport.

use crate::backend::{GraphicsBackend, ScreenRectVertex, TextureHandle};
use crate::layout::{FramebufferLayout, Rect};
use crate::screen::{PerScreen, Screen};
use tracing::trace;

/// 1:1 pixel orthographic projection with (0, 0) in the top-left corner and
/// (width, height) in the bottom-right one.
///
/// Only the affine part is kept, as a column-major 3x2 matrix; the last row is
/// implicitly [0, 0, 1].
pub fn orthographic_matrix(width: f32, height: f32) -> [f32; 6] {
    [
        2.0 / width,
        0.0,
        0.0,
        -2.0 / height,
        -1.0,
        1.0,
    ]
}

/// Vertices of a screen rectangle, as a triangle strip.
///
/// The framebuffers are stored rotated 90 degrees from how the panels are
/// viewed, so the texture coordinates are rotated instead of the geometry:
/// moving right walks down the texture rows, moving down walks back across
/// the columns.
pub fn rotated_screen_vertices(rect: &Rect) -> [ScreenRectVertex; 4] {
    let (x, y) = (rect.left as f32, rect.top as f32);
    let (w, h) = (rect.width as f32, rect.height as f32);
    [
        ScreenRectVertex::new(x, y, 1.0, 0.0),
        ScreenRectVertex::new(x + w, y, 1.0, 1.0),
        ScreenRectVertex::new(x, y + h, 0.0, 0.0),
        ScreenRectVertex::new(x + w, y + h, 0.0, 1.0),
    ]
}

fn destination(layout: &FramebufferLayout, screen: Screen) -> &Rect {
    match screen {
        Screen::Top => &layout.top_screen,
        Screen::Bottom => &layout.bottom_screen,
    }
}

/// Clear the viewport and draw both screens, top first.
///
/// Both rectangles are always drawn; a screen in solid-fill mode just has a
/// 1x1 texture stretched over its rectangle.
pub fn present<B>(backend: &mut B, textures: &PerScreen<TextureHandle>, layout: &FramebufferLayout)
where
    B: GraphicsBackend + ?Sized,
{
    backend.set_viewport(layout.width, layout.height);
    backend.clear();

    // A zero-sized window would divide by zero; nothing is visible anyway.
    let projection = orthographic_matrix(layout.width.max(1) as f32, layout.height.max(1) as f32);
    backend.set_projection(&projection);

    for screen in Screen::ALL {
        let rect = destination(layout, screen);
        trace!("Drawing {} screen at {:?}", screen.name(), rect);
        backend.draw_quad(textures[screen], &rotated_screen_vertices(rect));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Frame, UploadRegion};
    use crate::pixel_format::{FormatInfo, SOLID_FILL_FORMAT};
    use crate::software::SoftwareBackend;

    /// Records the calls the compositor makes
    #[derive(Default)]
    struct RecordingBackend {
        calls: Vec<String>,
        draws: Vec<(TextureHandle, [ScreenRectVertex; 4])>,
        projection: Option<[f32; 6]>,
    }

    impl GraphicsBackend for RecordingBackend {
        fn set_clear_color(&mut self, _color: [f32; 3]) {}

        fn create_texture(&mut self) -> TextureHandle {
            TextureHandle(self.calls.len() as u32 + 1)
        }

        fn delete_texture(&mut self, _texture: TextureHandle) {}

        fn allocate_storage(&mut self, _: TextureHandle, _: u32, _: u32, _: &FormatInfo) {
            self.calls.push("allocate_storage".into());
        }

        fn upload(&mut self, _: TextureHandle, _: UploadRegion, _: &FormatInfo, _: &[u8]) {
            self.calls.push("upload".into());
        }

        fn set_viewport(&mut self, width: u32, height: u32) {
            self.calls.push(format!("set_viewport {width}x{height}"));
        }

        fn clear(&mut self) {
            self.calls.push("clear".into());
        }

        fn set_projection(&mut self, matrix: &[f32; 6]) {
            self.calls.push("set_projection".into());
            self.projection = Some(*matrix);
        }

        fn draw_quad(&mut self, texture: TextureHandle, vertices: &[ScreenRectVertex; 4]) {
            self.calls.push("draw_quad".into());
            self.draws.push((texture, *vertices));
        }

        fn frame(&self) -> Frame<'_> {
            Frame {
                pixels: &[],
                width: 0,
                height: 0,
            }
        }
    }

    fn apply(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
        (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
    }

    #[test]
    fn projection_maps_corners_to_clip_space() {
        let m = orthographic_matrix(400.0, 480.0);
        let cases = [
            ((0.0, 0.0), (-1.0, 1.0)),
            ((400.0, 480.0), (1.0, -1.0)),
            ((200.0, 240.0), (0.0, 0.0)),
            ((0.0, 480.0), (-1.0, -1.0)),
        ];
        for ((x, y), (cx, cy)) in cases {
            let (ax, ay) = apply(&m, x, y);
            assert!((ax - cx).abs() < 1e-6 && (ay - cy).abs() < 1e-6, "({x}, {y}) -> ({ax}, {ay})");
        }
    }

    #[test]
    fn draws_both_screens_in_order() {
        let mut backend = RecordingBackend::default();
        let textures = PerScreen::new(TextureHandle(1), TextureHandle(2));
        let layout = FramebufferLayout::default_layout(400, 480);
        present(&mut backend, &textures, &layout);

        assert_eq!(
            backend.calls,
            vec!["set_viewport 400x480", "clear", "set_projection", "draw_quad", "draw_quad"]
        );
        assert_eq!(backend.draws[0].0, TextureHandle(1));
        assert_eq!(backend.draws[1].0, TextureHandle(2));
        assert_eq!(backend.draws[0].1, rotated_screen_vertices(&layout.top_screen));
        assert_eq!(backend.draws[1].1, rotated_screen_vertices(&layout.bottom_screen));
    }

    #[test]
    fn rectangle_spans_its_slot() {
        let vertices = rotated_screen_vertices(&Rect::new(40, 240, 320, 240));
        let positions: Vec<_> = vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[40.0, 240.0], [360.0, 240.0], [40.0, 480.0], [360.0, 480.0]]
        );
    }

    #[test]
    fn fill_texture_covers_whole_slot() {
        let mut backend = SoftwareBackend::new();
        backend.set_clear_color([0.0, 0.0, 0.0]);
        let textures = PerScreen::from_fn(|_| backend.create_texture());
        for (color, texture) in [([255u8, 0, 0], textures.top), ([0u8, 0, 255], textures.bottom)] {
            backend.allocate_storage(texture, 1, 1, &SOLID_FILL_FORMAT);
            backend.upload(texture, UploadRegion::packed(1, 1), &SOLID_FILL_FORMAT, &color);
        }

        let layout = FramebufferLayout::default_layout(400, 480);
        present(&mut backend, &textures, &layout);
        assert_eq!(backend.draw_calls(), 2);

        for y in 0..480 {
            for x in 0..400 {
                let in_top = y < 240;
                let in_bottom = y >= 240 && (40..360).contains(&x);
                let expected = match (in_top, in_bottom) {
                    (true, _) => 0xFF0000,
                    (_, true) => 0x0000FF,
                    _ => 0x000000,
                };
                assert_eq!(backend.pixel(x, y), Some(expected), "pixel ({x}, {y})");
            }
        }
    }
}
