//! Placement of the two screens inside the output viewport.

use oxidiz3ds_hw::specs::display;

/// Native width of the stacked arrangement (the wider top screen)
pub const NATIVE_WIDTH: u32 = if display::TOP_WIDTH > display::BOTTOM_WIDTH {
    display::TOP_WIDTH
} else {
    display::BOTTOM_WIDTH
};

/// Native height of the stacked arrangement
pub const NATIVE_HEIGHT: u32 = display::TOP_HEIGHT + display::BOTTOM_HEIGHT;

/// Destination rectangle in viewport pixels, top-left origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// Output viewport size and where each screen goes in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferLayout {
    pub width: u32,
    pub height: u32,
    pub top_screen: Rect,
    pub bottom_screen: Rect,
}

impl FramebufferLayout {
    /// Top screen above bottom screen, scaled uniformly to fit the viewport
    /// and centered in it.
    pub fn default_layout(width: u32, height: u32) -> Self {
        let scale = (width as f32 / NATIVE_WIDTH as f32).min(height as f32 / NATIVE_HEIGHT as f32);
        let scaled = |v: u32| (v as f32 * scale).round() as u32;

        let top_width = scaled(display::TOP_WIDTH).min(width);
        let top_height = scaled(display::TOP_HEIGHT);
        let bottom_width = scaled(display::BOTTOM_WIDTH).min(width);
        let bottom_height = scaled(display::BOTTOM_HEIGHT);

        let stack_height = (top_height + bottom_height).min(height);
        let stack_top = (height - stack_height) / 2;

        Self {
            width,
            height,
            top_screen: Rect::new((width - top_width) / 2, stack_top, top_width, top_height),
            bottom_screen: Rect::new(
                (width - bottom_width) / 2,
                stack_top + top_height,
                bottom_width,
                bottom_height,
            ),
        }
    }
}
