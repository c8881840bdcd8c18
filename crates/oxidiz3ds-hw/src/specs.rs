/// Display specifications
///
/// The LCD panels are mounted rotated, so the framebuffers are stored
/// portrait: the top screen's 400x240 image is a 240x400 framebuffer.
pub mod display {
    /// Top screen width in pixels
    pub const TOP_WIDTH: u32 = 400;

    /// Top screen height in pixels
    pub const TOP_HEIGHT: u32 = 240;

    /// Bottom screen width in pixels
    pub const BOTTOM_WIDTH: u32 = 320;

    /// Bottom screen height in pixels
    pub const BOTTOM_HEIGHT: u32 = 240;

    /// Top screen framebuffer width (one scanline of the rotated panel)
    pub const TOP_FRAMEBUFFER_WIDTH: u32 = TOP_HEIGHT;

    /// Top screen framebuffer height
    pub const TOP_FRAMEBUFFER_HEIGHT: u32 = TOP_WIDTH;

    /// Bottom screen framebuffer width
    pub const BOTTOM_FRAMEBUFFER_WIDTH: u32 = BOTTOM_HEIGHT;

    /// Bottom screen framebuffer height
    pub const BOTTOM_FRAMEBUFFER_HEIGHT: u32 = BOTTOM_WIDTH;

    /// Display refresh rate (60 Hz)
    pub const REFRESH_RATE_HZ: u32 = 60;
}
