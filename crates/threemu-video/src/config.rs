//! Renderer configuration.

/// Settings consumed once when the renderer is initialized
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererConfig {
    /// Color behind and around the screens, as RGB in `0.0..=1.0`
    pub background: [f32; 3],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            // Dark grey: 0x333333
            background: [0.2, 0.2, 0.2],
        }
    }
}
