pub mod args;
pub mod backend;
pub mod compositor;
pub mod config;
pub mod descriptor;
pub mod display;
pub mod ingest;
pub mod layout;
pub mod memory;
pub mod mmio;
pub mod pixel_format;
pub mod profiler;
pub mod renderer;
pub mod screen;
pub mod software;
pub mod surface;
pub mod test_pattern;

// Re-export commonly used types
pub use args::{Args, build_video};
pub use backend::{Diagnosed, GraphicsBackend, LogDiagnostics};
pub use config::RendererConfig;
pub use descriptor::{ColorFill, FramebufferDescriptor, FramebufferSelect};
pub use layout::FramebufferLayout;
pub use memory::{AddressSpace, PhysicalMemory};
pub use mmio::{EmulatedVideo, VideoRegisters};
pub use pixel_format::PixelFormat;
pub use renderer::{FrameSource, HeadlessWindow, RenderWindow, Renderer, RendererError};
pub use screen::{PerScreen, Screen};
pub use software::SoftwareBackend;
