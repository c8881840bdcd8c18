//! Frame pacing: the per-frame ingest, composite, present cycle.
//!
//! Rendering is single-threaded and must happen on the thread that owns the
//! output target. One call to [`Renderer::render_frame`] runs the whole cycle
//! for both screens before returning.

use crate::backend::{Frame, GraphicsBackend};
use crate::compositor;
use crate::config::RendererConfig;
use crate::descriptor::FramebufferDescriptor;
use crate::ingest;
use crate::layout::FramebufferLayout;
use crate::memory::AddressSpace;
use crate::profiler::{Profiler, TimingResultsAggregator};
use crate::screen::Screen;
use crate::surface::{self, SurfaceCache};
use thiserror::Error;
use tracing::{info, instrument};

/// Producer of the per-frame input: the emulated register state and the
/// memory its framebuffers live in
pub trait FrameSource {
    fn descriptor(&self, screen: Screen) -> FramebufferDescriptor;

    fn memory(&self) -> &dyn AddressSpace;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not make the rendering context current: {0}")]
pub struct ContextError(pub String);

/// The output target the composited image is presented to
pub trait RenderWindow {
    /// Bind the rendering context to the calling thread
    fn make_current(&mut self) -> Result<(), ContextError>;

    /// Current viewport size and screen placement
    fn framebuffer_layout(&self) -> FramebufferLayout;

    /// Show a finished frame
    fn swap_buffers(&mut self, frame: Frame<'_>);

    /// Process pending window and input events
    fn poll_events(&mut self);
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no output target set")]
    NoOutputTarget,
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Window that keeps presented frames in memory
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    width: u32,
    height: u32,
    last_frame: Vec<u32>,
    frames_presented: u64,
    events_polled: u64,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            last_frame: Vec::new(),
            frames_presented: 0,
            events_polled: 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixels of the most recently presented frame, 0x00RRGGBB
    pub fn last_frame(&self) -> &[u32] {
        &self.last_frame
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn events_polled(&self) -> u64 {
        self.events_polled
    }
}

impl RenderWindow for HeadlessWindow {
    fn make_current(&mut self) -> Result<(), ContextError> {
        Ok(())
    }

    fn framebuffer_layout(&self) -> FramebufferLayout {
        FramebufferLayout::default_layout(self.width, self.height)
    }

    fn swap_buffers(&mut self, frame: Frame<'_>) {
        self.last_frame.clear();
        self.last_frame.extend_from_slice(frame.pixels);
        self.frames_presented += 1;
    }

    fn poll_events(&mut self) {
        self.events_polled += 1;
    }
}

/// Dual-screen renderer
pub struct Renderer<W, B> {
    config: RendererConfig,
    window: Option<W>,
    backend: B,
    surfaces: Option<SurfaceCache>,
    profiler: Profiler,
    aggregator: TimingResultsAggregator,
    current_frame: u64,
}

impl<W: RenderWindow, B: GraphicsBackend> Renderer<W, B> {
    pub fn new(config: RendererConfig, backend: B) -> Self {
        Self {
            config,
            window: None,
            backend,
            surfaces: None,
            profiler: Profiler::new(),
            aggregator: TimingResultsAggregator::new(),
            current_frame: 0,
        }
    }

    /// Set the window the renderer presents to
    pub fn set_output_target(&mut self, window: W) {
        self.window = Some(window);
    }

    pub fn output_target(&self) -> Option<&W> {
        self.window.as_ref()
    }

    pub fn output_target_mut(&mut self) -> Option<&mut W> {
        self.window.as_mut()
    }

    /// Bind the context and create the persistent backend objects
    pub fn initialize(&mut self) -> Result<(), RendererError> {
        let window = self.window.as_mut().ok_or(RendererError::NoOutputTarget)?;
        window.make_current()?;

        self.backend.set_clear_color(self.config.background);
        self.surfaces = Some(SurfaceCache::new(&mut self.backend));
        self.profiler.begin_frame();

        info!("Renderer initialized, background {:?}", self.config.background);
        Ok(())
    }

    /// Release the backend objects. The renderer can be initialized again.
    pub fn shut_down(&mut self) {
        if let Some(surfaces) = self.surfaces.take() {
            surfaces.release(&mut self.backend);
            info!("Renderer shut down after {} frames", self.current_frame);
        }
    }

    /// Render one frame and present it. Returns the number of frames rendered
    /// so far, this one included.
    ///
    /// # Panics
    ///
    /// If the renderer is not initialized, the context cannot be made current,
    /// or a screen's configuration is unsupported (see
    /// [`crate::pixel_format::resolve`] and [`crate::ingest::pixel_stride`]).
    #[instrument(level = "trace", skip_all, fields(frame = self.current_frame))]
    pub fn render_frame<S: FrameSource + ?Sized>(&mut self, source: &S) -> u64 {
        let (Some(window), Some(surfaces)) = (self.window.as_mut(), self.surfaces.as_mut()) else {
            panic!("render_frame called before initialize");
        };
        if let Err(e) = window.make_current() {
            panic!("{e}");
        }

        for screen in Screen::ALL {
            let descriptor = source.descriptor(screen);
            let record = surfaces.get_mut(screen);
            let plan = surface::sync(record, &descriptor, &mut self.backend);
            ingest::ingest(&plan, &descriptor, record, source.memory(), &mut self.backend);
        }

        compositor::present(
            &mut self.backend,
            &surfaces.textures(),
            &window.framebuffer_layout(),
        );
        self.current_frame += 1;

        self.profiler.finish_frame();
        self.aggregator
            .add_frame(self.profiler.previous_frame_results());

        window.swap_buffers(self.backend.frame());
        window.poll_events();

        self.profiler.begin_frame();
        self.current_frame
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn is_initialized(&self) -> bool {
        self.surfaces.is_some()
    }

    pub fn surfaces(&self) -> Option<&SurfaceCache> {
        self.surfaces.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn aggregator(&self) -> &TimingResultsAggregator {
        &self.aggregator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, Diagnosed};
    use crate::descriptor::{ColorFill, FramebufferSelect};
    use crate::memory::{PhysicalMemory, VRAM_BASE};
    use crate::pixel_format::PixelFormat;
    use crate::software::SoftwareBackend;
    use std::panic::Location;

    struct StaticSource {
        top: FramebufferDescriptor,
        bottom: FramebufferDescriptor,
        memory: PhysicalMemory,
    }

    impl FrameSource for StaticSource {
        fn descriptor(&self, screen: Screen) -> FramebufferDescriptor {
            match screen {
                Screen::Top => self.top,
                Screen::Bottom => self.bottom,
            }
        }

        fn memory(&self) -> &dyn AddressSpace {
            &self.memory
        }
    }

    fn fill(r: u8, g: u8, b: u8) -> FramebufferDescriptor {
        FramebufferDescriptor {
            address_primary: VRAM_BASE,
            address_secondary: VRAM_BASE,
            active: FramebufferSelect::Primary,
            width: 240,
            height: 400,
            stride: 720,
            format: PixelFormat::Rgb8,
            color_fill: ColorFill {
                enabled: true,
                r,
                g,
                b,
            },
        }
    }

    fn renderer() -> Renderer<HeadlessWindow, SoftwareBackend> {
        let mut renderer = Renderer::new(RendererConfig::default(), SoftwareBackend::new());
        renderer.set_output_target(HeadlessWindow::new(400, 480));
        renderer.initialize().unwrap();
        renderer
    }

    #[test]
    fn initialize_requires_output_target() {
        let mut renderer: Renderer<HeadlessWindow, _> =
            Renderer::new(RendererConfig::default(), SoftwareBackend::new());
        assert!(matches!(
            renderer.initialize(),
            Err(RendererError::NoOutputTarget)
        ));
        assert!(!renderer.is_initialized());
    }

    #[test]
    #[should_panic(expected = "render_frame called before initialize")]
    fn render_before_initialize_panics() {
        let mut renderer: Renderer<HeadlessWindow, _> =
            Renderer::new(RendererConfig::default(), SoftwareBackend::new());
        renderer.set_output_target(HeadlessWindow::new(400, 480));
        let source = StaticSource {
            top: fill(0, 0, 0),
            bottom: fill(0, 0, 0),
            memory: PhysicalMemory::with_fcram_size(0),
        };
        renderer.render_frame(&source);
    }

    #[test]
    fn frame_counter_and_presentation() {
        let mut renderer = renderer();
        let source = StaticSource {
            top: fill(255, 0, 0),
            bottom: fill(0, 0, 255),
            memory: PhysicalMemory::with_fcram_size(0),
        };

        assert_eq!(renderer.render_frame(&source), 1);
        assert_eq!(renderer.render_frame(&source), 2);
        assert_eq!(renderer.current_frame(), 2);
        assert_eq!(renderer.aggregator().aggregated_results().frame_count, 2);
        assert_eq!(renderer.backend().draw_calls(), 4);

        let window = renderer.output_target().unwrap();
        assert_eq!(window.frames_presented(), 2);
        assert_eq!(window.events_polled(), 2);
        let frame = window.last_frame();
        assert_eq!(frame.len(), 400 * 480);
        assert_eq!(frame[0], 0xFF0000);
        assert_eq!(frame[479 * 400 + 200], 0x0000FF);
        // Beside the narrower bottom screen the background shows
        assert_eq!(frame[479 * 400], 0x333333);
    }

    #[test]
    fn independent_renderers_count_separately() {
        let mut a = renderer();
        let mut b = renderer();
        let source = StaticSource {
            top: fill(1, 2, 3),
            bottom: fill(4, 5, 6),
            memory: PhysicalMemory::with_fcram_size(0),
        };

        a.render_frame(&source);
        a.render_frame(&source);
        b.render_frame(&source);
        assert_eq!((a.current_frame(), b.current_frame()), (2, 1));
    }

    #[test]
    fn oversized_framebuffer_is_reported_and_frame_completes() {
        let mut reports = Vec::new();
        {
            let hook = |call: &'static str, _: &'static Location<'static>, error: BackendError| {
                reports.push((call, error));
            };
            let backend = Diagnosed::new(SoftwareBackend::new(), hook);
            let mut renderer = Renderer::new(RendererConfig::default(), backend);
            renderer.set_output_target(HeadlessWindow::new(400, 480));
            renderer.initialize().unwrap();

            let mut top = fill(0, 0, 0);
            top.color_fill.enabled = false;
            top.width = 0xFFFF;
            top.height = 0xFFFF;
            top.stride = 0xFFFF * 4 + 4;
            top.format = PixelFormat::Rgba8;
            let source = StaticSource {
                top,
                bottom: fill(0, 0, 255),
                memory: PhysicalMemory::with_fcram_size(0),
            };

            assert_eq!(renderer.render_frame(&source), 1);
            assert_eq!(renderer.render_frame(&source), 2);

            let texture = renderer.surfaces().unwrap().get(Screen::Top).texture;
            assert_eq!(renderer.backend().inner().texture_size(texture), Some((0, 0)));

            // The refused texture samples black; the other screen is unaffected
            let frame = renderer.output_target().unwrap().last_frame();
            assert_eq!(frame[0], 0x000000);
            assert_eq!(frame[479 * 400 + 200], 0x0000FF);
        }

        // Same shape on the second frame, so only one allocation was attempted
        assert_eq!(reports, vec![("allocate_storage", BackendError::InvalidValue)]);
    }

    #[test]
    fn shut_down_releases_textures() {
        let mut renderer = renderer();
        assert_eq!(renderer.backend().live_textures(), 2);
        renderer.shut_down();
        assert_eq!(renderer.backend().live_textures(), 0);
        assert!(!renderer.is_initialized());
    }
}
