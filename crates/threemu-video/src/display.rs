//! Windowed output for the compositor.
//!
//! winit owns the window and event loop; softbuffer presents the frames the
//! software backend rasterizes. Rendering runs on the event loop thread.

use crate::args::Args;
use crate::backend::{Diagnosed, Frame, LogDiagnostics};
use crate::layout::FramebufferLayout;
use crate::mmio::EmulatedVideo;
use crate::renderer::{ContextError, RenderWindow, Renderer};
use crate::software::SoftwareBackend;
use oxidiz3ds_hw::specs::display::REFRESH_RATE_HZ;
use softbuffer::{Context, SoftBufferError, Surface};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Frames between timing reports
const REPORT_INTERVAL: u64 = 60;

/// Output target backed by a winit window
pub struct SoftbufferWindow {
    window: Rc<Window>,
    surface: Surface<Rc<Window>, Rc<Window>>,
    surface_size: (u32, u32),
    pending: Vec<WindowEvent>,
    close_requested: bool,
}

impl SoftbufferWindow {
    pub fn new(window: Rc<Window>) -> Result<Self, SoftBufferError> {
        let context = Context::new(window.clone())?;
        let surface = Surface::new(&context, window.clone())?;
        Ok(Self {
            window,
            surface,
            surface_size: (0, 0),
            pending: Vec::new(),
            close_requested: false,
        })
    }

    /// Queue an event for the next [`RenderWindow::poll_events`]
    pub fn push_event(&mut self, event: WindowEvent) {
        self.pending.push(event);
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

impl RenderWindow for SoftbufferWindow {
    fn make_current(&mut self) -> Result<(), ContextError> {
        // softbuffer has no context to bind; a destroyed surface shows up as
        // an error on present instead
        Ok(())
    }

    fn framebuffer_layout(&self) -> FramebufferLayout {
        let PhysicalSize { width, height } = self.window.inner_size();
        FramebufferLayout::default_layout(width, height)
    }

    fn swap_buffers(&mut self, frame: Frame<'_>) {
        // Minimized
        let (Some(width), Some(height)) = (NonZeroU32::new(frame.width), NonZeroU32::new(frame.height))
        else {
            return;
        };

        if self.surface_size != (frame.width, frame.height) {
            if let Err(e) = self.surface.resize(width, height) {
                warn!("Failed to resize surface to {}x{}: {}", width, height, e);
                return;
            }
            self.surface_size = (frame.width, frame.height);
        }

        let mut buffer = match self.surface.buffer_mut() {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Failed to acquire surface buffer: {}", e);
                return;
            }
        };
        buffer.copy_from_slice(frame.pixels);
        if let Err(e) = buffer.present() {
            warn!("Failed to present frame: {}", e);
        }
    }

    fn poll_events(&mut self) {
        for event in self.pending.drain(..) {
            match event {
                WindowEvent::Resized(size) => {
                    debug!("Window resized to {}x{}", size.width, size.height);
                }
                WindowEvent::CloseRequested => self.close_requested = true,
                _ => {}
            }
        }
    }
}

type WindowedRenderer = Renderer<SoftbufferWindow, Diagnosed<SoftwareBackend, LogDiagnostics>>;

/// Viewer application driving the renderer from the winit event loop
pub struct VideoDisplay {
    renderer: WindowedRenderer,
    video: EmulatedVideo,
    initial_size: (u32, u32),
    swap_interval: u64,
    next_frame: Instant,
}

impl VideoDisplay {
    pub fn new(video: EmulatedVideo, args: &Args) -> Self {
        let backend = Diagnosed::new(args.to_software_backend(), LogDiagnostics);
        Self {
            renderer: Renderer::new(args.to_renderer_config(), backend),
            video,
            initial_size: args.size,
            swap_interval: args.swap_interval,
            next_frame: Instant::now(),
        }
    }

    fn frame_interval() -> Duration {
        Duration::from_secs(1) / REFRESH_RATE_HZ
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        info!(
            "=== Display Stopped after {} frames ===",
            self.renderer.current_frame()
        );
        self.renderer.shut_down();
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let frame = self.renderer.render_frame(&self.video);

        if self.swap_interval != 0 && frame % self.swap_interval == 0 {
            self.video.registers.swap_framebuffers();
        }

        if frame % REPORT_INTERVAL == 0 {
            let timing = self.renderer.aggregator().aggregated_results();
            info!(
                "Frame {}: {:.1} fps, frame time avg {:?} max {:?}",
                frame, timing.fps, timing.frame_time.avg, timing.frame_time.max
            );
        }

        if self
            .renderer
            .output_target()
            .is_some_and(SoftbufferWindow::close_requested)
        {
            self.shut_down(event_loop);
        }
    }
}

impl ApplicationHandler for VideoDisplay {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_initialized() {
            return;
        }

        let (width, height) = self.initial_size;
        let window = Rc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("threemu-video")
                        .with_inner_size(PhysicalSize::new(width, height)),
                )
                .unwrap_or_else(|e| panic!("Failed to create window: {}", e)),
        );
        let output = SoftbufferWindow::new(window.clone())
            .unwrap_or_else(|e| panic!("Failed to create surface: {}", e));

        self.renderer.set_output_target(output);
        self.renderer
            .initialize()
            .unwrap_or_else(|e| panic!("Failed to initialize renderer: {}", e));

        // Kick off the first frame
        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::RedrawRequested if self.renderer.is_initialized() => {
                self.next_frame = Instant::now() + Self::frame_interval();
                self.redraw(event_loop);
            }
            WindowEvent::CloseRequested if !self.renderer.is_initialized() => event_loop.exit(),
            event @ (WindowEvent::CloseRequested | WindowEvent::Resized(_)) => {
                if let Some(output) = self.renderer.output_target_mut() {
                    output.push_event(event);
                    output.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if Instant::now() >= self.next_frame
            && let Some(output) = self.renderer.output_target()
        {
            output.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}

pub fn run(video: EmulatedVideo, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    let mut app = VideoDisplay::new(video, args);
    event_loop.run_app(&mut app)?;
    Ok(())
}
