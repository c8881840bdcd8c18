use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use threemu_video::{
    Args, Diagnosed, HeadlessWindow, LogDiagnostics, Renderer, build_video,
};
use tracing::info;

/// Write 0x00RRGGBB pixels as a binary PPM image
fn write_ppm(path: &Path, pixels: &[u32], width: u32, height: u32) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", width, height)?;
    for pixel in pixels {
        out.write_all(&[(pixel >> 16) as u8, (pixel >> 8) as u8, *pixel as u8])?;
    }
    out.flush()
}

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut video = match build_video(&args) {
        Ok(video) => video,
        Err(e) => {
            eprintln!("Failed to set up video state: {}", e);
            std::process::exit(2);
        }
    };

    let (width, height) = args.size;
    let backend = Diagnosed::new(args.to_software_backend(), LogDiagnostics);
    let mut renderer = Renderer::new(args.to_renderer_config(), backend);
    renderer.set_output_target(HeadlessWindow::new(width, height));
    if let Err(e) = renderer.initialize() {
        eprintln!("Failed to initialize renderer: {}", e);
        std::process::exit(2);
    }

    info!("=== Rendering {} frames (Headless) ===", args.frames);
    for _ in 0..args.frames {
        let frame = renderer.render_frame(&video);
        if args.swap_interval != 0 && frame % args.swap_interval == 0 {
            video.registers.swap_framebuffers();
        }
    }

    let timing = renderer.aggregator().aggregated_results();
    info!("=== Rendering Complete ===");
    info!("Frames: {}", renderer.current_frame());
    info!(
        "Texture allocations: {}, draw calls: {}",
        renderer.backend().inner().allocations(),
        renderer.backend().inner().draw_calls()
    );
    info!(
        "Frame time: min {:?} avg {:?} max {:?}",
        timing.frame_time.min, timing.frame_time.avg, timing.frame_time.max
    );

    let exit_code = match (&args.output, renderer.output_target()) {
        (Some(path), Some(window)) => {
            match write_ppm(path, window.last_frame(), width, height) {
                Ok(()) => {
                    info!("Wrote {:?}", path);
                    0
                }
                Err(e) => {
                    eprintln!("Failed to write {:?}: {}", path, e);
                    1
                }
            }
        }
        _ => 0,
    };

    renderer.shut_down();
    std::process::exit(exit_code);
}
