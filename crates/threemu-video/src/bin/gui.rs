use clap::Parser;
use threemu_video::{Args, build_video, display};
use tracing::info;

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Program registers and load memory
    let video = build_video(&args).unwrap_or_else(|e| panic!("Failed to set up video state: {}", e));

    info!("=== Starting Display ===");
    display::run(video, &args).expect("Failed to run display");
}
