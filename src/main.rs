use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use posetrace::{extension_allowed, process_video, Args, ALLOWED_EXTENSIONS};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if !extension_allowed(&args.input) {
        anyhow::bail!(
            "unsupported input format: {} (expected one of: {})",
            args.input.display(),
            ALLOWED_EXTENSIONS.join(", ")
        );
    }

    let config = args.to_config();
    let summary = process_video(
        &args.input,
        &args.output,
        args.landmarks_json.as_deref(),
        &config,
    )
    .with_context(|| format!("processing {}", args.input.display()))?;

    println!(
        "{} frames at {} fps -> {}",
        summary.frame_count,
        summary.fps,
        args.output.display()
    );
    if let Some(path) = &args.landmarks_json {
        println!("landmarks -> {}", path.display());
    }
    Ok(())
}
