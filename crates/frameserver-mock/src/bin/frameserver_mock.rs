//! Standalone stub frameserver child process, driven entirely by CLI
//! flags: connects to a compositor-created page under `--key`, then plays
//! back synthetic frames. Useful for exercising a real `frameserver-cli`
//! compositor without a real decoder or emulator core on hand.

use anyhow::Context;
use clap::Parser;
use frameserver_mock::MockChild;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stub frameserver child for manual exercising")]
struct Args {
    /// Connection key the parent created the page under.
    #[arg(long)]
    key: String,

    /// Total mapped segment size in bytes, as provided by the parent.
    #[arg(long)]
    segment_size: usize,

    /// Milliseconds to wait for the handshake before giving up.
    #[arg(long, default_value_t = 2000)]
    handshake_timeout_ms: u32,

    /// Number of synthetic frames to play before exiting.
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Synthetic playback frame rate.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    let mut child = MockChild::connect(&args.key, args.segment_size, args.handshake_timeout_ms)
        .with_context(|| format!("failed to connect under key {:?}", args.key))?;

    child.announce_spawned();
    child.announce_ident();

    let (w, h) = child.geometry();
    info!(key = %args.key, w, h, frames = args.frames, "connected, starting synthetic playback");

    child.play_synthetic(args.frames, args.fps);

    info!("playback complete, exiting");
    Ok(())
}

fn init_tracing() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
