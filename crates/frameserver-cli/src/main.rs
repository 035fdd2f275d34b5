//! Compositor process entry point (base spec §6's parent side of the
//! handshake). Creates the shared page, spawns the child (a bundled
//! `frameserver-mock` stand-in for the built-in modes, or an arbitrary
//! external command), and drives the per-tick loop over
//! `frameserver-compositor`'s feed dispatch and guard thread.
//!
//! Real GPU upload, audio mixing, and the scripting layer's event bus are
//! external collaborators (base spec §1); this binary logs through them
//! instead of wiring up a real compositor, matching `dev_server`'s
//! stand-in-service shape rather than a full application.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use frameserver_compositor::{
    dispatch, prewake, tick_source, AudioMixerSink, Command, EventSink, FeedContext, FeedKind,
    FeedOutcome, FrameQueue, GpuUpload, PrewakeDecision, TickReport,
};
use frameserver_proto::{
    Event, GuardThread, OsLivenessProbe, Side, SpawnMode, TerminalReason,
};
use frameserver_sources::{
    ClockState, FrameserverConfig, GlUploadHint, PacingParams, SourceFlags, SourceIdentity,
    SourceKind, SourceRecord,
};
use std::path::PathBuf;
use std::process::{Child, Command as OsCommand};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Movie,
    Libretro,
    Record,
    NetClient,
    NetServer,
    External,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Frameserver-core compositor process")]
struct Args {
    /// Connection key the child maps the shared page under.
    #[arg(long)]
    key: String,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    #[arg(long, value_enum, default_value_t = Mode::Libretro)]
    mode: Mode,

    /// Resource path/URL forwarded to a built-in mode's child; ignored for
    /// `--mode external`.
    #[arg(long, default_value = "")]
    resource: String,

    /// Command to exec for `--mode external`; required in that mode.
    #[arg(long)]
    command: Option<String>,

    /// Extra argv entries for `--mode external`.
    #[arg(long)]
    argv: Vec<String>,

    /// Whether this source should respawn (subject to the one-second
    /// debounce) instead of terminating on an unclean exit.
    #[arg(long)]
    loop_playback: bool,

    #[arg(long)]
    legacy_audio_buffer: bool,

    #[arg(long)]
    force_unlink: bool,

    /// Synthetic playback rate used to derive `ms_per_frame` pacing.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Milliseconds to wait for the child's handshake post.
    #[arg(long, default_value_t = 2000)]
    handshake_timeout_ms: u32,

    /// Stop after this many ticks instead of running until terminated.
    #[arg(long)]
    max_ticks: Option<u64>,

    #[arg(long, default_value_t = 50)]
    guard_period_ms: u64,

    #[arg(long, default_value_t = 0.5)]
    fairness_fraction: f32,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = FrameserverConfig::builder()
        .legacy_audio_buffer(args.legacy_audio_buffer)
        .guard_period(Duration::from_millis(args.guard_period_ms))
        .fairness_fraction(args.fairness_fraction)
        .build();

    run(args, config)
}

fn init_tracing() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn run(args: Args, config: FrameserverConfig) -> anyhow::Result<()> {
    let spawn_mode = spawn_mode_for(args.mode, &args.resource, args.command.clone(), args.argv.clone())?;
    let kind = source_kind_for(args.mode);

    let mut page = frameserver_proto::create(
        &args.key,
        args.width,
        args.height,
        config.legacy_audio_buffer,
        args.force_unlink,
    )
    .with_context(|| format!("failed to create shared page under key {:?}", args.key))?;

    let segment_size = page.header().segment_size.load(Ordering::Acquire) as usize;

    let mut child = spawn_child(&args.key, segment_size, &spawn_mode, args.handshake_timeout_ms)
        .context("failed to spawn child process")?;
    page.header()
        .child_pid
        .store(child.id(), Ordering::Release);
    page.header().semaphores.video.post();
    info!(key = %args.key, pid = child.id(), "child spawned, handshake posted");

    let pacing = PacingParams::from_config(&config, args.fps);
    let identity = SourceIdentity {
        source_id: 1,
        video_id: 1,
        audio_id: 1,
        user_tag: 0,
    };
    let flags = SourceFlags {
        autoplay: true,
        loop_playback: args.loop_playback,
    };
    let sample_rate = 48_000;
    let channels = 2;
    let mut record = SourceRecord::new(
        identity,
        kind,
        flags,
        pacing,
        page.audio_buffer().len(),
        sample_rate,
        channels,
    );

    let mut video_queue = kind
        .uses_frame_queues()
        .then(|| FrameQueue::alloc(config.video_queue_capacity));
    let mut audio_queue = matches!(kind, SourceKind::DecodedStream { nopts: false })
        .then(|| FrameQueue::alloc(config.audio_queue_capacity));

    let mut feed_kind = feed_kind_for(kind);
    let mut guard = GuardThread::new(Side::Parent, config.guard_period);
    let probe = OsLivenessProbe;
    let mut gpu = LoggingSink;
    let mut audio_sink = LoggingSink;
    let mut events = LoggingSink;

    let started_at = Instant::now();
    let mut ticks: u64 = 0;

    loop {
        if let Some(max) = args.max_ticks {
            if ticks >= max {
                info!(ticks, "max-ticks reached, stopping");
                break;
            }
        }
        let tick_started = Instant::now();
        let now_ms = started_at.elapsed().as_millis() as i64;

        let mut ctx = FeedContext {
            record: &mut record,
            page: &mut page,
            video_queue: video_queue.as_mut(),
            audio_queue: audio_queue.as_mut(),
            gpu: &mut gpu,
            audio_sink: &mut audio_sink,
            events: &mut events,
            fairness_fraction: config.fairness_fraction,
            av_drift_budget_ms: config.av_drift_budget_ms,
        };

        if let FeedOutcome::GotFrame = dispatch(&mut feed_kind, Command::Poll { now_ms }, &mut ctx)? {
            dispatch(&mut feed_kind, Command::Render, &mut ctx)?;
        }

        let report = tick_source(
            &mut feed_kind,
            &mut ctx,
            &guard,
            &probe,
            now_ms,
            config.respawn_grace,
        )?;
        drop(ctx);

        match report {
            TickReport::Continue => {}
            TickReport::Resized { w, h } => {
                info!(w, h, "resize negotiated, reallocating frame queues");
                video_queue = kind
                    .uses_frame_queues()
                    .then(|| FrameQueue::alloc(config.video_queue_capacity));
                audio_queue = matches!(kind, SourceKind::DecodedStream { nopts: false })
                    .then(|| FrameQueue::alloc(config.audio_queue_capacity));
            }
            TickReport::Respawn { reason } => {
                warn!(?reason, "source died, respawning child");
                let _ = child.kill();
                let _ = child.wait();
                child = spawn_child(&args.key, segment_size, &spawn_mode, args.handshake_timeout_ms)
                    .context("failed to respawn child process")?;
                page.header()
                    .child_pid
                    .store(child.id(), Ordering::Release);
                page.header().semaphores.video.post();
                record.clocks = ClockState::new(sample_rate, channels);
                guard = GuardThread::new(Side::Parent, config.guard_period);
            }
            TickReport::Terminated { reason } => {
                warn!(?reason, "source terminated, tearing down");
                let _ = child.kill();
                let _ = child.wait();
                break;
            }
        }

        ticks += 1;
        let elapsed_ms = tick_started.elapsed().as_millis() as i64;
        let frame_period_ms = if pacing.ms_per_frame > 0.0 {
            pacing.ms_per_frame as i64
        } else {
            16
        };
        match prewake(frame_period_ms - elapsed_ms, pacing.prewake_ms) {
            PrewakeDecision::Sleep(ms) => std::thread::sleep(Duration::from_millis(ms)),
            PrewakeDecision::BusyAdvance => {}
        }
    }

    frameserver_proto::unlink(&args.key).context("failed to unlink connection key")?;
    Ok(())
}

fn source_kind_for(mode: Mode) -> SourceKind {
    match mode {
        Mode::Movie => SourceKind::DecodedStream { nopts: false },
        Mode::Libretro | Mode::External => SourceKind::Interactive {
            use_pbo: GlUploadHint::Synchronous,
            rollback_frames: 0,
        },
        Mode::Record => SourceKind::Recorder,
        Mode::NetClient | Mode::NetServer => SourceKind::Network,
    }
}

fn feed_kind_for(kind: SourceKind) -> FeedKind {
    match kind {
        SourceKind::Interactive { use_pbo, .. } => FeedKind::Direct { use_pbo },
        SourceKind::DecodedStream { nopts: true } => FeedKind::QueuedVideo,
        SourceKind::DecodedStream { nopts: false } => FeedKind::QueuedVideoAudio,
        SourceKind::Recorder => FeedKind::RecorderReadback,
        SourceKind::Network => FeedKind::NetworkOnly,
    }
}

fn spawn_mode_for(
    mode: Mode,
    resource: &str,
    command: Option<String>,
    argv: Vec<String>,
) -> anyhow::Result<SpawnMode> {
    Ok(match mode {
        Mode::Movie => SpawnMode::Movie {
            resource: resource.to_string(),
        },
        Mode::Libretro => SpawnMode::Libretro {
            resource: resource.to_string(),
        },
        Mode::Record => SpawnMode::Record {
            resource: resource.to_string(),
        },
        Mode::NetClient => SpawnMode::NetClient {
            resource: resource.to_string(),
        },
        Mode::NetServer => SpawnMode::NetServer {
            resource: resource.to_string(),
        },
        Mode::External => SpawnMode::External {
            command: command.context("--command is required for --mode external")?,
            argv,
        },
    })
}

/// Spawns the child process for `mode`: an arbitrary external command, or
/// the bundled `frameserver-mock` stand-in for every built-in mode (no
/// real decoder/emulator core lives in this workspace).
fn spawn_child(
    key: &str,
    segment_size: usize,
    mode: &SpawnMode,
    handshake_timeout_ms: u32,
) -> anyhow::Result<Child> {
    match mode {
        SpawnMode::External { command, argv } => OsCommand::new(command)
            .args(argv)
            .env("FRAMESERVER_KEY", key)
            .env("FRAMESERVER_SEGMENT_SIZE", segment_size.to_string())
            .spawn()
            .with_context(|| format!("failed to spawn external child {command:?}")),
        _ => {
            let binary = mock_binary_path()?;
            OsCommand::new(&binary)
                .arg("--key")
                .arg(key)
                .arg("--segment-size")
                .arg(segment_size.to_string())
                .arg("--handshake-timeout-ms")
                .arg(handshake_timeout_ms.to_string())
                .spawn()
                .with_context(|| format!("failed to spawn bundled mock child at {binary:?}"))
        }
    }
}

/// Locates the `frameserver-mock` binary next to this one, falling back to
/// `$PATH` resolution for installs where the two aren't collocated.
fn mock_binary_path() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("could not resolve current executable path")?;
    let name = if cfg!(windows) {
        "frameserver-mock.exe"
    } else {
        "frameserver-mock"
    };
    if let Some(dir) = exe.parent() {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Ok(PathBuf::from(name))
}

/// `GpuUpload`/`AudioMixerSink`/`EventSink` stand-in that logs through
/// `tracing` instead of driving a real GL context, mixer, or script VM —
/// this binary exercises the tick loop, not a full compositor.
struct LoggingSink;

impl GpuUpload for LoggingSink {
    fn upload_frame(&mut self, source_id: u32, w: u32, h: u32, pixels: &[u8], hint: GlUploadHint) {
        tracing::trace!(source_id, w, h, bytes = pixels.len(), ?hint, "frame upload");
    }
}

impl AudioMixerSink for LoggingSink {
    fn submit(&mut self, source_id: u32, pcm: &[u8], sample_rate: u32, channels: u32) {
        tracing::trace!(source_id, bytes = pcm.len(), sample_rate, channels, "audio submit");
    }
}

impl EventSink for LoggingSink {
    fn emit(&mut self, source_id: u32, event: Event) {
        info!(source_id, ?event, "event");
    }
}
