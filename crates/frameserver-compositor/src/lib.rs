//! Frame Queues (C7), Presentation Scheduler (C8), and Feed Functions (C9).
//!
//! Sits above `frameserver-transport`/`frameserver-proto` (the wire layer)
//! and `frameserver-sources` (per-source state); this crate is where a
//! source's bytes actually become a presented frame or submitted audio
//! buffer. `frameserver-cli` owns the top-level run loop that calls
//! [`tick::tick_source`] once per source per compositor tick.

mod feed;
mod frame_queue;
mod scheduler;
mod sinks;
mod tick;

pub use feed::{dispatch, Command, FeedContext, FeedKind, FeedOutcome};
pub use frame_queue::{FrameCell, FrameQueue};
pub use scheduler::{
    maybe_reset_timing, poll, prewake, reconcile_audio, should_drop, is_presentable,
    AudioDecision, FrontQueue, PollOutcome, PrewakeDecision, RollbackWindow,
};
pub use sinks::{AudioMixerSink, EventSink, GpuUpload, RecordingSink};
pub use tick::{tick_source, TickReport};
