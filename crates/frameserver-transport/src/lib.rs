//! Shared-memory page, semaphore set, and SPSC event rings for the
//! frameserver transport.
//!
//! This crate is the bottom layer: C1 (Shared Page), C2 (Semaphore Set),
//! and the generic ring primitive that backs both C3 (Event Rings) and the
//! frame-queue slot pool in `frameserver-compositor`. Event payload schema,
//! the connection handshake, resize negotiation, and the guard thread live
//! one layer up in `frameserver-proto`, which depends on this crate for its
//! wire-level plumbing.

mod error;
mod event_ring;
mod page;
mod region;
mod semaphore;
mod wait;

pub use error::{TransportError, TransportResult};
pub use event_ring::{queue_transfer, EnqueueOutcome, EventRing, PollOutcome};
pub use page::{
    calc_offsets, compute_cookie, EventQueue, Hints, PageHeader, PageOffsets, RawEvent,
    SharedPage, ABI_MAJOR, ABI_MINOR, AUDIO_BUFFER_DEFAULT, AUDIO_BUFFER_LEGACY, MAX_H, MAX_W,
    RING_CAPACITY,
};
pub use region::{SharedRegion, Zeroed};
pub use semaphore::{Semaphore, SemaphoreSet, WaitOutcome, WAIT_BLOCK, WAIT_POLL};
pub use wait::{wait_u32, wait_u32_timeout, wake_all, wake_one, WaitResult};
