//! Stub frameserver child (base spec §6's "subprocess" side of the
//! connection), usable two ways: as an in-process fake for
//! `frameserver-tests` (no real subprocess, no real handshake timing), and
//! as the `frameserver-mock` binary, a real child process driven entirely
//! by CLI flags for manual exercising against a real compositor.
//!
//! Mirrors `mock::make_hub`'s role: a thin, test-facing constructor over
//! the real machinery, not a parallel reimplementation of it.

use frameserver_proto::{pack, Event, ExternalKind, ExternalPayload, FrameserverKind};
use frameserver_transport::{SharedPage, TransportResult, WaitOutcome};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// A connected child-side handle, already past the handshake.
pub struct MockChild {
    page: SharedPage,
}

impl MockChild {
    /// Creates the parent-side page under `key` and immediately completes
    /// the child-side handshake against it, all in this process — used by
    /// tests that want a connected pair without forking a real child.
    pub fn spawn_in_process(
        key: &str,
        w: u32,
        h: u32,
        legacy_audio_buffer: bool,
    ) -> anyhow::Result<(SharedPage, MockChild)> {
        let parent_page = frameserver_proto::create(key, w, h, legacy_audio_buffer, true)?;
        let segment_size = parent_page
            .header()
            .segment_size
            .load(Ordering::Acquire) as usize;
        parent_page.header().semaphores.video.post();

        let child_page = frameserver_proto::acquire(key, segment_size, 500)?;
        Ok((parent_page, MockChild { page: child_page }))
    }

    /// Connects to an already-running parent's page by key, used by the
    /// standalone binary against a real compositor process.
    pub fn connect(key: &str, segment_size: usize, handshake_timeout_ms: u32) -> anyhow::Result<Self> {
        let page = frameserver_proto::acquire(key, segment_size, handshake_timeout_ms)?;
        Ok(MockChild { page })
    }

    /// Current negotiated geometry.
    pub fn geometry(&self) -> (u32, u32) {
        let header = self.page.header();
        (
            header.w.load(Ordering::Acquire),
            header.h.load(Ordering::Acquire),
        )
    }

    /// Writes `pixels` into the video buffer, stamps `pts`, and posts V.
    /// `pixels` must be exactly `w * h * 4` bytes at the current geometry.
    pub fn write_frame(&mut self, pixels: &[u8], pts: i64) {
        self.page.header().vpts.store(pts as u64, Ordering::Release);
        self.page.video_buffer_mut().copy_from_slice(pixels);
        self.page.header().vready.store(1, Ordering::Release);
        self.page.header().semaphores.video.post();
    }

    /// Waits for the parent to consume the pending frame (clear `vready`)
    /// within `timeout_ms`.
    pub fn wait_for_consume(&self, timeout_ms: i32) -> WaitOutcome {
        self.page.header().semaphores.video.wait(timeout_ms)
    }

    /// Stages `samples` into the audio buffer and posts A.
    pub fn write_audio(&mut self, samples: &[u8]) {
        let dest = self.page.audio_buffer_mut();
        let len = samples.len().min(dest.len());
        dest[..len].copy_from_slice(&samples[..len]);
        self.page
            .header()
            .abufused
            .store(len as u32, Ordering::Release);
        self.page.header().aready.store(1, Ordering::Release);
        self.page.header().semaphores.audio.post();
    }

    /// Requests a geometry change and blocks (up to `timeout_ms`) for the
    /// parent's decision; the caller reads the resulting geometry back off
    /// `geometry()` to tell accept from decline (base spec §4.5).
    pub fn request_resize(&mut self, w: u32, h: u32, abufsize: usize, timeout_ms: i32) -> TransportResult<()> {
        frameserver_proto::request(&mut self.page, w, h, abufsize, timeout_ms)
    }

    /// Enqueues a typed event onto the child-outbound ring and posts E.
    pub fn send_event(&self, event: Event) -> bool {
        let raw = pack(&event);
        let outcome = self.page.childevq().enqueue(raw);
        self.page.header().semaphores.event.post();
        matches!(outcome, frameserver_transport::EnqueueOutcome::Ok)
    }

    /// Announces a geometry/capability summary, the `IDENT`/`SEGREQ` class
    /// of external event a real decoder sends right after connecting.
    pub fn announce_ident(&self) -> bool {
        self.send_event(Event::External(
            ExternalKind::Ident,
            ExternalPayload { slot: 0, size: 0 },
        ))
    }

    /// Announces a clean spawn, matching base spec §6's FRAMESERVER/SPAWNED
    /// lifecycle event a real child emits once the handshake completes.
    pub fn announce_spawned(&self) -> bool {
        self.send_event(Event::Frameserver(FrameserverKind::Spawned))
    }

    /// Drains and returns every pending parent-to-child event.
    pub fn drain_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.page.parentevq().poll() {
                frameserver_transport::PollOutcome::Ok(raw) => {
                    if let Some(event) = frameserver_proto::unpack(&raw) {
                        events.push(event);
                    }
                }
                frameserver_transport::PollOutcome::Empty => break,
            }
        }
        events
    }

    /// Renders `frame_count` synthetic frames at `fps`, each a solid color
    /// ramp so a real decoder's video output is distinguishable frame to
    /// frame, spaced by PTS but not wall-clock (the scheduler, not this
    /// stub, owns pacing).
    pub fn play_synthetic(&mut self, frame_count: u32, fps: f64) {
        let (w, h) = self.geometry();
        let frame_len = (w as usize) * (h as usize) * 4;
        let ms_per_frame = if fps > 0.0 { 1000.0 / fps } else { 0.0 };

        for index in 0..frame_count {
            let shade = (index % 256) as u8;
            let pixels = vec![shade; frame_len];
            let pts = (index as f64 * ms_per_frame) as i64;
            self.write_frame(&pixels, pts);
            self.wait_for_consume(Duration::from_millis(200).as_millis() as i32);
        }
    }
}
