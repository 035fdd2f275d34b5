//! External collaborator seams (base spec §1's "out of scope" list).
//!
//! GPU texture upload, audio mixing, and the scripting layer's event bus
//! are all external collaborators the core only names interfaces for.
//! These traits are exactly those interfaces — feed functions call through
//! them and never assume a concrete GL context, mixer, or script VM.

use frameserver_proto::Event;
use frameserver_sources::GlUploadHint;

/// GPU texture upload, called by the direct-video and queued-video feed
/// functions on `render`. A real implementation binds a GL/Vulkan texture;
/// tests and the mock binary use a recording stub.
pub trait GpuUpload {
    fn upload_frame(&mut self, source_id: u32, w: u32, h: u32, pixels: &[u8], hint: GlUploadHint);
}

/// Audio mixer submission, called once an audio cell clears the A/V
/// reconciliation check in the scheduler.
pub trait AudioMixerSink {
    fn submit(&mut self, source_id: u32, pcm: &[u8], sample_rate: u32, channels: u32);
}

/// The compositor's scripting-layer event bus. Feed functions and source
/// control push typed lifecycle/status events here; network feeds also use
/// it to deliver inbound `NET` events to the network worker thread.
pub trait EventSink {
    fn emit(&mut self, source_id: u32, event: Event);
}

/// A `GpuUpload`/`AudioMixerSink`/`EventSink` that records everything it's
/// given, for tests and the mock binary's manual-exercising mode.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<(u32, u32, u32, Vec<u8>, GlUploadHint)>,
    pub audio: Vec<(u32, Vec<u8>, u32, u32)>,
    pub events: Vec<(u32, Event)>,
}

impl GpuUpload for RecordingSink {
    fn upload_frame(&mut self, source_id: u32, w: u32, h: u32, pixels: &[u8], hint: GlUploadHint) {
        self.frames
            .push((source_id, w, h, pixels.to_vec(), hint));
    }
}

impl AudioMixerSink for RecordingSink {
    fn submit(&mut self, source_id: u32, pcm: &[u8], sample_rate: u32, channels: u32) {
        self.audio
            .push((source_id, pcm.to_vec(), sample_rate, channels));
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, source_id: u32, event: Event) {
        self.events.push((source_id, event));
    }
}
