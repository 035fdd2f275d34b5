//! Scenario 1: interactive spawn and render one frame.
//!
//! Child handshakes, writes one 320x240 RGBA frame of solid `0x7F7F7FFF`,
//! sets `vready`/posts V; parent observes `vready` on the next tick,
//! uploads it, and clears `vready`.

use crate::fixtures::{interactive_record, unique_key};
use frameserver_compositor::{dispatch, Command, FeedContext, FeedKind, FeedOutcome, RecordingSink};
use frameserver_mock::MockChild;
use frameserver_sources::GlUploadHint;
use std::sync::atomic::Ordering;

#[test]
fn child_frame_is_uploaded_and_vready_clears() {
    let key = unique_key("interactive-spawn");
    let (mut parent_page, mut child) = MockChild::spawn_in_process(&key, 320, 240, false).unwrap();
    assert_eq!(child.geometry(), (320, 240));

    let mut pixels = vec![0x7F; 320 * 240 * 4];
    for px in pixels.chunks_exact_mut(4) {
        px[3] = 0xFF;
    }
    child.write_frame(&pixels, 0);

    let mut record = interactive_record(false);
    let mut gpu = RecordingSink::default();
    let mut audio = RecordingSink::default();
    let mut events = RecordingSink::default();
    let mut kind = FeedKind::Direct {
        use_pbo: GlUploadHint::Synchronous,
    };

    let mut ctx = FeedContext {
        record: &mut record,
        page: &mut parent_page,
        video_queue: None,
        audio_queue: None,
        gpu: &mut gpu,
        audio_sink: &mut audio,
        events: &mut events,
        fairness_fraction: 0.5,
        av_drift_budget_ms: 60,
    };

    let poll = dispatch(&mut kind, Command::Poll { now_ms: 0 }, &mut ctx).unwrap();
    assert_eq!(poll, FeedOutcome::GotFrame);

    let render = dispatch(&mut kind, Command::Render, &mut ctx).unwrap();
    assert_eq!(render, FeedOutcome::Done);

    assert_eq!(
        ctx.page.header().vready.load(Ordering::Acquire),
        0,
        "parent must clear vready after consuming the frame"
    );
    assert_eq!(gpu.frames.len(), 1);
    let (_, w, h, pixels, _) = &gpu.frames[0];
    assert_eq!(*w, 320);
    assert_eq!(*h, 240);
    assert!(pixels
        .chunks_exact(4)
        .all(|px| px == [0x7F, 0x7F, 0x7F, 0xFF]));

    drop(ctx);
    frameserver_proto::unlink(&key).unwrap();
}
