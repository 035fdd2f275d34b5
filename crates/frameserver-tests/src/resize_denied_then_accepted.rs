//! Scenario 3: resize denied, then retried within bounds.
//!
//! Child requests w=8192 (> MAX_W); parent declines, clearing `resized`
//! without changing geometry. Child reads `w` back, sees no change, and
//! retries with w=1024, which the parent accepts. Expected: no RESIZED
//! event on the first attempt, exactly one on the second.

use crate::fixtures::{interactive_record, unique_key};
use frameserver_compositor::{dispatch, Command, FeedContext, FeedKind, FeedOutcome, RecordingSink};
use frameserver_mock::MockChild;
use frameserver_proto::{Event, FrameserverKind};
use frameserver_sources::GlUploadHint;
use frameserver_transport::MAX_W;

fn tick_once(
    kind: &mut FeedKind,
    ctx: &mut FeedContext<'_>,
) -> FeedOutcome {
    dispatch(kind, Command::Tick { now_ms: 0 }, ctx).unwrap()
}

#[test]
fn declined_proposal_leaves_geometry_untouched_and_emits_nothing() {
    let key = unique_key("resize-denied");
    let (mut parent_page, mut child) = MockChild::spawn_in_process(&key, 320, 240, false).unwrap();

    // Child proposes an out-of-bounds width; `propose_resize` rejects it
    // before `resized` is ever set, so the parent's next tick has nothing
    // to negotiate and the child's own `request_resize` call fails locally.
    let declined = child.request_resize(MAX_W + 1, 240, 65_536, 0);
    assert!(declined.is_err(), "an out-of-bounds proposal must be rejected");
    assert_eq!(child.geometry(), (320, 240), "geometry must be unchanged after a decline");

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
    tick_once(&mut kind, &mut ctx);
    assert!(
        !events
            .events
            .iter()
            .any(|(_, e)| matches!(e, Event::Frameserver(FrameserverKind::Resized))),
        "no RESIZED event on the first, declined attempt"
    );

    drop(ctx);

    // Retry with an in-bounds width: `request_resize` stores the proposal
    // and sets `resized` before it blocks on V, so a zero-timeout poll
    // leaves exactly that state behind even though the call itself times
    // out (nothing has posted V yet — that's the parent's `Tick` below).
    let _ = child.request_resize(1024, 240, 65_536, 0);

    let mut events2 = RecordingSink::default();
    let mut ctx2 = FeedContext {
        record: &mut record,
        page: &mut parent_page,
        video_queue: None,
        audio_queue: None,
        gpu: &mut gpu,
        audio_sink: &mut audio,
        events: &mut events2,
        fairness_fraction: 0.5,
        av_drift_budget_ms: 60,
    };
    let outcome = tick_once(&mut kind, &mut ctx2);
    assert_eq!(outcome, FeedOutcome::Resized { w: 1024, h: 240 });
    let resized_count = events2
        .events
        .iter()
        .filter(|(_, e)| matches!(e, Event::Frameserver(FrameserverKind::Resized)))
        .count();
    assert_eq!(resized_count, 1, "exactly one RESIZED on the accepted retry");
    assert_eq!(child.geometry(), (1024, 240));

    frameserver_proto::unlink(&key).unwrap();
}
