//! Scenario 5: child crash without loop.
//!
//! A real child handshakes onto the page via [`MockChild`], its pid is
//! recorded, then the guard's liveness probe reports it gone. With
//! `loop_playback == false`, the guard period's grace elapses and the
//! source terminates: TERMINATED is emitted exactly once and the feed
//! rebinds to [`FeedKind::Dummy`], after which further ticks are no-ops.

use crate::fixtures::{interactive_record, unique_key};
use frameserver_compositor::{
    dispatch, tick_source, Command, FeedContext, FeedKind, FeedOutcome, RecordingSink,
};
use frameserver_mock::MockChild;
use frameserver_proto::{Event, FrameserverKind, GuardThread, LivenessProbe, Side, TerminalReason};
use frameserver_sources::GlUploadHint;
use std::sync::atomic::Ordering;
use std::time::Duration;

struct AlwaysDead;
impl LivenessProbe for AlwaysDead {
    fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}

#[test]
fn terminated_once_then_every_further_tick_is_a_no_op() {
    let key = unique_key("crash-without-loop");
    let (mut parent_page, child) = MockChild::spawn_in_process(&key, 320, 240, false).unwrap();
    drop(child); // the child side is gone; its pid below stands in for "not alive"

    parent_page
        .header()
        .child_pid
        .store(424_242, Ordering::Release);

    let mut record = interactive_record(false);
    let mut gpu = RecordingSink::default();
    let mut audio = RecordingSink::default();
    let mut events = RecordingSink::default();
    let mut kind = FeedKind::Direct {
        use_pbo: GlUploadHint::Synchronous,
    };
    let guard = GuardThread::new(Side::Parent, Duration::from_millis(10));

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

    // Within the grace period nothing fires yet, even with a dead peer.
    let first = tick_source(&mut kind, &mut ctx, &guard, &AlwaysDead, 0, Duration::from_secs(1)).unwrap();
    assert_eq!(first, frameserver_compositor::TickReport::Continue);

    std::thread::sleep(Duration::from_millis(1050));

    let second = tick_source(&mut kind, &mut ctx, &guard, &AlwaysDead, 0, Duration::from_secs(1)).unwrap();
    assert_eq!(
        second,
        frameserver_compositor::TickReport::Terminated {
            reason: TerminalReason::Liveness
        }
    );
    assert_eq!(kind, FeedKind::Dummy);

    let terminated_count = events
        .events
        .iter()
        .filter(|(_, e)| matches!(e, Event::Frameserver(FrameserverKind::Terminated)))
        .count();
    assert_eq!(terminated_count, 1, "TERMINATED must be emitted exactly once");
    assert!(
        !events
            .events
            .iter()
            .any(|(_, e)| matches!(e, Event::Frameserver(FrameserverKind::Looped))),
        "a non-looping source must never emit LOOPED"
    );

    // Every further tick through the dummy feed is a no-op: no panics, no
    // further events, `destroy` is still the only thing it answers to.
    for _ in 0..3 {
        let outcome = dispatch(&mut kind, Command::Tick { now_ms: 0 }, &mut ctx).unwrap();
        assert_eq!(outcome, FeedOutcome::NoFrame);
    }
    let destroy = dispatch(&mut kind, Command::Destroy, &mut ctx).unwrap();
    assert_eq!(destroy, FeedOutcome::Destroyed);

    drop(ctx);
    frameserver_proto::unlink(&key).unwrap();
}
