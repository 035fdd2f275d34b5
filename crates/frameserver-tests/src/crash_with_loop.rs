//! Scenario 4: child crash with loop.
//!
//! Same setup as the no-loop scenario, but `loop_playback == true` and
//! uptime exceeds the guard's one-second grace: the guard detects the dead
//! peer, source control decides to respawn rather than terminate, LOOPED is
//! emitted, and the feed kind is left untouched (a real respawn would
//! re-handshake a fresh child onto it) — never TERMINATED.

use crate::fixtures::{interactive_record, unique_key};
use frameserver_compositor::{tick_source, FeedContext, FeedKind, RecordingSink, TickReport};
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
fn looped_is_emitted_and_feed_kind_survives_for_respawn() {
    let key = unique_key("crash-with-loop");
    let (mut parent_page, child) = MockChild::spawn_in_process(&key, 320, 240, false).unwrap();
    drop(child);

    parent_page
        .header()
        .child_pid
        .store(424_242, Ordering::Release);

    let mut record = interactive_record(true);
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

    std::thread::sleep(Duration::from_millis(1050));

    let report = tick_source(&mut kind, &mut ctx, &guard, &AlwaysDead, 0, Duration::from_secs(1)).unwrap();
    assert_eq!(
        report,
        TickReport::Respawn {
            reason: TerminalReason::Liveness
        }
    );
    assert_eq!(
        kind,
        FeedKind::Direct {
            use_pbo: GlUploadHint::Synchronous
        },
        "a respawn candidate must not be rebound to the dummy feed"
    );

    assert!(events
        .events
        .iter()
        .any(|(_, e)| matches!(e, Event::Frameserver(FrameserverKind::Looped))));
    assert!(
        !events
            .events
            .iter()
            .any(|(_, e)| matches!(e, Event::Frameserver(FrameserverKind::Terminated))),
        "a looping source's crash must never emit TERMINATED"
    );

    drop(ctx);
    frameserver_proto::unlink(&key).unwrap();
}
