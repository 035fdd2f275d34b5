//! Scenario 6: event ring fairness.
//!
//! The child enqueues 100 IO events in one burst (more than the ring's
//! capacity of 32 can ever hold at once, so it pauses whenever `send_event`
//! reports the ring full); a parent tick with the default fairness fraction
//! of 0.5 on a ring of 32 transfers at most 16 per tick. After enough ticks,
//! all 100 are drained with none lost.

use crate::fixtures::{interactive_record, unique_key};
use frameserver_compositor::{dispatch, Command, FeedContext, FeedKind, FeedOutcome, RecordingSink};
use frameserver_mock::MockChild;
use frameserver_proto::{Event, IoKind, IoPayload};
use frameserver_sources::GlUploadHint;
use frameserver_transport::RING_CAPACITY;

const TOTAL_EVENTS: usize = 100;

fn io_event(index: u32) -> Event {
    Event::Io(
        IoKind::Digital,
        IoPayload {
            keysym: index,
            modifiers: 0,
            devid: 0,
            subid: 0,
            axis_value: 0,
        },
    )
}

#[test]
fn fairness_bounded_drain_loses_nothing_across_ticks() {
    let key = unique_key("event-fairness");
    let (mut parent_page, child) = MockChild::spawn_in_process(&key, 64, 64, false).unwrap();

    let mut record = interactive_record(false);
    let mut gpu = RecordingSink::default();
    let mut audio = RecordingSink::default();
    let mut events = RecordingSink::default();
    let mut kind = FeedKind::Direct {
        use_pbo: GlUploadHint::Synchronous,
    };

    let mut sent = 0usize;
    let mut ticks = 0usize;
    let expected_per_tick_cap = ((RING_CAPACITY as f32) * 0.5).ceil() as usize;
    assert_eq!(expected_per_tick_cap, 16);

    loop {
        // Child bursts as many events as fit; `send_event` reports `false`
        // (without enqueuing) once the ring is full, so this loop is the
        // "pauses between bursts until ring has space" half of the scenario.
        let mut burst = 0;
        while sent < TOTAL_EVENTS && burst < RING_CAPACITY - 1 {
            if !child.send_event(io_event(sent as u32)) {
                break;
            }
            sent += 1;
            burst += 1;
        }

        events.events.clear();
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
        let outcome = dispatch(&mut kind, Command::Tick { now_ms: 0 }, &mut ctx).unwrap();
        assert_eq!(outcome, FeedOutcome::Done);
        assert!(
            events.events.len() <= expected_per_tick_cap,
            "one tick must never forward more than the fairness budget"
        );

        ticks += 1;
        assert!(ticks <= TOTAL_EVENTS, "drain must make forward progress every tick");

        if sent >= TOTAL_EVENTS && parent_page.childevq().is_empty() {
            break;
        }
    }

    assert!(parent_page.childevq().is_empty(), "nothing should remain queued");
    assert_eq!(sent, TOTAL_EVENTS);
    // 100 events at up to 16/tick takes at least ceil(100/16) = 7 ticks.
    assert!(ticks >= 7);

    drop(child);
    frameserver_proto::unlink(&key).unwrap();
}
