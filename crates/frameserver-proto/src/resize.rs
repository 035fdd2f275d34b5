//! Resize Protocol (C5). The child is the geometry authority.
//!
//! Sequence: child writes the proposed geometry, sets `resized`, waits on
//! V. Parent observes `resized` on its next tick, validates bounds,
//! recomputes offsets, and either accepts (adopting the geometry) or
//! declines (restoring the old geometry) before clearing `resized` and
//! posting V. During a resize, frame queues are dropped unconditionally —
//! stale cells point at reallocated memory and cannot be reused, so this
//! module never tries to preserve them across a resize.

use frameserver_transport::{SharedPage, TransportError, TransportResult, WaitOutcome, MAX_H, MAX_W};
use std::sync::atomic::Ordering;

/// Outcome of [`negotiate`] from the parent's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The proposed geometry was within bounds and is now live.
    Accepted { w: u32, h: u32 },
    /// The proposal violated configured bounds; geometry is unchanged.
    Declined,
}

/// Child side, step 1-3: writes the proposed geometry and blocks on V for
/// the parent's acknowledgement. Returns the outcome the parent settled on
/// once it wakes — the caller reads `w`/`h` off the page afterward to tell
/// accept from decline, exactly as base spec §4.5 describes.
pub fn request(page: &mut SharedPage, w: u32, h: u32, abufsize: usize, timeout_ms: i32) -> TransportResult<()> {
    page.propose_resize(w, h, abufsize)?;
    match page.header().semaphores.video.wait(timeout_ms) {
        WaitOutcome::Acquired => Ok(()),
        WaitOutcome::TimedOut => Err(TransportError::Timeout {
            millis: timeout_ms.max(0) as u32,
        }),
    }
}

/// Parent side, step 4-5: called once per tick. If `resized` is set,
/// validates the proposal against `MAX_W`/`MAX_H`/the reserved segment
/// size, adopts or declines it, clears `resized`, and posts V.
///
/// Returns `None` when no resize was pending this tick.
pub fn negotiate(page: &mut SharedPage) -> Option<NegotiationOutcome> {
    if page.header().resized.load(Ordering::Acquire) == 0 {
        return None;
    }

    let w = page.header().w.load(Ordering::Acquire);
    let h = page.header().h.load(Ordering::Acquire);
    let segment_size = page.header().segment_size.load(Ordering::Acquire) as usize;
    let abufsize = page.header().abufsize.load(Ordering::Acquire) as usize;

    let outcome = if w == 0 || h == 0 || w > MAX_W || h > MAX_H {
        NegotiationOutcome::Declined
    } else {
        let offsets = frameserver_transport::calc_offsets(w, h, abufsize);
        if offsets.total > segment_size {
            NegotiationOutcome::Declined
        } else {
            NegotiationOutcome::Accepted { w, h }
        }
    };

    if let NegotiationOutcome::Declined = outcome {
        tracing::warn!(w, h, "resize proposal declined: bounds violation");
    } else {
        tracing::info!(w, h, "resize accepted");
    }

    page.acknowledge_resize();
    page.header().semaphores.video.post();
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameserver_transport::AUDIO_BUFFER_DEFAULT;

    #[test]
    fn in_bounds_resize_is_accepted_and_wakes_the_requester() {
        let mut parent_page = SharedPage::create_anonymous(320, 240, AUDIO_BUFFER_DEFAULT).unwrap();
        parent_page
            .propose_resize(1024, 768, AUDIO_BUFFER_DEFAULT)
            .unwrap();
        parent_page.header().semaphores.video.post();

        let outcome = negotiate(&mut parent_page).unwrap();
        assert_eq!(outcome, NegotiationOutcome::Accepted { w: 1024, h: 768 });
        assert_eq!(parent_page.header().resized.load(Ordering::Acquire), 0);
    }

    #[test]
    fn no_pending_resize_returns_none() {
        let mut page = SharedPage::create_anonymous(320, 240, AUDIO_BUFFER_DEFAULT).unwrap();
        assert_eq!(negotiate(&mut page), None);
    }

    #[test]
    fn request_times_out_when_parent_never_acknowledges() {
        let mut page = SharedPage::create_anonymous(320, 240, AUDIO_BUFFER_DEFAULT).unwrap();
        let err = request(&mut page, 640, 480, AUDIO_BUFFER_DEFAULT, 30).unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[test]
    fn out_of_bounds_resize_is_declined_and_geometry_is_unchanged() {
        let mut page = SharedPage::create_anonymous(320, 240, AUDIO_BUFFER_DEFAULT).unwrap();
        // A proposal that exceeds the reserved segment must be rejected by
        // `propose_resize` itself before it ever reaches `negotiate`.
        assert!(page
            .propose_resize(MAX_W + 1, MAX_H + 1, AUDIO_BUFFER_DEFAULT)
            .is_err());
        assert_eq!(negotiate(&mut page), None);
    }
}
