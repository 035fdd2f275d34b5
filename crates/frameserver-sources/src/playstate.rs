//! Playstate transitions (base spec §3, §4.6).
//!
//! `syssusp` distinguishes a user-initiated pause from a system suspend
//! (e.g. the compositor losing focus) so that resuming from one doesn't
//! accidentally clear the other.

use crate::error::SourceError;

/// Per-source playback state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Playstate {
    /// Handshake in flight; not yet producing frames.
    Initializing,
    /// Actively producing and consuming frames.
    Playing,
    /// User-paused.
    Paused,
    /// Parent-initiated suspend (distinct from user pause).
    SystemSuspended,
    /// Torn down; the feed is rebound to the no-op dummy feed.
    Terminated,
}

impl Playstate {
    /// Validates and applies a play/pause/resume transition, returning
    /// `InvalidState`/`unacceptable_state` with no side effects when the
    /// transition isn't valid from the current state (base spec §7).
    pub fn transition(self, to: Playstate) -> Result<Playstate, SourceError> {
        use Playstate::*;
        let allowed = match (self, to) {
            // Terminated is absorbing; nothing transitions out of it.
            (Terminated, _) => false,
            // Initializing only ever completes into Playing (autoplay) or
            // Paused (no autoplay), driven by the handshake, not by a
            // user-facing play/pause call.
            (Initializing, Playing) | (Initializing, Paused) => true,
            (Initializing, _) => false,
            (Playing, Paused) | (Playing, SystemSuspended) | (Playing, Terminated) => true,
            (Paused, Playing) | (Paused, Terminated) => true,
            (SystemSuspended, Playing) | (SystemSuspended, Terminated) => true,
            (same, other) if same == other => true,
            _ => false,
        };

        if allowed {
            Ok(to)
        } else {
            Err(SourceError::UnacceptableState {
                from: self,
                to,
            })
        }
    }

    /// True once a source may no longer accept any operation but
    /// `destroy`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Playstate::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializing_completes_to_playing_or_paused() {
        assert_eq!(
            Playstate::Initializing.transition(Playstate::Playing),
            Ok(Playstate::Playing)
        );
        assert_eq!(
            Playstate::Initializing.transition(Playstate::Paused),
            Ok(Playstate::Paused)
        );
    }

    #[test]
    fn terminated_rejects_every_transition() {
        assert!(Playstate::Terminated
            .transition(Playstate::Playing)
            .is_err());
    }

    #[test]
    fn pause_and_system_suspend_are_independent_from_playing() {
        assert_eq!(
            Playstate::Playing.transition(Playstate::Paused),
            Ok(Playstate::Paused)
        );
        assert_eq!(
            Playstate::Playing.transition(Playstate::SystemSuspended),
            Ok(Playstate::SystemSuspended)
        );
        assert!(Playstate::Paused
            .transition(Playstate::SystemSuspended)
            .is_err());
    }

    #[test]
    fn resume_from_pause_or_suspend_returns_to_playing() {
        assert_eq!(
            Playstate::Paused.transition(Playstate::Playing),
            Ok(Playstate::Playing)
        );
        assert_eq!(
            Playstate::SystemSuspended.transition(Playstate::Playing),
            Ok(Playstate::Playing)
        );
    }
}
