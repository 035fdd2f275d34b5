//! Cross-crate end-to-end scenarios, one module per documented scenario.
//! Everything here drives real `frameserver-transport`/`frameserver-proto`
//! pages through `frameserver-compositor`'s dispatch and tick APIs; unlike
//! the unit tests living alongside each module, these always go through a
//! real handshake (`frameserver-mock::MockChild`) where the scenario
//! involves a second process's side of the page.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod crash_with_loop;
#[cfg(test)]
mod crash_without_loop;
#[cfg(test)]
mod event_ring_fairness;
#[cfg(test)]
mod interactive_spawn_and_render;
#[cfg(test)]
mod pts_driven_playback_with_skip;
#[cfg(test)]
mod resize_denied_then_accepted;
