//! Event payload schema (C3 payloads).
//!
//! `frameserver-transport::RawEvent` is an opaque `{category, kind, payload}`
//! record; this module owns the exhaustive kind lists per category and the
//! pack/unpack functions that turn a typed [`Event`] into a `RawEvent` and
//! back. Every category and kind named in the base spec is represented —
//! this schema is additive over the transport crate, never a replacement
//! for it.

use frameserver_transport::RawEvent;

/// Top-level event category, matching the five named in base spec §6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Category {
    Frameserver = 0,
    Target = 1,
    External = 2,
    Io = 3,
    Net = 4,
}

impl Category {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Category::Frameserver,
            1 => Category::Target,
            2 => Category::External,
            3 => Category::Io,
            4 => Category::Net,
            _ => return None,
        })
    }
}

/// Frameserver lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameserverKind {
    Spawned,
    Resized,
    Looped,
    Terminated,
}

/// Target-command events: parent to child control plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Pause,
    Unpause,
    Exit,
    Reset,
    Framestep,
    Setiodev,
    Coreopt,
    Displayhint,
    Graphmode,
    Skip,
    Store,
    Restore,
    Newsegment,
    Attenuate,
    Stepframe,
}

/// External events: child to parent status/capability reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalKind {
    Ident,
    Coreopt,
    Framestatus,
    Statesize,
    Cursorhint,
    Segreq,
    /// Pass-through payload for `net-srv` state transfer. Base spec §9
    /// leaves the full `TAG_STATE_XFER*` protocol incomplete; this crate
    /// forwards the slot identifier to whatever subscribes to the parent's
    /// outbound bus and otherwise takes no action on it.
    StateXfer,
}

/// Translated/raw input events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoKind {
    TranslatedKey,
    Digital,
    Analog,
}

/// Network transport events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetKind {
    Connected,
    Disconnected,
    Nohost,
    Custommsg,
    Inputevent,
    Broken,
}

/// A decoded, typed event. Every variant's payload is small enough to fit
/// the transport's 96-byte packed field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    Frameserver(FrameserverKind),
    Target(TargetKind, TargetPayload),
    External(ExternalKind, ExternalPayload),
    Io(IoKind, IoPayload),
    Net(NetKind, NetPayload),
}

/// Payload shared by most target commands: a single optional numeric
/// argument (e.g. the step count for `framestep`, the gain for
/// `attenuate`). Zero when unused.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TargetPayload {
    pub arg0: i32,
    pub arg1: i32,
}

/// Payload for external events: a slot/size pair, reused across `segreq`,
/// `statesize`, and `state_xfer`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ExternalPayload {
    pub slot: u32,
    pub size: u32,
}

/// Payload for IO events: translated keycode/modifiers or analog axis
/// samples, depending on `IoKind`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct IoPayload {
    pub keysym: u32,
    pub modifiers: u16,
    pub devid: u8,
    pub subid: u8,
    pub axis_value: i16,
}

/// Payload for net events: an opaque message length plus a small inline
/// buffer for `custommsg`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NetPayload {
    pub len: u16,
    pub inline: [u8; 32],
}

impl Default for NetPayload {
    fn default() -> Self {
        NetPayload {
            len: 0,
            inline: [0; 32],
        }
    }
}

fn kind_to_u8(event: &Event) -> u8 {
    match event {
        Event::Frameserver(k) => match k {
            FrameserverKind::Spawned => 0,
            FrameserverKind::Resized => 1,
            FrameserverKind::Looped => 2,
            FrameserverKind::Terminated => 3,
        },
        Event::Target(k, _) => match k {
            TargetKind::Pause => 0,
            TargetKind::Unpause => 1,
            TargetKind::Exit => 2,
            TargetKind::Reset => 3,
            TargetKind::Framestep => 4,
            TargetKind::Setiodev => 5,
            TargetKind::Coreopt => 6,
            TargetKind::Displayhint => 7,
            TargetKind::Graphmode => 8,
            TargetKind::Skip => 9,
            TargetKind::Store => 10,
            TargetKind::Restore => 11,
            TargetKind::Newsegment => 12,
            TargetKind::Attenuate => 13,
            TargetKind::Stepframe => 14,
        },
        Event::External(k, _) => match k {
            ExternalKind::Ident => 0,
            ExternalKind::Coreopt => 1,
            ExternalKind::Framestatus => 2,
            ExternalKind::Statesize => 3,
            ExternalKind::Cursorhint => 4,
            ExternalKind::Segreq => 5,
            ExternalKind::StateXfer => 6,
        },
        Event::Io(k, _) => match k {
            IoKind::TranslatedKey => 0,
            IoKind::Digital => 1,
            IoKind::Analog => 2,
        },
        Event::Net(k, _) => match k {
            NetKind::Connected => 0,
            NetKind::Disconnected => 1,
            NetKind::Nohost => 2,
            NetKind::Custommsg => 3,
            NetKind::Inputevent => 4,
            NetKind::Broken => 5,
        },
    }
}

/// Packs a typed [`Event`] into the transport's fixed-size `RawEvent`.
pub fn pack(event: &Event) -> RawEvent {
    let mut raw = RawEvent::default();
    raw.kind = kind_to_u8(event);

    match event {
        Event::Frameserver(_) => {
            raw.category = Category::Frameserver as u8;
        }
        Event::Target(_, payload) => {
            raw.category = Category::Target as u8;
            raw.payload[0..4].copy_from_slice(&payload.arg0.to_le_bytes());
            raw.payload[4..8].copy_from_slice(&payload.arg1.to_le_bytes());
        }
        Event::External(kind, payload) => {
            raw.category = Category::External as u8;
            raw.payload[0..4].copy_from_slice(&payload.slot.to_le_bytes());
            raw.payload[4..8].copy_from_slice(&payload.size.to_le_bytes());
            let _ = kind;
        }
        Event::Io(_, payload) => {
            raw.category = Category::Io as u8;
            raw.payload[0..4].copy_from_slice(&payload.keysym.to_le_bytes());
            raw.payload[4..6].copy_from_slice(&payload.modifiers.to_le_bytes());
            raw.payload[6] = payload.devid;
            raw.payload[7] = payload.subid;
            raw.payload[8..10].copy_from_slice(&payload.axis_value.to_le_bytes());
        }
        Event::Net(_, payload) => {
            raw.category = Category::Net as u8;
            raw.payload[0..2].copy_from_slice(&payload.len.to_le_bytes());
            let copy_len = (payload.len as usize).min(32);
            raw.payload[2..2 + copy_len].copy_from_slice(&payload.inline[..copy_len]);
        }
    }
    raw
}

/// Unpacks a transport `RawEvent` back into a typed [`Event`]. Returns
/// `None` if the category or kind byte is out of the known range — a
/// forward-compatibility hazard, not a corruption condition, so this is a
/// plain `Option` rather than a `TransportError`.
pub fn unpack(raw: &RawEvent) -> Option<Event> {
    let category = Category::from_u8(raw.category)?;
    match category {
        Category::Frameserver => {
            let kind = match raw.kind {
                0 => FrameserverKind::Spawned,
                1 => FrameserverKind::Resized,
                2 => FrameserverKind::Looped,
                3 => FrameserverKind::Terminated,
                _ => return None,
            };
            Some(Event::Frameserver(kind))
        }
        Category::Target => {
            let kind = match raw.kind {
                0 => TargetKind::Pause,
                1 => TargetKind::Unpause,
                2 => TargetKind::Exit,
                3 => TargetKind::Reset,
                4 => TargetKind::Framestep,
                5 => TargetKind::Setiodev,
                6 => TargetKind::Coreopt,
                7 => TargetKind::Displayhint,
                8 => TargetKind::Graphmode,
                9 => TargetKind::Skip,
                10 => TargetKind::Store,
                11 => TargetKind::Restore,
                12 => TargetKind::Newsegment,
                13 => TargetKind::Attenuate,
                14 => TargetKind::Stepframe,
                _ => return None,
            };
            let arg0 = i32::from_le_bytes(raw.payload[0..4].try_into().unwrap());
            let arg1 = i32::from_le_bytes(raw.payload[4..8].try_into().unwrap());
            Some(Event::Target(kind, TargetPayload { arg0, arg1 }))
        }
        Category::External => {
            let kind = match raw.kind {
                0 => ExternalKind::Ident,
                1 => ExternalKind::Coreopt,
                2 => ExternalKind::Framestatus,
                3 => ExternalKind::Statesize,
                4 => ExternalKind::Cursorhint,
                5 => ExternalKind::Segreq,
                6 => ExternalKind::StateXfer,
                _ => return None,
            };
            let slot = u32::from_le_bytes(raw.payload[0..4].try_into().unwrap());
            let size = u32::from_le_bytes(raw.payload[4..8].try_into().unwrap());
            Some(Event::External(kind, ExternalPayload { slot, size }))
        }
        Category::Io => {
            let kind = match raw.kind {
                0 => IoKind::TranslatedKey,
                1 => IoKind::Digital,
                2 => IoKind::Analog,
                _ => return None,
            };
            let keysym = u32::from_le_bytes(raw.payload[0..4].try_into().unwrap());
            let modifiers = u16::from_le_bytes(raw.payload[4..6].try_into().unwrap());
            let devid = raw.payload[6];
            let subid = raw.payload[7];
            let axis_value = i16::from_le_bytes(raw.payload[8..10].try_into().unwrap());
            Some(Event::Io(
                kind,
                IoPayload {
                    keysym,
                    modifiers,
                    devid,
                    subid,
                    axis_value,
                },
            ))
        }
        Category::Net => {
            let kind = match raw.kind {
                0 => NetKind::Connected,
                1 => NetKind::Disconnected,
                2 => NetKind::Nohost,
                3 => NetKind::Custommsg,
                4 => NetKind::Inputevent,
                5 => NetKind::Broken,
                _ => return None,
            };
            let len = u16::from_le_bytes(raw.payload[0..2].try_into().unwrap());
            let mut inline = [0u8; 32];
            let copy_len = (len as usize).min(32);
            inline[..copy_len].copy_from_slice(&raw.payload[2..2 + copy_len]);
            Some(Event::Net(kind, NetPayload { len, inline }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frameserver_events_round_trip() {
        for kind in [
            FrameserverKind::Spawned,
            FrameserverKind::Resized,
            FrameserverKind::Looped,
            FrameserverKind::Terminated,
        ] {
            let event = Event::Frameserver(kind);
            let raw = pack(&event);
            assert_eq!(unpack(&raw), Some(event));
        }
    }

    #[test]
    fn target_payload_round_trips_both_args() {
        let event = Event::Target(
            TargetKind::Attenuate,
            TargetPayload {
                arg0: -7,
                arg1: 42,
            },
        );
        let raw = pack(&event);
        assert_eq!(unpack(&raw), Some(event));
    }

    #[test]
    fn net_custommsg_round_trips_inline_bytes() {
        let mut inline = [0u8; 32];
        inline[..5].copy_from_slice(b"hello");
        let event = Event::Net(NetKind::Custommsg, NetPayload { len: 5, inline });
        let raw = pack(&event);
        assert_eq!(unpack(&raw), Some(event));
    }

    #[test]
    fn unknown_category_byte_unpacks_to_none() {
        let mut raw = RawEvent::default();
        raw.category = 200;
        assert_eq!(unpack(&raw), None);
    }

    #[test]
    fn io_analog_round_trips_negative_axis() {
        let event = Event::Io(
            IoKind::Analog,
            IoPayload {
                keysym: 0,
                modifiers: 0,
                devid: 1,
                subid: 2,
                axis_value: -300,
            },
        );
        let raw = pack(&event);
        assert_eq!(unpack(&raw), Some(event));
    }
}
