//! Shared Page (C1).
//!
//! Layout: header, then the two event rings (childevq, parentevq), then the
//! audio buffer, then the video buffer, matching §6's "header followed by
//! two event rings, then audio buffer, then video buffer." All four
//! sections live in one [`SharedRegion`], sized once at the configured
//! maximum and never physically reallocated; a resize only changes the
//! *logical* geometry (`w`, `h`) and recomputed offsets within that fixed
//! allocation, which is the one deliberate simplification over recreating
//! the mapping on every renegotiation (documented in DESIGN.md).

use crate::event_ring::EventRing;
use crate::region::{SharedRegion, Zeroed};
use crate::semaphore::SemaphoreSet;
use crate::{TransportError, TransportResult};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// ABI major version. A mismatch against a peer's page is terminal.
pub const ABI_MAJOR: u16 = 1;
/// ABI minor version.
pub const ABI_MINOR: u16 = 0;

/// Event-ring capacity, matching base spec §4.3's default of 32.
pub const RING_CAPACITY: usize = 32;

/// Maximum negotiable width in pixels.
pub const MAX_W: u32 = 4096;
/// Maximum negotiable height in pixels.
pub const MAX_H: u32 = 2048;
/// Modern default audio buffer size in bytes (~64 KiB).
pub const AUDIO_BUFFER_DEFAULT: usize = 65_536;
/// Legacy audio buffer size in bytes (~288 KiB), matching the original
/// `SHMPAGE_AUDIOBUF_SIZE` constant of `192000 * 3 / 2`.
pub const AUDIO_BUFFER_LEGACY: usize = 192_000 * 3 / 2;
/// Bytes per pixel for the RGBA color mode, the default pixel format.
const BYTES_PER_PIXEL: usize = 4;

/// Fixed-size event record. `payload` is a tagged union of up to ~100 bytes
/// per base spec §6; `frameserver-proto` owns the actual category/kind
/// schema and packs/unpacks this field. Kept `Copy`/`repr(C)` so it can live
/// directly inside an [`EventRing`] embedded in the page.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawEvent {
    /// `FRAMESERVER` / `TARGET` / `EXTERNAL` / `IO` / `NET`.
    pub category: u8,
    /// Kind within the category; interpretation is category-specific.
    pub kind: u8,
    _pad: [u8; 6],
    /// Packed payload bytes, interpreted by `frameserver-proto`.
    pub payload: [u8; 96],
}

impl Default for RawEvent {
    fn default() -> Self {
        RawEvent {
            category: 0,
            kind: 0,
            _pad: [0; 6],
            payload: [0; 96],
        }
    }
}

/// The child-to-parent and parent-to-child event ring type, fixed at the
/// base spec's capacity of 32.
pub type EventQueue = EventRing<RawEvent, RING_CAPACITY>;

/// Origin and dirty-rect hints carried in the header (base spec §3 `hints`).
#[repr(C)]
pub struct Hints {
    /// Nonzero when the video buffer's row order is bottom-up.
    pub origin_lower_left: AtomicU32,
    /// Nonzero when `dirty` should be honored instead of the full frame.
    pub subregion_dirty: AtomicU32,
    /// Dirty rectangle, valid only when `subregion_dirty != 0`.
    pub dirty_x1: AtomicU32,
    pub dirty_y1: AtomicU32,
    pub dirty_x2: AtomicU32,
    pub dirty_y2: AtomicU32,
}

impl Hints {
    const fn new() -> Self {
        Hints {
            origin_lower_left: AtomicU32::new(0),
            subregion_dirty: AtomicU32::new(0),
            dirty_x1: AtomicU32::new(0),
            dirty_y1: AtomicU32::new(0),
            dirty_x2: AtomicU32::new(0),
            dirty_y2: AtomicU32::new(0),
        }
    }
}

/// The fixed-layout page header. Every field after `major`/`minor`/`cookie`
/// is mutable for the lifetime of the mapping; those three are written once
/// at init and any later mutation is corruption (invariant 1).
#[repr(C)]
pub struct PageHeader {
    /// ABI major version, fixed at init.
    pub major: u16,
    /// ABI minor version, fixed at init.
    pub minor: u16,
    _reserved: u32,
    /// Computed once at init from field offsets and type sizes.
    pub cookie: AtomicU64,
    /// Dead-man's switch: nonzero while either side considers the
    /// connection alive.
    pub dms: AtomicU32,
    /// Producer sets to request a geometry change; consumer clears on ack.
    pub resized: AtomicU32,
    /// Current negotiated width, valid only while `resized == 0`.
    pub w: AtomicU32,
    /// Current negotiated height, valid only while `resized == 0`.
    pub h: AtomicU32,
    /// Total mapping size; may change logically during resize.
    pub segment_size: AtomicU32,
    /// Origin and dirty-rect hints.
    pub hints: Hints,
    /// Buffer-ready flags for multi-buffer synchronization.
    pub vready: AtomicU32,
    pub vpending: AtomicU32,
    pub aready: AtomicU32,
    pub apending: AtomicU32,
    /// Audio write/read cursors.
    pub abufused: AtomicU32,
    pub abufsize: AtomicU32,
    pub abufbase: AtomicU32,
    /// Producer-supplied presentation timestamps, milliseconds, monotonic
    /// within a stream.
    pub vpts: AtomicU64,
    pub apts: AtomicU64,
    /// Parent process id, used by the child-side guard thread's liveness
    /// check against the original spawner.
    pub parent_pid: AtomicU32,
    /// Child process id, used by the parent-side guard thread.
    pub child_pid: AtomicU32,
    /// Sample rate and channel count the parent declared at spawn.
    pub sample_rate: AtomicU32,
    pub channels: AtomicU32,
    /// The three embedded semaphores.
    pub semaphores: SemaphoreSet,
}

/// Byte offsets of each section within the page, recomputed by
/// [`calc_offsets`] after every resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageOffsets {
    pub header: usize,
    pub childevq: usize,
    pub parentevq: usize,
    pub audio: usize,
    pub video: usize,
    pub total: usize,
}

fn header_size() -> usize {
    std::mem::size_of::<PageHeader>()
}

fn ring_size() -> usize {
    std::mem::size_of::<EventQueue>()
}

/// Recomputes the byte layout of a page with the given geometry and audio
/// buffer size. This is `calc_offsets(page) -> (vidp, audp)` from base spec
/// §4.1, generalized to return every section's offset so callers never
/// hand-compute strides.
pub fn calc_offsets(w: u32, h: u32, abufsize: usize) -> PageOffsets {
    let header = 0;
    let childevq = header + header_size();
    let parentevq = childevq + ring_size();
    let audio = parentevq + ring_size();
    let video = audio + abufsize;
    let video_len = (w as usize) * (h as usize) * BYTES_PER_PIXEL;
    PageOffsets {
        header,
        childevq,
        parentevq,
        audio,
        video,
        total: video + video_len,
    }
}

/// Computes the layout cookie: a 64-bit value derived from the static
/// layout constants (header size, ring size, ABI version), not from live
/// header contents — using live contents would be circular, since the
/// cookie itself lives in the header.
pub fn compute_cookie() -> u64 {
    let mut value = 0xA5A5_5A5A_u64;
    value = value
        .wrapping_mul(1_099_511_628_211)
        .wrapping_add(header_size() as u64);
    value = value
        .wrapping_mul(1_099_511_628_211)
        .wrapping_add(ring_size() as u64);
    value = value
        .wrapping_mul(1_099_511_628_211)
        .wrapping_add(ABI_MAJOR as u64);
    value = value
        .wrapping_mul(1_099_511_628_211)
        .wrapping_add(ABI_MINOR as u64);
    value
}

/// A mapped shared page plus the region backing it. Owns the `SharedRegion`
/// for the lifetime of the mapping; dropping a `SharedPage` unmaps it.
pub struct SharedPage {
    region: SharedRegion<Zeroed>,
}

impl SharedPage {
    /// Total bytes reserved for a page at the configured maximum geometry,
    /// audio buffer size, and ring capacity. The page is always allocated
    /// at this size regardless of the currently negotiated `w`/`h`, so a
    /// resize never requires re-mapping — only `calc_offsets` changes.
    pub fn max_segment_size(audio_buffer_size: usize) -> usize {
        calc_offsets(MAX_W, MAX_H, audio_buffer_size).total
    }

    /// Creates a fresh, zeroed page backed by an anonymous mapping. Used by
    /// the parent on source spawn before the child has mapped anything.
    pub fn create_anonymous(
        initial_w: u32,
        initial_h: u32,
        audio_buffer_size: usize,
    ) -> TransportResult<Self> {
        let total = Self::max_segment_size(audio_buffer_size);
        let region = SharedRegion::<Zeroed>::new_aligned_zeroed(total, 64)?;
        let mut page = SharedPage { region };
        page.init_header(initial_w, initial_h, audio_buffer_size, total)?;
        Ok(page)
    }

    /// Creates a fresh, zeroed page backed by a named file both processes
    /// can map by path. `force_unlink` removes a stale file left by a
    /// crashed prior run before creating the new one — the supplemented
    /// `force_unlink` behavior from `arcan_frameserver_getshm`.
    pub fn create_file_backed(
        path: &Path,
        initial_w: u32,
        initial_h: u32,
        audio_buffer_size: usize,
        force_unlink: bool,
    ) -> TransportResult<Self> {
        if force_unlink {
            let _ = std::fs::remove_file(path);
        }
        let total = Self::max_segment_size(audio_buffer_size);
        let region = SharedRegion::<Zeroed>::open_file_backed(path, total)?;
        let mut page = SharedPage { region };
        page.init_header(initial_w, initial_h, audio_buffer_size, total)?;
        Ok(page)
    }

    /// Maps an already-created page by path. Used by the child side of
    /// `acquire`; does not reinitialize the header.
    pub fn open_file_backed(path: &Path, segment_size: usize) -> TransportResult<Self> {
        let region = SharedRegion::<Zeroed>::open_file_backed(path, segment_size)?;
        Ok(SharedPage { region })
    }

    fn init_header(
        &mut self,
        initial_w: u32,
        initial_h: u32,
        audio_buffer_size: usize,
        segment_size: usize,
    ) -> TransportResult<()> {
        let video_len = (initial_w as usize) * (initial_h as usize) * BYTES_PER_PIXEL;
        let minimum = calc_offsets(initial_w, initial_h, audio_buffer_size).total;
        if video_len == 0 || minimum > segment_size {
            return Err(TransportError::InvalidCapacity {
                requested: segment_size,
                minimum,
            });
        }

        let header = self.region.prefix_mut::<PageHeader>();
        header.major = ABI_MAJOR;
        header.minor = ABI_MINOR;
        header.cookie.store(compute_cookie(), Ordering::Release);
        header.dms.store(1, Ordering::Release);
        header.resized.store(0, Ordering::Release);
        header.w.store(initial_w, Ordering::Release);
        header.h.store(initial_h, Ordering::Release);
        header
            .segment_size
            .store(segment_size as u32, Ordering::Release);
        header.abufsize.store(audio_buffer_size as u32, Ordering::Release);
        header.abufused.store(0, Ordering::Release);
        header.abufbase.store(0, Ordering::Release);
        header.vready.store(0, Ordering::Release);
        header.vpending.store(0, Ordering::Release);
        header.aready.store(0, Ordering::Release);
        header.apending.store(0, Ordering::Release);
        header.vpts.store(0, Ordering::Release);
        header.apts.store(0, Ordering::Release);
        header.parent_pid.store(std::process::id(), Ordering::Release);
        header.child_pid.store(0, Ordering::Release);
        Ok(())
    }

    /// Borrows the page header.
    pub fn header(&self) -> &PageHeader {
        self.region.prefix()
    }

    /// The child-outbound, parent-inbound event ring.
    pub fn childevq(&self) -> &EventQueue {
        let offsets = self.current_offsets();
        self.region.slice::<EventQueue>(offsets.childevq, 1).first().expect(
            "ring slice of length 1 always yields exactly one element",
        )
    }

    /// The parent-outbound, child-inbound event ring.
    pub fn parentevq(&self) -> &EventQueue {
        let offsets = self.current_offsets();
        self.region.slice::<EventQueue>(offsets.parentevq, 1).first().expect(
            "ring slice of length 1 always yields exactly one element",
        )
    }

    /// Immutable view of the audio buffer at its current negotiated size.
    pub fn audio_buffer(&self) -> &[u8] {
        let offsets = self.current_offsets();
        let header = self.header();
        let len = header.abufsize.load(Ordering::Acquire) as usize;
        self.region.slice::<u8>(offsets.audio, len)
    }

    /// Mutable view of the audio buffer at its current negotiated size.
    pub fn audio_buffer_mut(&mut self) -> &mut [u8] {
        let offsets = self.current_offsets();
        let len = self.header().abufsize.load(Ordering::Acquire) as usize;
        self.region.slice_mut::<u8>(offsets.audio, len)
    }

    /// Immutable view of the video buffer at its current negotiated
    /// geometry.
    pub fn video_buffer(&self) -> &[u8] {
        let offsets = self.current_offsets();
        let header = self.header();
        let w = header.w.load(Ordering::Acquire) as usize;
        let h = header.h.load(Ordering::Acquire) as usize;
        self.region.slice::<u8>(offsets.video, w * h * BYTES_PER_PIXEL)
    }

    /// Mutable view of the video buffer at its current negotiated geometry.
    pub fn video_buffer_mut(&mut self) -> &mut [u8] {
        let offsets = self.current_offsets();
        let header = self.header();
        let w = header.w.load(Ordering::Acquire) as usize;
        let h = header.h.load(Ordering::Acquire) as usize;
        self.region
            .slice_mut::<u8>(offsets.video, w * h * BYTES_PER_PIXEL)
    }

    /// Recomputes this page's current section offsets from its header's
    /// live `w`, `h`, and `abufsize`.
    pub fn current_offsets(&self) -> PageOffsets {
        let header = self.header();
        calc_offsets(
            header.w.load(Ordering::Acquire),
            header.h.load(Ordering::Acquire),
            header.abufsize.load(Ordering::Acquire) as usize,
        )
    }

    /// `integrity_check(page) -> bool` from base spec §4.1: verifies
    /// cookie, ABI version, and bounded sizes. Run on every guard tick, (ii)
    /// before every transfer on the parent side, and (iii) periodically
    /// from the child.
    pub fn integrity_check(&self) -> TransportResult<()> {
        let header = self.header();

        if header.major != ABI_MAJOR || header.minor != ABI_MINOR {
            return Err(TransportError::Corruption("ABI version mismatch"));
        }
        if header.cookie.load(Ordering::Acquire) != compute_cookie() {
            return Err(TransportError::Corruption("cookie mismatch"));
        }

        let w = header.w.load(Ordering::Acquire);
        let h = header.h.load(Ordering::Acquire);
        if w > MAX_W || h > MAX_H {
            return Err(TransportError::Corruption("geometry exceeds maximum bounds"));
        }

        let abufsize = header.abufsize.load(Ordering::Acquire) as usize;
        let segment_size = header.segment_size.load(Ordering::Acquire) as usize;
        let offsets = calc_offsets(w, h, abufsize);
        if offsets.total > segment_size {
            return Err(TransportError::Corruption(
                "computed layout exceeds declared segment size",
            ));
        }
        if offsets.total > self.region.len() {
            return Err(TransportError::Corruption(
                "computed layout exceeds mapped region length",
            ));
        }

        Ok(())
    }

    /// Requests a geometry/audio-buffer change. Sets `resized`, stores the
    /// proposed `w`/`h`/`abufsize`, leaving the consumer to validate and
    /// either accept (clearing `resized`) or decline (clearing `resized`
    /// without adopting the new geometry) — see `frameserver-proto::resize`.
    pub fn propose_resize(&mut self, w: u32, h: u32, abufsize: usize) -> TransportResult<()> {
        if w == 0 || h == 0 || w > MAX_W || h > MAX_H {
            return Err(TransportError::ResizeDeclined(
                "proposed geometry exceeds configured bounds",
            ));
        }
        let segment_size = self.header().segment_size.load(Ordering::Acquire) as usize;
        let offsets = calc_offsets(w, h, abufsize);
        if offsets.total > segment_size {
            return Err(TransportError::ResizeDeclined(
                "proposed geometry exceeds the reserved segment",
            ));
        }

        let header = self.region.prefix_mut::<PageHeader>();
        header.w.store(w, Ordering::Release);
        header.h.store(h, Ordering::Release);
        header.abufsize.store(abufsize as u32, Ordering::Release);
        header.resized.store(1, Ordering::Release);
        Ok(())
    }

    /// Clears `resized` after adopting (or declining) the proposed geometry.
    pub fn acknowledge_resize(&self) {
        self.header().resized.store(0, Ordering::Release);
    }
}
