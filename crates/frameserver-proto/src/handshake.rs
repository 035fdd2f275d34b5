//! Connection handshake (base spec §6) and the spawn envelope.
//!
//! The key-to-semaphore-name scheme base spec describes (`<key>v`, `<key>a`,
//! `<key>e` as separate named OS semaphores) collapses here: the three
//! semaphores are embedded `AtomicU32` words in the page header (see
//! `frameserver-transport::semaphore`), so the key only ever resolves to one
//! filesystem path both sides map. Everything else about the handshake
//! (key length bound, `force_unlink`, the one synchronous wait-on-V
//! cookie/version check before the child proceeds) is preserved.

use crate::error::{ProtoError, ProtoResult};
use frameserver_transport::{SharedPage, WaitOutcome, AUDIO_BUFFER_DEFAULT, AUDIO_BUFFER_LEGACY};
use std::path::PathBuf;
use std::time::Duration;

/// Base spec §6: keys are short ASCII strings, at most 32 characters.
pub const MAX_KEY_LEN: usize = 32;

/// Resolves a connection key to the filesystem path both processes map.
/// Keys are expected to already be filesystem-safe (no path separators);
/// this mirrors the original's convention of keying off of
/// `/dev/shm/<key>` on platforms that have it, using the system temp
/// directory as the portable equivalent.
pub fn resolve_path(key: &str) -> ProtoResult<PathBuf> {
    validate_key(key)?;
    Ok(std::env::temp_dir().join(format!("arcan_frameserver_{key}")))
}

fn validate_key(key: &str) -> ProtoResult<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN || !key.is_ascii() {
        return Err(ProtoError::KeyTooLong {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Mode selector for [`SpawnEnvelope`], matching base spec §6's
/// `mode ∈ {movie, libretro, record, net-cl, net-srv}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpawnMode {
    Movie { resource: String },
    Libretro { resource: String },
    Record { resource: String },
    NetClient { resource: String },
    NetServer { resource: String },
    /// Non-builtin: the parent execs an arbitrary command/argv instead of
    /// one of the built-in decoders.
    External { command: String, argv: Vec<String> },
}

/// `spawn(source, { use_builtin, args })` from base spec §6.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnEnvelope {
    pub source_id: u32,
    pub use_builtin: bool,
    pub mode: SpawnMode,
}

/// Parent side of the handshake: creates the page under `key`, with
/// `force_unlink` clearing a stale mapping left by a crashed prior run
/// before creating the new one (the supplemented `force_unlink` behavior
/// from `arcan_frameserver_getshm`).
pub fn create(
    key: &str,
    initial_w: u32,
    initial_h: u32,
    legacy_audio_buffer: bool,
    force_unlink: bool,
) -> ProtoResult<SharedPage> {
    let path = resolve_path(key)?;
    let audio_size = if legacy_audio_buffer {
        AUDIO_BUFFER_LEGACY
    } else {
        AUDIO_BUFFER_DEFAULT
    };
    let page = SharedPage::create_file_backed(&path, initial_w, initial_h, audio_size, force_unlink)?;
    Ok(page)
}

/// Child side of the handshake: maps the page by `key`, then performs the
/// one synchronous wait-on-V / cookie-and-version check before returning
/// control to the caller. `segment_size` must match what the parent
/// allocated, which the child learns out-of-band (environment variable or
/// argv, per base spec §6) alongside the key itself.
pub fn acquire(key: &str, segment_size: usize, handshake_timeout_ms: u32) -> ProtoResult<SharedPage> {
    let path = resolve_path(key)?;
    let page = SharedPage::open_file_backed(&path, segment_size)?;

    match page.header().semaphores.video.wait(handshake_timeout_ms as i32) {
        WaitOutcome::Acquired => {}
        WaitOutcome::TimedOut => return Err(ProtoError::HandshakeTimedOut),
    }

    page.integrity_check()?;
    Ok(page)
}

/// Removes the connection key's backing file, used by either side during
/// teardown once the guard thread has verified the peer is gone.
pub fn unlink(key: &str) -> ProtoResult<()> {
    let path = resolve_path(key)?;
    let _ = std::fs::remove_file(path);
    Ok(())
}

/// Checks whether `path` currently exists, used by tests that simulate a
/// stale key left by a crashed prior run.
pub fn key_path_exists(key: &str) -> bool {
    resolve_path(key).map(|p| p.exists()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_over_limit_is_rejected() {
        let long_key = "x".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            resolve_path(&long_key),
            Err(ProtoError::KeyTooLong { .. })
        ));
    }

    #[test]
    fn create_then_acquire_round_trips_handshake() {
        let key = format!("test-handshake-{}", std::process::id());
        let page = create(&key, 320, 240, false, true).unwrap();
        let segment_size = page.header().segment_size.load(std::sync::atomic::Ordering::Acquire) as usize;

        page.header().semaphores.video.post();

        let child_key = key.clone();
        let child = std::thread::spawn(move || acquire(&child_key, segment_size, 200));
        let acquired = child.join().unwrap().unwrap();
        assert_eq!(
            acquired.header().w.load(std::sync::atomic::Ordering::Acquire),
            320
        );

        unlink(&key).unwrap();
        assert!(!key_path_exists(&key));
    }

    #[test]
    fn acquire_without_a_post_times_out() {
        let key = format!("test-handshake-timeout-{}", std::process::id());
        let page = create(&key, 320, 240, false, true).unwrap();
        let segment_size = page.header().segment_size.load(std::sync::atomic::Ordering::Acquire) as usize;

        let err = acquire(&key, segment_size, 30).unwrap_err();
        assert!(matches!(err, ProtoError::HandshakeTimedOut));
        unlink(&key).unwrap();
    }
}
