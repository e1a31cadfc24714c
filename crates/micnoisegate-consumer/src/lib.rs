//! Virtual-audio-device plug-in surface: a thin, panic-guarded C ABI
//! wrapper around [`ConsumerReader`] that a host daemon dlopen's and
//! calls from its own real-time render thread, per spec.md §6.

pub mod reader;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, Once};

use reader::{ConsumerReader, ReconnectPolicy};

static INIT_LOG: Once = Once::new();

fn reader_cell() -> &'static Mutex<ConsumerReader> {
    static CELL: std::sync::OnceLock<Mutex<ConsumerReader>> = std::sync::OnceLock::new();
    CELL.get_or_init(|| Mutex::new(ConsumerReader::new(ReconnectPolicy::default())))
}

/// Host-daemon render callback. `out` is interleaved, `frames` frames
/// at [`micnoisegate_core::constants::CHANNELS`] channels each.
/// Returns `1` if real audio was written, `0` if the callback served
/// silence (no producer, inactive producer, or underrun) — the host
/// should treat both as "the call always succeeds", since there is no
/// failure mode that should ever stop this callback from returning.
///
/// # Safety
/// `out` must point to at least `frames * CHANNELS` valid, writable
/// `f32`s. Must not be called reentrantly from two threads at once
/// (the plug-in has exactly one render thread per spec.md §3).
#[no_mangle]
pub unsafe extern "C" fn micnoisegate_read_callback(out: *mut f32, frames: u32) -> i32 {
    INIT_LOG.call_once(|| {
        let _ = env_logger::try_init();
    });

    if out.is_null() || frames == 0 {
        return 0;
    }

    let channels = micnoisegate_core::constants::CHANNELS;
    let len = frames as usize * channels;
    let slice = std::slice::from_raw_parts_mut(out, len);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut guard = reader_cell().lock().unwrap_or_else(|p| p.into_inner());
        guard.read_frames(slice, frames as usize)
    }));

    match result {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(_) => {
            // A panic inside the reader leaves `slice` in an unknown
            // state; zero it so the host never plays garbage.
            slice.fill(0.0);
            0
        }
    }
}

/// Explicit teardown hook for the host daemon to call on unload, so
/// the next load starts from a fresh reconnect cycle instead of a
/// stale, possibly-disconnected one.
#[no_mangle]
pub extern "C" fn micnoisegate_shutdown() {
    if let Ok(mut guard) = reader_cell().lock() {
        *guard = ConsumerReader::new(ReconnectPolicy::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_rejects_null_pointer() {
        let result = unsafe { micnoisegate_read_callback(std::ptr::null_mut(), 480) };
        assert_eq!(result, 0);
    }

    #[test]
    fn callback_rejects_zero_frames() {
        let mut buf = vec![1.0f32; 2];
        let result = unsafe { micnoisegate_read_callback(buf.as_mut_ptr(), 0) };
        assert_eq!(result, 0);
    }

    #[test]
    fn callback_serves_silence_without_a_producer() {
        let mut buf = vec![9.0f32; 480 * 2];
        let result = unsafe { micnoisegate_read_callback(buf.as_mut_ptr(), 480) };
        assert_eq!(result, 0);
        assert!(buf.iter().all(|&s| s == 0.0));
    }
}
