//! Fixed, little-endian, naturally aligned header layout.
//!
//! Field offsets are part of the wire contract: the producer and
//! consumer are independently built binaries that both read this
//! struct directly out of the mapped shared memory region. Do not
//! reorder fields, change their sizes, or rely on `size_of::<Header>()`
//! for addressing anything that follows the header in the mapped
//! region — use [`crate::constants::HEADER_SIZE`] instead, since
//! `repr(C)` may add trailing padding this type's own size that the
//! wire layout does not reserve.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::constants::{CHANNELS, RING_FRAMES, SAMPLE_RATE};

/// Offset, in bytes, of each field. Kept as named constants so tests
/// and documentation stay in sync with the struct definition.
pub mod offsets {
    pub const WRITE_INDEX: usize = 0;
    pub const READ_INDEX: usize = 8;
    pub const IS_ACTIVE: usize = 16;
    pub const SAMPLE_RATE: usize = 24;
    pub const CHANNELS: usize = 28;
    pub const RING_FRAMES: usize = 32;
    pub const AUDIO_DATA: usize = 68;
}

#[repr(C)]
pub struct Header {
    /// Monotonic frame counter, producer-owned, atomic. Offset 0.
    pub write_index: AtomicU64,
    /// Monotonic frame counter, consumer-owned, atomic. Offset 8.
    pub read_index: AtomicU64,
    /// 0/1 producer liveness flag, atomic. Offset 16.
    pub is_active: AtomicU8,
    /// Zero. Offset 17, 7 bytes.
    _reserved: [u8; 7],
    /// Constant 48000. Offset 24.
    pub sample_rate: AtomicU32,
    /// Constant 2. Offset 28.
    pub channels: AtomicU32,
    /// Constant 4096. Offset 32.
    pub ring_frames: AtomicU32,
    /// Zero; reserves the remainder of the header cache line(s). Offset 36, 32 bytes.
    _padding: [u8; 32],
}

const _: () = assert!(std::mem::offset_of!(Header, write_index) == offsets::WRITE_INDEX);
const _: () = assert!(std::mem::offset_of!(Header, read_index) == offsets::READ_INDEX);
const _: () = assert!(std::mem::offset_of!(Header, is_active) == offsets::IS_ACTIVE);
const _: () = assert!(std::mem::offset_of!(Header, sample_rate) == offsets::SAMPLE_RATE);
const _: () = assert!(std::mem::offset_of!(Header, channels) == offsets::CHANNELS);
const _: () = assert!(std::mem::offset_of!(Header, ring_frames) == offsets::RING_FRAMES);

impl Header {
    /// Initialize a freshly created header in place.
    ///
    /// # Safety
    /// `ptr` must point to at least [`crate::constants::HEADER_SIZE`]
    /// writable bytes, properly aligned for `Header`.
    pub unsafe fn init_in_place(ptr: *mut Header) {
        std::ptr::write_bytes(ptr as *mut u8, 0, crate::constants::HEADER_SIZE);
        let header = &*ptr;
        header.write_index.store(0, Ordering::Relaxed);
        header.read_index.store(0, Ordering::Relaxed);
        header.is_active.store(0, Ordering::Relaxed);
        header.sample_rate.store(SAMPLE_RATE, Ordering::Relaxed);
        header.channels.store(CHANNELS as u32, Ordering::Relaxed);
        header.ring_frames.store(RING_FRAMES as u32, Ordering::Relaxed);
    }

    /// Validate that a mapped header matches the compile-time constants
    /// this binary was built with. (I1 in spec.md §3.)
    pub fn validate(&self) -> Result<(), String> {
        let sample_rate = self.sample_rate.load(Ordering::Relaxed);
        let channels = self.channels.load(Ordering::Relaxed);
        let ring_frames = self.ring_frames.load(Ordering::Relaxed);

        if sample_rate != SAMPLE_RATE {
            let msg = format!("sample_rate mismatch: expected {SAMPLE_RATE}, found {sample_rate}");
            log::debug!("{msg}");
            return Err(msg);
        }
        if channels != CHANNELS as u32 {
            let msg = format!("channels mismatch: expected {CHANNELS}, found {channels}");
            log::debug!("{msg}");
            return Err(msg);
        }
        if ring_frames != RING_FRAMES as u32 {
            let msg = format!("ring_frames mismatch: expected {RING_FRAMES}, found {ring_frames}");
            log::debug!("{msg}");
            return Err(msg);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_no_larger_than_expected_plus_alignment_padding() {
        // size_of may round up to the 8-byte alignment of the AtomicU64
        // fields; it must never be smaller than the wire HEADER_SIZE.
        assert!(std::mem::size_of::<Header>() >= crate::constants::HEADER_SIZE);
    }

    #[test]
    fn init_then_validate_round_trips() {
        let mut backing = vec![0xFFu8; crate::constants::HEADER_SIZE];
        let ptr = backing.as_mut_ptr() as *mut Header;
        unsafe {
            Header::init_in_place(ptr);
            assert!((*ptr).validate().is_ok());
            assert_eq!((*ptr).write_index.load(Ordering::Relaxed), 0);
            assert_eq!((*ptr).read_index.load(Ordering::Relaxed), 0);
            assert_eq!((*ptr).is_active.load(Ordering::Relaxed), 0);
        }
    }

    #[test]
    fn validate_rejects_wrong_sample_rate() {
        let mut backing = vec![0u8; crate::constants::HEADER_SIZE];
        let ptr = backing.as_mut_ptr() as *mut Header;
        unsafe {
            Header::init_in_place(ptr);
            (*ptr).sample_rate.store(44_100, Ordering::Relaxed);
            assert!((*ptr).validate().is_err());
        }
    }
}
