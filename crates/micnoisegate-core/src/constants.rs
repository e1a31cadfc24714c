//! Compile-time constants shared by both halves of the channel protocol.
//!
//! These are part of the external interface: the producer and consumer
//! are built independently and must agree on every value here without
//! negotiating anything at runtime.

use std::mem::size_of;

/// Fixed consumer stream sample rate, in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// Fixed consumer channel count (stereo).
pub const CHANNELS: usize = 2;

/// Ring capacity in frames (~85 ms at 48 kHz).
pub const RING_FRAMES: usize = 4096;

/// Frame size required by the denoise pipeline (10 ms at 48 kHz).
pub const DENOISE_FRAME: usize = 480;

/// Rendezvous name for the shared channel. Must begin with `/` (POSIX
/// shm semantics).
pub const CHANNEL_NAME: &str = "/micnoisegate_audio";

/// Byte size of the fixed header region (see `channel::header::Header`).
pub const HEADER_SIZE: usize = 68;

/// Byte size of the audio ring (`RING_FRAMES` frames x `CHANNELS` x f32).
pub const RING_BYTES: usize = RING_FRAMES * CHANNELS * size_of::<f32>();

/// Total byte size of the shared channel region.
pub const CHANNEL_TOTAL_SIZE: usize = HEADER_SIZE + RING_BYTES;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_size_matches_header_plus_ring() {
        assert_eq!(CHANNEL_TOTAL_SIZE, HEADER_SIZE + RING_FRAMES * CHANNELS * 4);
    }

    #[test]
    fn channel_name_is_posix_shm_style() {
        assert!(CHANNEL_NAME.starts_with('/'));
    }
}
