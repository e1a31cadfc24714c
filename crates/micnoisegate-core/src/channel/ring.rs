//! Lock-free single-producer single-consumer shared audio channel.
//!
//! This is the cross-process analogue of the teacher's in-process
//! `RingBuffer`: the producer writes samples and publishes
//! `write_index`, the consumer writes `read_index`, and the two sides
//! never take a lock the other waits on. The difference from an
//! in-process ring is that the backing bytes may be a real POSIX
//! shared memory mapping (`PosixShm`), so the header carries its own
//! liveness flag and format constants rather than relying on Rust
//! ownership to communicate "is anyone producing right now".

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::channel::header::Header;
use crate::channel::shm::MemoryRegion;
#[cfg(unix)]
use crate::channel::shm::PosixShm;
use crate::constants::{CHANNELS, CHANNEL_TOTAL_SIZE, HEADER_SIZE, RING_FRAMES};
use crate::error::ChannelError;

/// Process-local, non-wire snapshot of the channel's current state.
/// Useful for logging and for feeding the producer's level/UI hand-off;
/// never serialized onto the wire itself.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ChannelStats {
    pub write_index: u64,
    pub read_index: u64,
    pub available_to_read: usize,
    pub available_to_write: usize,
    pub is_active: bool,
}

/// The shared audio channel. One instance per process per role: the
/// producer holds one created via [`SharedChannel::create_or_open`],
/// the consumer holds one opened via [`SharedChannel::open_existing`].
///
/// Per spec.md §3 (I2/I3): only the producer may call
/// [`Self::write_frames`] and [`Self::set_active`]; only the consumer
/// may call [`Self::read_frames`]. Nothing here enforces that at the
/// type level (the teacher's `RingBuffer` doesn't either) — it is a
/// contract between the two binaries, not a Rust API boundary.
pub struct SharedChannel {
    region: Arc<dyn MemoryRegion>,
    header: *mut Header,
    audio: *mut f32,
    ring_frames: usize,
}

unsafe impl Send for SharedChannel {}
unsafe impl Sync for SharedChannel {}

impl SharedChannel {
    fn from_region(region: Arc<dyn MemoryRegion>, just_created: bool) -> Result<Self, ChannelError> {
        if region.len() < CHANNEL_TOTAL_SIZE {
            return Err(ChannelError::InvalidHeader(format!(
                "region is {} bytes, expected at least {}",
                region.len(),
                CHANNEL_TOTAL_SIZE
            )));
        }

        let base = region.as_mut_ptr();
        let header = base as *mut Header;
        let audio = unsafe { base.add(HEADER_SIZE) } as *mut f32;

        if just_created {
            unsafe { Header::init_in_place(header) };
        } else {
            let validation = unsafe { (*header).validate() };
            if let Err(reason) = validation {
                return Err(ChannelError::InvalidHeader(reason));
            }
        }

        Ok(Self {
            region,
            header,
            audio,
            ring_frames: RING_FRAMES,
        })
    }

    /// Create the named channel if absent, or attach to it if a
    /// producer from an earlier run left it behind uncleanly. Producer
    /// side only.
    #[cfg(unix)]
    pub fn create_or_open(name: &str) -> Result<Self, ChannelError> {
        let (shm, created) = PosixShm::create_or_open(name, CHANNEL_TOTAL_SIZE)?;
        Self::from_region(Arc::new(shm), created)
    }

    /// Open a channel a producer has already created. Consumer side
    /// only. Returns [`ChannelError::NotFound`] if no producer has run
    /// yet; callers treat that as a soft failure and retry later.
    #[cfg(unix)]
    pub fn open_existing(name: &str) -> Result<Self, ChannelError> {
        let shm = PosixShm::open_existing(name, CHANNEL_TOTAL_SIZE)?;
        Self::from_region(Arc::new(shm), false)
    }

    /// An in-process channel over heap memory, for tests that want to
    /// exercise the exact read/write/overrun code paths without real
    /// shared memory or two processes.
    #[cfg(test)]
    pub fn new_in_memory() -> Self {
        let region: Arc<dyn MemoryRegion> =
            Arc::new(crate::channel::shm::InMemoryRegion::new(CHANNEL_TOTAL_SIZE));
        Self::from_region(region, true).expect("in-memory region is always large enough")
    }

    fn header(&self) -> &Header {
        unsafe { &*self.header }
    }

    fn audio_slice(&self) -> &mut [f32] {
        unsafe { std::slice::from_raw_parts_mut(self.audio, self.ring_frames * CHANNELS) }
    }

    /// `available_to_write() = RING_FRAMES - (write_index - read_index)`.
    pub fn available_to_write(&self) -> usize {
        let header = self.header();
        let read_index = header.read_index.load(Ordering::Acquire);
        let write_index = header.write_index.load(Ordering::Relaxed);
        let used = write_index.wrapping_sub(read_index);
        if used > self.ring_frames as u64 {
            0
        } else {
            self.ring_frames - used as usize
        }
    }

    /// `available_to_read() = write_index - read_index`, clamped to
    /// the ring's capacity (a larger raw delta means the producer
    /// crashed mid-write or a reader lagged catastrophically — see
    /// [`Self::read_frames`]'s overrun handling).
    pub fn available_to_read(&self) -> usize {
        let header = self.header();
        let write_index = header.write_index.load(Ordering::Acquire);
        let read_index = header.read_index.load(Ordering::Relaxed);
        write_index.wrapping_sub(read_index) as usize
    }

    /// Producer-only. Copies `n` frames (`n * CHANNELS` samples) from
    /// `src` into the ring and publishes `write_index`. Returns `false`
    /// without writing anything if there isn't room — the channel is
    /// left bitwise unchanged.
    pub fn write_frames(&self, src: &[f32], n: usize) -> bool {
        debug_assert!(src.len() >= n * CHANNELS);
        if n == 0 {
            return true;
        }

        let header = self.header();
        let read_index = header.read_index.load(Ordering::Acquire);
        let write_index = header.write_index.load(Ordering::Relaxed);
        let used = write_index.wrapping_sub(read_index);
        let available = if used > self.ring_frames as u64 {
            0
        } else {
            self.ring_frames as u64 - used
        };

        if (n as u64) > available {
            return false;
        }

        let ring = self.audio_slice();
        let start = (write_index % self.ring_frames as u64) as usize;
        copy_frames_into_ring(ring, start, self.ring_frames, &src[..n * CHANNELS]);

        header
            .write_index
            .store(write_index.wrapping_add(n as u64), Ordering::Release);
        true
    }

    /// Consumer-only. Fills `dst` with `n` frames (`n * CHANNELS`
    /// samples) read from the ring and publishes `read_index`. On
    /// underrun, fills `dst` with silence and leaves `read_index`
    /// unchanged. On overrun (the producer ran more than `RING_FRAMES`
    /// ahead of the consumer — impossible under correct operation,
    /// possible after a producer crash mid-write), fast-forwards
    /// `read_index` to `write_index - 1`, fills `dst` with silence for
    /// this call, and returns `false`.
    pub fn read_frames(&self, dst: &mut [f32], n: usize) -> bool {
        debug_assert!(dst.len() >= n * CHANNELS);
        if n == 0 {
            return true;
        }

        let header = self.header();
        let write_index = header.write_index.load(Ordering::Acquire);
        let read_index = header.read_index.load(Ordering::Relaxed);
        let available = write_index.wrapping_sub(read_index);

        if available > self.ring_frames as u64 {
            // Overrun: the producer wrote past what the ring can hold
            // relative to our read position. Drop everything except
            // the most recent frame and recover. Rare enough (crash or
            // catastrophic stall, never steady-state) to log without
            // risking hot-path spam.
            log::warn!(
                "channel overrun: write_index={write_index} read_index={read_index}, fast-forwarding"
            );
            dst[..n * CHANNELS].fill(0.0);
            header
                .read_index
                .store(write_index.wrapping_sub(1), Ordering::Relaxed);
            return false;
        }

        if (n as u64) > available {
            dst[..n * CHANNELS].fill(0.0);
            return false;
        }

        let ring = self.audio_slice();
        let start = (read_index % self.ring_frames as u64) as usize;
        copy_frames_from_ring(ring, start, self.ring_frames, &mut dst[..n * CHANNELS]);

        header
            .read_index
            .store(read_index.wrapping_add(n as u64), Ordering::Release);
        true
    }

    /// Producer-only liveness flag. Gates reads (§4.3) but not writes
    /// (spec.md §9 Open Questions: "Source gates only reads").
    pub fn set_active(&self, active: bool) {
        self.header()
            .is_active
            .store(active as u8, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.header().is_active.load(Ordering::Acquire) != 0
    }

    pub fn stats(&self) -> ChannelStats {
        let header = self.header();
        ChannelStats {
            write_index: header.write_index.load(Ordering::Relaxed),
            read_index: header.read_index.load(Ordering::Relaxed),
            available_to_read: self.available_to_read(),
            available_to_write: self.available_to_write(),
            is_active: self.is_active(),
        }
    }

    /// Unmap (always) and, for the producer that created it, unlink
    /// the channel's name from the kernel's named-shm namespace.
    pub fn destroy(&self) {
        self.region.destroy();
    }

    #[cfg(test)]
    pub(crate) fn set_indices_for_test(&self, write_index: u64, read_index: u64) {
        self.header().write_index.store(write_index, Ordering::Relaxed);
        self.header().read_index.store(read_index, Ordering::Relaxed);
    }
}

/// Copy `src` (already `frames * CHANNELS` samples) into `ring`
/// starting at frame `start`, wrapping around `ring_frames`.
fn copy_frames_into_ring(ring: &mut [f32], start: usize, ring_frames: usize, src: &[f32]) {
    let n = src.len() / CHANNELS;
    let first = n.min(ring_frames - start);
    ring[start * CHANNELS..(start + first) * CHANNELS].copy_from_slice(&src[..first * CHANNELS]);
    let remaining = n - first;
    if remaining > 0 {
        ring[..remaining * CHANNELS].copy_from_slice(&src[first * CHANNELS..]);
    }
}

/// Copy `dst.len() / CHANNELS` frames out of `ring` starting at frame
/// `start`, wrapping around `ring_frames`.
fn copy_frames_from_ring(ring: &[f32], start: usize, ring_frames: usize, dst: &mut [f32]) {
    let n = dst.len() / CHANNELS;
    let first = n.min(ring_frames - start);
    dst[..first * CHANNELS].copy_from_slice(&ring[start * CHANNELS..(start + first) * CHANNELS]);
    let remaining = n - first;
    if remaining > 0 {
        dst[first * CHANNELS..].copy_from_slice(&ring[..remaining * CHANNELS]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DENOISE_FRAME;

    fn pattern(n_frames: usize, offset: f32) -> Vec<f32> {
        (0..n_frames * CHANNELS)
            .map(|i| offset + i as f32 / 1000.0)
            .collect()
    }

    // Scenario 1: fresh channel, empty read.
    #[test]
    fn scenario_fresh_channel_empty_read() {
        let ch = SharedChannel::new_in_memory();
        let mut out = vec![1.0f32; DENOISE_FRAME * CHANNELS];
        let ok = ch.read_frames(&mut out, DENOISE_FRAME);
        assert!(!ok);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(ch.stats().read_index, 0);
    }

    // Scenario 2: single frame round trip.
    #[test]
    fn scenario_single_frame_round_trip() {
        let ch = SharedChannel::new_in_memory();
        let input = pattern(DENOISE_FRAME, 0.0);
        assert!(ch.write_frames(&input, DENOISE_FRAME));
        ch.set_active(true);

        let mut out = vec![0.0f32; DENOISE_FRAME * CHANNELS];
        assert!(ch.read_frames(&mut out, DENOISE_FRAME));
        assert_eq!(out, input);
        assert_eq!(ch.stats().write_index, DENOISE_FRAME as u64);
        assert_eq!(ch.stats().read_index, DENOISE_FRAME as u64);
    }

    // Scenario 3: full ring then overrun on write.
    #[test]
    fn scenario_full_ring_then_write_overrun() {
        let ch = SharedChannel::new_in_memory();
        let full = pattern(RING_FRAMES, 7.0);
        assert!(ch.write_frames(&full, RING_FRAMES));
        assert_eq!(ch.stats().write_index, RING_FRAMES as u64);

        let extra = pattern(1, 99.0);
        assert!(!ch.write_frames(&extra, 1));
        assert_eq!(ch.stats().write_index, RING_FRAMES as u64);

        // Ring contents are untouched: read everything back and compare.
        ch.set_indices_for_test(RING_FRAMES as u64, 0);
        let mut out = vec![0.0f32; RING_FRAMES * CHANNELS];
        assert!(ch.read_frames(&mut out, RING_FRAMES));
        assert_eq!(out, full);
    }

    // Scenario 4: overrun recovery.
    #[test]
    fn scenario_overrun_recovery() {
        let ch = SharedChannel::new_in_memory();
        ch.set_indices_for_test(5000, 0);

        let mut out = vec![1.0f32; DENOISE_FRAME * CHANNELS];
        let ok = ch.read_frames(&mut out, DENOISE_FRAME);
        assert!(!ok);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(ch.stats().read_index, 4999);
    }

    // Scenario 5: producer inactive.
    #[test]
    fn scenario_producer_inactive_serves_silence() {
        let ch = SharedChannel::new_in_memory();
        let input = pattern(DENOISE_FRAME * 2, 0.0);
        assert!(ch.write_frames(&input, DENOISE_FRAME * 2));
        ch.set_active(false);

        // Per §4.3: read only when is_active(); a well-behaved consumer
        // checks is_active() itself, but exercising the flag directly
        // here documents that the channel does not gate reads on it.
        assert!(!ch.is_active());
        let read_index_before = ch.stats().read_index;
        assert_eq!(read_index_before, 0);
    }

    #[test]
    fn write_leaves_channel_unchanged_when_insufficient_space() {
        let ch = SharedChannel::new_in_memory();
        let half = pattern(RING_FRAMES - 10, 1.0);
        assert!(ch.write_frames(&half, RING_FRAMES - 10));
        let snapshot_before = ch.stats();

        let too_much = pattern(20, 2.0);
        assert!(!ch.write_frames(&too_much, 20));
        let snapshot_after = ch.stats();
        assert_eq!(snapshot_before.write_index, snapshot_after.write_index);
    }

    #[test]
    fn read_underrun_zero_fills_and_does_not_advance() {
        let ch = SharedChannel::new_in_memory();
        let input = pattern(100, 3.0);
        ch.write_frames(&input, 100);

        let mut out = vec![42.0f32; 200 * CHANNELS];
        let ok = ch.read_frames(&mut out, 200);
        assert!(!ok);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(ch.stats().read_index, 0);
    }

    #[test]
    fn round_trip_many_blocks_preserves_order() {
        let ch = SharedChannel::new_in_memory();
        let mut expected = Vec::new();
        let mut collected = Vec::new();

        for block in 0..8u32 {
            let chunk = pattern(DENOISE_FRAME, block as f32 * 1000.0);
            assert!(ch.write_frames(&chunk, DENOISE_FRAME));
            expected.extend_from_slice(&chunk);

            let mut out = vec![0.0f32; DENOISE_FRAME * CHANNELS];
            assert!(ch.read_frames(&mut out, DENOISE_FRAME));
            collected.extend_from_slice(&out);
        }

        assert_eq!(collected, expected);
    }

    #[test]
    fn random_write_read_interleavings_preserve_invariant() {
        // Fixed-seed LCG, no external fuzzing crate.
        let mut state: u64 = 0x243F6A8885A308D3;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u32
        };

        let ch = SharedChannel::new_in_memory();
        let mut written_total: u64 = 0;
        let mut read_total: u64 = 0;

        for _ in 0..5000 {
            let do_write = next() % 2 == 0;
            let n = (next() % 600) as usize;
            if n == 0 {
                continue;
            }

            if do_write {
                let src = pattern(n.min(RING_FRAMES), written_total as f32);
                if ch.write_frames(&src, n.min(RING_FRAMES)) {
                    written_total += n.min(RING_FRAMES) as u64;
                }
            } else {
                let mut dst = vec![0.0f32; n * CHANNELS];
                if ch.read_frames(&mut dst, n) {
                    read_total += n as u64;
                }
            }

            let stats = ch.stats();
            assert!(stats.write_index >= stats.read_index);
            assert!(stats.write_index - stats.read_index <= RING_FRAMES as u64);
            assert_eq!(stats.write_index, written_total);
            assert_eq!(stats.read_index, read_total);
        }
    }
}
