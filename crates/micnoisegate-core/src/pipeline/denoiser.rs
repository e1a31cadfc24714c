//! The denoise stage itself. Per spec.md's Non-goals, the actual noise
//! suppression model is out of scope; what belongs here is the seam a
//! real model plugs into, exercised by [`PassthroughTransform`].
//!
//! Shaped after the teacher's `Equalizer`/`BiquadFilter` split in
//! `audio/equalizer.rs`: a small trait processing one channel's worth
//! of per-sample state, driven by an outer loop that demultiplexes the
//! interleaved frame.

use crate::constants::CHANNELS;

/// Scale factor between the pipeline's `[-1, 1]` float domain and the
/// `[-32768, 32767]` domain `FrameTransform` implementations operate
/// in, per spec.md §4.4 stage 4.
const PCM_SCALE: f32 = 32767.0;

/// One exact `DENOISE_FRAME`-frame, per-channel block of samples.
pub trait FrameTransform: Send {
    /// Process `samples` (one channel, one block), scaled to the
    /// `[-32768, 32767]` domain, in place.
    fn process_channel(&mut self, channel: usize, samples: &mut [f32]);

    /// Reset any internal state (e.g. on a capture restart).
    fn reset(&mut self) {}
}

/// No-op transform: copies input to output unchanged. Default wiring
/// until a real model is integrated.
#[derive(Default)]
pub struct PassthroughTransform;

impl FrameTransform for PassthroughTransform {
    fn process_channel(&mut self, _channel: usize, _samples: &mut [f32]) {}
}

/// Runs a [`FrameTransform`] over one interleaved `DENOISE_FRAME`
/// block: de-interleave per channel, transform, re-interleave.
pub struct Denoiser<T: FrameTransform> {
    transform: T,
    scratch: Vec<Vec<f32>>,
}

impl<T: FrameTransform> Denoiser<T> {
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            scratch: vec![Vec::new(); CHANNELS],
        }
    }

    /// `block` is interleaved, exactly `DENOISE_FRAME * CHANNELS` long.
    /// Returns the transformed block, same shape.
    pub fn process(&mut self, block: &[f32]) -> Vec<f32> {
        let frames = block.len() / CHANNELS;
        for ch in 0..CHANNELS {
            let buf = &mut self.scratch[ch];
            buf.clear();
            buf.extend((0..frames).map(|f| block[f * CHANNELS + ch]));
        }

        for ch in 0..CHANNELS {
            let buf = &mut self.scratch[ch];
            for s in buf.iter_mut() {
                *s *= PCM_SCALE;
            }
            self.transform.process_channel(ch, buf);
            for s in buf.iter_mut() {
                *s /= PCM_SCALE;
            }
        }

        let mut out = vec![0.0f32; block.len()];
        for f in 0..frames {
            for ch in 0..CHANNELS {
                out[f * CHANNELS + ch] = self.scratch[ch][f];
            }
        }
        out
    }

    pub fn reset(&mut self) {
        self.transform.reset();
    }
}
