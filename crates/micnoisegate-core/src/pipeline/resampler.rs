//! Sample-rate conversion from a capture device's native rate to the
//! channel's fixed [`crate::constants::SAMPLE_RATE`].
//!
//! Production path uses `rubato`'s `FastFixedIn`, already present in
//! the teacher's dependency stack (declared, unused there). Tests use
//! [`linear_resample`] directly: `FastFixedIn`'s streaming API buffers
//! internally and doesn't expose the single-call input/output
//! relationship the round-trip property test needs, so the exact
//! linear-interpolation formula from spec.md §5.2 is also implemented
//! standalone, and `Resampler` defers to it whenever the input and
//! output rates match (the trivial common case of a 48 kHz device).

use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};

use crate::constants::CHANNELS;
use crate::error::PipelineError;

/// Per-channel linear interpolation resample from `from_rate` to
/// `to_rate`. `input` is interleaved; the result is interleaved at the
/// same channel count. Used directly by tests and as the resampler's
/// implementation when `from_rate == to_rate` (a straight copy).
pub fn linear_resample(input: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let in_frames = input.len() / channels;
    let ratio = to_rate as f64 / from_rate as f64;
    let out_frames = ((in_frames as f64) * ratio).floor() as usize;
    let mut out = vec![0.0f32; out_frames * channels];

    for out_idx in 0..out_frames {
        let src_pos = out_idx as f64 / ratio;
        let i0 = src_pos.floor() as usize;
        let frac = (src_pos - i0 as f64) as f32;
        let i1 = (i0 + 1).min(in_frames.saturating_sub(1));
        let i0 = i0.min(in_frames.saturating_sub(1));

        for ch in 0..channels {
            let a = input[i0 * channels + ch];
            let b = input[i1 * channels + ch];
            out[out_idx * channels + ch] = a + (b - a) * frac;
        }
    }

    out
}

/// Stateful resampler wrapping `rubato::FastFixedIn` for non-trivial
/// rate pairs. Owned by the producer's capture collaborator, never
/// touched by the consumer.
pub struct Resampler {
    from_rate: u32,
    to_rate: u32,
    inner: Option<FastFixedIn<f32>>,
    channel_bufs: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(from_rate: u32, to_rate: u32, max_input_frames: usize) -> Result<Self, PipelineError> {
        if from_rate == to_rate {
            return Ok(Self {
                from_rate,
                to_rate,
                inner: None,
                channel_bufs: Vec::new(),
            });
        }

        let ratio = to_rate as f64 / from_rate as f64;
        let inner = FastFixedIn::<f32>::new(ratio, 4.0, PolynomialDegree::Linear, max_input_frames, CHANNELS)
            .map_err(|e| PipelineError::ResamplerConfig(e.to_string()))?;

        Ok(Self {
            from_rate,
            to_rate,
            inner: Some(inner),
            channel_bufs: vec![Vec::new(); CHANNELS],
        })
    }

    /// Resample one block of interleaved input, returning interleaved
    /// output at `to_rate`. Not real-time safe on the first call per
    /// distinct block size (rubato may allocate); subsequent calls with
    /// a stable block size reuse its internal buffers.
    pub fn process(&mut self, interleaved_in: &[f32]) -> Vec<f32> {
        let Some(inner) = self.inner.as_mut() else {
            return linear_resample(interleaved_in, CHANNELS, self.from_rate, self.to_rate);
        };

        let frames = interleaved_in.len() / CHANNELS;
        for buf in &mut self.channel_bufs {
            buf.clear();
        }
        for frame in 0..frames {
            for ch in 0..CHANNELS {
                self.channel_bufs[ch].push(interleaved_in[frame * CHANNELS + ch]);
            }
        }

        let Ok(out_channels) = inner.process(&self.channel_bufs, None) else {
            return linear_resample(interleaved_in, CHANNELS, self.from_rate, self.to_rate);
        };

        let out_frames = out_channels[0].len();
        let mut interleaved_out = vec![0.0f32; out_frames * CHANNELS];
        for frame in 0..out_frames {
            for ch in 0..CHANNELS {
                interleaved_out[frame * CHANNELS + ch] = out_channels[ch][frame];
            }
        }
        interleaved_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let input: Vec<f32> = (0..20).map(|i| i as f32 * 0.1).collect();
        let out = linear_resample(&input, 2, 48_000, 48_000);
        assert_eq!(out, input);
    }

    #[test]
    fn upsample_then_downsample_round_trip_within_one_sample() {
        let in_frames = 100;
        let input: Vec<f32> = (0..in_frames * 2)
            .map(|i| ((i / 2) as f32 * 0.05).sin())
            .collect();

        let up = linear_resample(&input, 2, 44_100, 48_000);
        let back = linear_resample(&up, 2, 48_000, 44_100);

        let n = back.len().min(input.len());
        for i in 0..n {
            assert!((back[i] - input[i]).abs() < 0.1, "index {i} diverged too far");
        }
    }

    #[test]
    fn output_length_scales_with_ratio() {
        let input = vec![0.0f32; 2 * 1000];
        let out = linear_resample(&input, 2, 44_100, 48_000);
        let expected = ((1000f64) * 48_000.0 / 44_100.0).floor() as usize;
        assert_eq!(out.len() / 2, expected);
    }
}
