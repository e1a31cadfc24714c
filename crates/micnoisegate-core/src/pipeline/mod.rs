//! The producer-side denoise pipeline: resample -> accumulate ->
//! denoise -> publish, plus the UI level/waveform side channel.
//! See spec.md §5.

mod accumulator;
mod denoiser;
mod levels;
mod resampler;

pub use accumulator::FrameAccumulator;
pub use denoiser::{Denoiser, FrameTransform, PassthroughTransform};
pub use levels::{LevelMeter, LevelSnapshot};
pub use resampler::{linear_resample, Resampler};

use crate::constants::{CHANNELS, DENOISE_FRAME, SAMPLE_RATE};
use crate::error::PipelineError;

/// Ties the pipeline stages together for one capture device. Owned by
/// the producer's capture collaborator; every method runs on the
/// real-time capture callback thread except [`Pipeline::new`] and
/// [`Pipeline::reset`], which may allocate.
pub struct Pipeline<T: FrameTransform> {
    resampler: Resampler,
    accumulator: FrameAccumulator,
    denoiser: Denoiser<T>,
    level_meter: LevelMeter,
}

/// One denoised block plus the level snapshot computed from it, ready
/// to hand to [`crate::channel::SharedChannel::write_frames`] and the
/// UI mailbox respectively.
pub struct PipelineOutput {
    pub block: Vec<f32>,
    pub level: LevelSnapshot,
}

impl<T: FrameTransform> Pipeline<T> {
    pub fn new(transform: T, source_rate: u32, max_input_frames: usize) -> Result<Self, PipelineError> {
        if CHANNELS == 0 {
            return Err(PipelineError::UnsupportedChannelCount(CHANNELS));
        }

        Ok(Self {
            resampler: Resampler::new(source_rate, SAMPLE_RATE, max_input_frames)?,
            accumulator: FrameAccumulator::new(),
            denoiser: Denoiser::new(transform),
            level_meter: LevelMeter::new(),
        })
    }

    /// Feed one captured, interleaved block (native device rate, native
    /// channel count already mixed/duplicated to [`CHANNELS`] by the
    /// caller). Returns zero or more complete `DENOISE_FRAME` outputs —
    /// usually one, occasionally zero while the accumulator fills, and
    /// in principle more than one if the caller passes an oversized
    /// block.
    pub fn process_capture(&mut self, captured: &[f32]) -> Vec<PipelineOutput> {
        let resampled = self.resampler.process(captured);
        let blocks = self.accumulator.push(&resampled);

        blocks
            .into_iter()
            .map(|mut block| {
                let level = self.level_meter.analyze(&block, CHANNELS);
                block = self.denoiser.process(&block);
                PipelineOutput { block, level }
            })
            .collect()
    }

    pub fn pending_frames(&self) -> usize {
        self.accumulator.pending_frames()
    }

    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.denoiser.reset();
    }
}

/// Duplicate a mono interleaved buffer (1 sample per frame) into a
/// stereo interleaved buffer (2 identical samples per frame), per
/// spec.md §9's resolved Open Question: mono capture devices are
/// supported by duplication, not by halving [`CHANNELS`].
pub fn mono_to_stereo(mono: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(mono.len() * 2);
    for &s in mono {
        out.push(s);
        out.push(s);
    }
    out
}
