//! Accumulates arbitrarily-sized resampled blocks into the fixed
//! [`crate::constants::DENOISE_FRAME`]-frame blocks the denoiser
//! requires, per spec.md §5.3.

use crate::constants::{CHANNELS, DENOISE_FRAME};

pub struct FrameAccumulator {
    buf: Vec<f32>,
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DENOISE_FRAME * CHANNELS * 2),
        }
    }

    /// Push interleaved samples. Returns every complete
    /// `DENOISE_FRAME`-frame block that can now be drained, in order.
    /// Leftover samples smaller than one block remain buffered.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<Vec<f32>> {
        self.buf.extend_from_slice(interleaved);

        let block_len = DENOISE_FRAME * CHANNELS;
        let mut out = Vec::new();
        while self.buf.len() >= block_len {
            out.push(self.buf[..block_len].to_vec());
            self.buf.drain(..block_len);
        }
        out
    }

    pub fn pending_frames(&self) -> usize {
        self.buf.len() / CHANNELS
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple_emits_all_blocks_no_remainder() {
        let mut acc = FrameAccumulator::new();
        let input = vec![1.0f32; DENOISE_FRAME * CHANNELS * 3];
        let blocks = acc.push(&input);
        assert_eq!(blocks.len(), 3);
        assert_eq!(acc.pending_frames(), 0);
    }

    #[test]
    fn sub_block_input_accumulates_without_emitting() {
        let mut acc = FrameAccumulator::new();
        let input = vec![1.0f32; (DENOISE_FRAME / 2) * CHANNELS];
        let blocks = acc.push(&input);
        assert!(blocks.is_empty());
        assert_eq!(acc.pending_frames(), DENOISE_FRAME / 2);
    }

    #[test]
    fn straddling_pushes_eventually_emit_a_block() {
        let mut acc = FrameAccumulator::new();
        let part = vec![2.0f32; (DENOISE_FRAME * 3 / 4) * CHANNELS];
        assert!(acc.push(&part).is_empty());
        let blocks = acc.push(&part);
        assert_eq!(blocks.len(), 1);
        assert!(acc.pending_frames() > 0);
    }

    #[test]
    fn reset_empties_accumulator() {
        let mut acc = FrameAccumulator::new();
        acc.push(&vec![1.0f32; (DENOISE_FRAME / 3) * CHANNELS]);
        assert!(acc.pending_frames() > 0);
        acc.reset();
        assert_eq!(acc.pending_frames(), 0);
    }
}
