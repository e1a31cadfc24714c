//! RMS level and decimated waveform computation for the producer's UI,
//! per spec.md §5.5. Runs on the audio thread; must stay allocation-free
//! per call once its scratch buffer reaches steady-state size.

/// One UI-facing snapshot: current RMS level and a fixed-size decimated
/// waveform preview.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LevelSnapshot {
    pub rms: f32,
    pub waveform: Vec<f32>,
}

const WAVEFORM_POINTS: usize = 100;

/// Computes RMS and a `WAVEFORM_POINTS`-point min/max-decimated preview
/// from one interleaved block.
pub struct LevelMeter {
    mono_scratch: Vec<f32>,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            mono_scratch: Vec::new(),
        }
    }

    pub fn analyze(&mut self, interleaved: &[f32], channels: usize) -> LevelSnapshot {
        self.mono_scratch.clear();
        let frames = interleaved.len() / channels.max(1);
        self.mono_scratch.reserve(frames);
        for f in 0..frames {
            let mut sum = 0.0f32;
            for ch in 0..channels {
                sum += interleaved[f * channels + ch];
            }
            self.mono_scratch.push(sum / channels as f32);
        }

        let rms = if frames == 0 {
            0.0
        } else {
            let sum_sq: f32 = self.mono_scratch.iter().map(|s| s * s).sum();
            (sum_sq / frames as f32).sqrt()
        };

        LevelSnapshot {
            rms,
            waveform: decimate(&self.mono_scratch, WAVEFORM_POINTS),
        }
    }
}

/// Downsample `samples` to `points` values by taking the peak-magnitude
/// sample within each bucket, preserving transients a plain average
/// would smear out.
fn decimate(samples: &[f32], points: usize) -> Vec<f32> {
    if samples.is_empty() {
        return vec![0.0; points];
    }

    let bucket = (samples.len() as f32 / points as f32).ceil().max(1.0) as usize;
    (0..points)
        .map(|i| {
            let start = i * bucket;
            if start >= samples.len() {
                return 0.0;
            }
            let end = (start + bucket).min(samples.len());
            samples[start..end]
                .iter()
                .copied()
                .fold(0.0f32, |acc, s| if s.abs() > acc.abs() { s } else { acc })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_zero_rms() {
        let mut meter = LevelMeter::new();
        let snapshot = meter.analyze(&vec![0.0f32; 480 * 2], 2);
        assert_eq!(snapshot.rms, 0.0);
    }

    #[test]
    fn full_scale_square_wave_has_rms_near_one() {
        let mut meter = LevelMeter::new();
        let snapshot = meter.analyze(&vec![1.0f32; 480 * 2], 2);
        assert!((snapshot.rms - 1.0).abs() < 1e-6);
    }

    #[test]
    fn waveform_has_fixed_point_count() {
        let mut meter = LevelMeter::new();
        let snapshot = meter.analyze(&vec![0.3f32; 480 * 2], 2);
        assert_eq!(snapshot.waveform.len(), WAVEFORM_POINTS);
    }
}
