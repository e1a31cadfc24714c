//! `cpal`-backed microphone capture. Builds an input stream the same
//! way the teacher's `audio/engine.rs` builds its output stream:
//! `StreamConfig` from the device's own sample rate, a callback closure
//! capturing only what it needs, and `log::error!` on stream errors
//! rather than panicking on the audio thread.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};
use micnoisegate_core::device::{CaptureCallback, CaptureDevice};
use micnoisegate_core::error::PipelineError;

pub struct CpalCaptureDevice {
    device: Device,
    sample_rate: u32,
    channels: usize,
    stream: Option<cpal::Stream>,
}

impl CpalCaptureDevice {
    pub fn default_input() -> Result<Self, PipelineError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| PipelineError::ResamplerConfig("no default input device".into()))?;
        let config = device
            .default_input_config()
            .map_err(|e| PipelineError::ResamplerConfig(e.to_string()))?;

        Ok(Self {
            device,
            sample_rate: config.sample_rate().0,
            channels: config.channels() as usize,
            stream: None,
        })
    }
}

impl CaptureDevice for CpalCaptureDevice {
    fn native_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn native_channels(&self) -> usize {
        self.channels
    }

    fn start(&mut self, callback: Box<dyn CaptureCallback>) -> Result<(), PipelineError> {
        let config = StreamConfig {
            channels: self.channels as u16,
            sample_rate: SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let callback = Arc::new(Mutex::new(callback));
        let stream = self
            .device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback.lock().unwrap().on_capture(data);
                },
                move |err| {
                    log::error!("capture stream error: {err}");
                },
                None,
            )
            .map_err(|e| PipelineError::ResamplerConfig(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PipelineError::ResamplerConfig(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        self.stream = None;
    }
}
