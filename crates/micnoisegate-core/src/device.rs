//! Capture-device abstraction. `micnoisegate-core` knows nothing about
//! `cpal`; it only defines the seam the producer's capture
//! collaborator implements, so the pipeline and channel logic above can
//! be tested without a real audio device.

use crate::error::PipelineError;

/// Receives captured audio on whatever thread the device driver calls
/// back on (real-time for `cpal`). Implementors must not allocate,
/// lock, or block inside [`CaptureCallback::on_capture`].
pub trait CaptureCallback: Send {
    /// `interleaved` is native device rate, native device channel
    /// count; resampling and channel mapping happen downstream in
    /// [`crate::pipeline::Pipeline`].
    fn on_capture(&mut self, interleaved: &[f32]);
}

/// A capture device the producer can start and stop. One
/// implementation (`cpal`-backed) lives in the producer binary; tests
/// exercise [`crate::pipeline::Pipeline`] directly without going
/// through this trait at all.
pub trait CaptureDevice: Send {
    fn native_sample_rate(&self) -> u32;
    fn native_channels(&self) -> usize;

    /// Start delivering captured audio to `callback` until
    /// [`CaptureDevice::stop`] is called or the device itself fails.
    /// Returns once the stream is confirmed running, not once capture
    /// ends.
    fn start(&mut self, callback: Box<dyn CaptureCallback>) -> Result<(), PipelineError>;

    /// Stop delivering audio. Idempotent.
    fn stop(&mut self);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A fake device that replays a fixed buffer through the callback
    /// on demand (`feed`), for exercising supervisor/pipeline wiring
    /// without real hardware.
    pub struct FakeCaptureDevice {
        pub sample_rate: u32,
        pub channels: usize,
        callback: Option<Box<dyn CaptureCallback>>,
    }

    impl FakeCaptureDevice {
        pub fn new(sample_rate: u32, channels: usize) -> Self {
            Self {
                sample_rate,
                channels,
                callback: None,
            }
        }

        pub fn feed(&mut self, interleaved: &[f32]) {
            if let Some(cb) = self.callback.as_mut() {
                cb.on_capture(interleaved);
            }
        }
    }

    impl CaptureDevice for FakeCaptureDevice {
        fn native_sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn native_channels(&self) -> usize {
            self.channels
        }

        fn start(&mut self, callback: Box<dyn CaptureCallback>) -> Result<(), PipelineError> {
            self.callback = Some(callback);
            Ok(())
        }

        fn stop(&mut self) {
            self.callback = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeCaptureDevice;
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingCallback(Arc<Mutex<Vec<f32>>>);
    impl CaptureCallback for RecordingCallback {
        fn on_capture(&mut self, interleaved: &[f32]) {
            self.0.lock().unwrap().extend_from_slice(interleaved);
        }
    }

    #[test]
    fn fake_device_delivers_fed_samples_to_callback() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let mut device = FakeCaptureDevice::new(44_100, 1);
        device
            .start(Box::new(RecordingCallback(received.clone())))
            .unwrap();
        device.feed(&[1.0, 2.0, 3.0]);
        assert_eq!(*received.lock().unwrap(), vec![1.0, 2.0, 3.0]);

        device.stop();
        device.feed(&[9.0]);
        assert_eq!(*received.lock().unwrap(), vec![1.0, 2.0, 3.0]);
    }
}
