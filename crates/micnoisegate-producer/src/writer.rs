//! Producer-side wrapper around [`SharedChannel`]. Per spec.md §4.2:
//! attach/detach are allowed to fail or be retried; once attached,
//! writes on the audio thread are always infallible bool returns, and
//! if attachment never succeeded, writes are silently no-ops rather
//! than panics.

use micnoisegate_core::channel::SharedChannel;
use micnoisegate_core::constants::CHANNEL_NAME;

pub struct ProducerWriter {
    channel: Option<SharedChannel>,
}

impl Default for ProducerWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducerWriter {
    pub fn new() -> Self {
        Self { channel: None }
    }

    /// Create or attach to the named channel. Logs and leaves the
    /// writer detached on failure rather than propagating — the
    /// supervisor retries on its own schedule.
    pub fn attach(&mut self) -> bool {
        self.attach_named(CHANNEL_NAME)
    }

    fn attach_named(&mut self, name: &str) -> bool {
        if self.channel.is_some() {
            return true;
        }
        match SharedChannel::create_or_open(name) {
            Ok(channel) => {
                channel.set_active(true);
                self.channel = Some(channel);
                true
            }
            Err(e) => {
                log::error!("failed to attach to shared channel: {e}");
                false
            }
        }
    }

    /// Mark inactive, unlink if we created it, and drop the mapping.
    pub fn detach(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.set_active(false);
            channel.destroy();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.channel.is_some()
    }

    /// No-op, returns `false`, if not currently attached.
    pub fn write_frames(&self, src: &[f32], n: usize) -> bool {
        match &self.channel {
            Some(channel) => channel.write_frames(src, n),
            None => false,
        }
    }

    pub fn set_active(&self, active: bool) {
        if let Some(channel) = &self.channel {
            channel.set_active(active);
        }
    }
}

impl Drop for ProducerWriter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn attach_then_write_then_detach() {
        let name = format!("/micnoisegate_writer_test_{}", std::process::id());
        let mut writer = ProducerWriter::new();
        assert!(writer.attach_named(&name));
        assert!(writer.is_attached());

        let frame = vec![0.0f32; 480 * 2];
        assert!(writer.write_frames(&frame, 480));

        writer.detach();
        assert!(!writer.is_attached());
        assert!(!writer.write_frames(&frame, 480));
    }

    #[test]
    fn write_without_attach_is_a_silent_no_op() {
        let writer = ProducerWriter::new();
        let frame = vec![0.0f32; 480 * 2];
        assert!(!writer.write_frames(&frame, 480));
    }
}
