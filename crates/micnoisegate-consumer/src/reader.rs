//! Consumer-side wrapper around [`SharedChannel`]: lazy (re)connection
//! with backoff, per spec.md §4.3. The consumer binary may start
//! before any producer has ever run, and the producer may come and go
//! independently of the consumer's own lifetime, so every read first
//! asks "is there a channel to read from right now" rather than
//! assuming one was available at startup.

use std::time::{Duration, Instant};

use micnoisegate_core::channel::SharedChannel;
use micnoisegate_core::constants::CHANNEL_NAME;

/// Backoff schedule for retrying [`SharedChannel::open_existing`] after
/// it reports the channel doesn't exist yet.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

pub struct ConsumerReader {
    channel: Option<SharedChannel>,
    policy: ReconnectPolicy,
    backoff: Duration,
    next_attempt: Instant,
}

impl ConsumerReader {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            channel: None,
            backoff: policy.initial,
            policy,
            next_attempt: Instant::now(),
        }
    }

    fn try_reconnect(&mut self) {
        let now = Instant::now();
        if now < self.next_attempt {
            return;
        }

        match SharedChannel::open_existing(CHANNEL_NAME) {
            Ok(channel) => {
                log::info!("attached to shared channel {CHANNEL_NAME:?}");
                self.channel = Some(channel);
                self.backoff = self.policy.initial;
            }
            Err(e) => {
                log::debug!("channel not available yet: {e}");
                self.next_attempt = now + self.backoff;
                self.backoff = self
                    .backoff
                    .mul_f64(self.policy.multiplier)
                    .min(self.policy.max);
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Serves `n` frames into `dst`. Returns `true` only when real,
    /// freshly produced samples were copied; otherwise `dst` is left
    /// (or filled) with silence and the caller should treat this call
    /// as a gap. Never blocks and never panics on a missing or stale
    /// producer — the worst case is silence, per spec.md §6.
    pub fn read_frames(&mut self, dst: &mut [f32], n: usize) -> bool {
        if self.channel.is_none() {
            self.try_reconnect();
        }

        let Some(channel) = self.channel.as_ref() else {
            dst[..n * micnoisegate_core::constants::CHANNELS].fill(0.0);
            return false;
        };

        if !channel.is_active() {
            dst[..n * micnoisegate_core::constants::CHANNELS].fill(0.0);
            return false;
        }

        channel.read_frames(dst, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_policy_default_backs_off_up_to_max() {
        let policy = ReconnectPolicy::default();
        assert!(policy.initial < policy.max);
        assert!(policy.multiplier > 1.0);
    }

    #[test]
    #[cfg(unix)]
    fn reads_silence_before_any_producer_exists() {
        let mut reader = ConsumerReader::new(ReconnectPolicy {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(10),
            multiplier: 2.0,
        });
        let mut dst = vec![9.0f32; 480 * 2];
        let ok = reader.read_frames(&mut dst, 480);
        assert!(!ok);
        assert!(dst.iter().all(|&s| s == 0.0));
        assert!(!reader.is_connected());
    }
}
