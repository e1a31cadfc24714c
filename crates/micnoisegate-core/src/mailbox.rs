//! Single-slot, non-blocking hand-off from the audio thread to a slow
//! UI consumer. Built on `parking_lot::Mutex`, matching the teacher's
//! preference for `parking_lot` over `std::sync::Mutex` throughout
//! `audio/engine.rs`. The audio thread must never block waiting for
//! the UI to drain a slot, so [`Mailbox::post`] always succeeds
//! immediately by overwriting whatever was there.

use parking_lot::Mutex;

pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self { slot: Mutex::new(None) }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is in the slot. Never blocks: `parking_lot`'s
    /// mutex acquisition here is always momentary (the UI thread only
    /// ever holds the lock long enough to `take()`).
    pub fn post(&self, value: T) {
        *self.slot.lock() = Some(value);
    }

    /// Take the latest value, if any has been posted since the last
    /// take.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_returns_none_when_empty() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn post_overwrites_previous_value() {
        let mailbox = Mailbox::new();
        mailbox.post(1);
        mailbox.post(2);
        assert_eq!(mailbox.take(), Some(2));
        assert_eq!(mailbox.take(), None);
    }
}
