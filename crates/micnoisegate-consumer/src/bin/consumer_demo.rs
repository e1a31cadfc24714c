//! Standalone harness exercising `micnoisegate_consumer` without a real
//! host daemon: pulls fixed-size blocks through the C ABI callback on a
//! timer and logs underrun/silence stats, the way a developer would
//! sanity-check the plug-in before wiring it into an actual host.

use std::time::Duration;

use micnoisegate_consumer::micnoisegate_read_callback;
use micnoisegate_core::constants::{CHANNELS, DENOISE_FRAME};

fn main() {
    env_logger::init();

    let mut buf = vec![0.0f32; DENOISE_FRAME * CHANNELS];
    let mut silent_blocks: u64 = 0;
    let mut served_blocks: u64 = 0;

    log::info!("reading from {}", micnoisegate_core::CHANNEL_NAME);

    loop {
        let ok = unsafe { micnoisegate_read_callback(buf.as_mut_ptr(), DENOISE_FRAME as u32) };
        if ok == 1 {
            served_blocks += 1;
        } else {
            silent_blocks += 1;
        }

        if (served_blocks + silent_blocks) % 100 == 0 {
            log::info!("served={served_blocks} silent={silent_blocks}");
        }

        std::thread::sleep(Duration::from_millis(10));
    }
}
