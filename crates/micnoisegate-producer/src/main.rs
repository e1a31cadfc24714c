mod capture;
mod supervisor;
mod writer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capture::CpalCaptureDevice;
use supervisor::{ProducerCommand, ProducerSupervisor};

fn main() {
    env_logger::init();

    let supervisor = ProducerSupervisor::spawn(CpalCaptureDevice::default_input);
    supervisor.send(ProducerCommand::Start);
    log::info!("micnoisegate producer started, publishing on {}", micnoisegate_core::CHANNEL_NAME);

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    }) {
        log::warn!("failed to install Ctrl-C handler: {e}");
    }

    while running.load(Ordering::SeqCst) {
        if let Some(level) = supervisor.levels.take() {
            log::trace!("rms={:.4}", level.rms);
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    log::info!("shutting down");
    supervisor.send(ProducerCommand::Shutdown);
    std::thread::sleep(Duration::from_millis(100));
}
