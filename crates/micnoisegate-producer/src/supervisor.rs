//! Producer lifecycle supervisor. Shaped directly after the teacher's
//! `audio_thread` in `audio/engine.rs`: a dedicated thread owns all
//! mutable state and drives it from a `crossbeam_channel` command
//! queue polled with `recv_timeout`, so commands and periodic
//! housekeeping (reattaching the channel, retrying the capture device)
//! share one control loop instead of fighting over locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use micnoisegate_core::device::{CaptureCallback, CaptureDevice};
use micnoisegate_core::mailbox::Mailbox;
use micnoisegate_core::pipeline::{mono_to_stereo, LevelSnapshot, PassthroughTransform, Pipeline};

use crate::writer::ProducerWriter;

pub enum ProducerCommand {
    Start,
    Stop,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Idle,
    Capturing,
}

/// Forwards raw captured blocks off the real-time callback thread onto
/// a bounded queue the supervisor drains. Matches the teacher's own
/// callback-to-worker hand-off shape (`sample_buffer` in
/// `audio/engine.rs`), but via a channel instead of a shared `Vec`
/// guarded by a lock, since only one side ever appends here.
struct ForwardingCallback {
    tx: Sender<Vec<f32>>,
}

impl CaptureCallback for ForwardingCallback {
    fn on_capture(&mut self, interleaved: &[f32]) {
        let _ = self.tx.try_send(interleaved.to_vec());
    }
}

pub struct ProducerSupervisor {
    cmd_tx: Sender<ProducerCommand>,
    state: Arc<AtomicBool>,
    pub levels: Arc<Mailbox<LevelSnapshot>>,
}

impl ProducerSupervisor {
    /// `make_device` is called fresh each time capture (re)starts, so
    /// the supervisor can recover from a device that disappeared.
    pub fn spawn<D, F>(make_device: F) -> Self
    where
        D: CaptureDevice + 'static,
        F: Fn() -> Result<D, micnoisegate_core::error::PipelineError> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = bounded::<ProducerCommand>(64);
        let is_capturing = Arc::new(AtomicBool::new(false));
        let levels = Arc::new(Mailbox::new());

        let state_for_thread = is_capturing.clone();
        let levels_for_thread = levels.clone();

        thread::Builder::new()
            .name("producer-supervisor".into())
            .spawn(move || run(cmd_rx, make_device, state_for_thread, levels_for_thread))
            .expect("failed to spawn producer supervisor thread");

        Self {
            cmd_tx,
            state: is_capturing,
            levels,
        }
    }

    pub fn send(&self, cmd: ProducerCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    pub fn state(&self) -> ProducerState {
        if self.state.load(Ordering::Relaxed) {
            ProducerState::Capturing
        } else {
            ProducerState::Idle
        }
    }
}

fn run<D, F>(
    cmd_rx: Receiver<ProducerCommand>,
    make_device: F,
    is_capturing: Arc<AtomicBool>,
    levels: Arc<Mailbox<LevelSnapshot>>,
) where
    D: CaptureDevice + 'static,
    F: Fn() -> Result<D, micnoisegate_core::error::PipelineError>,
{
    let mut writer = ProducerWriter::new();
    let mut device: Option<D> = None;
    let mut native_channels = micnoisegate_core::constants::CHANNELS;
    let (sample_tx, sample_rx) = bounded::<Vec<f32>>(256);
    let mut pipeline: Option<Pipeline<PassthroughTransform>> = None;

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(16)) {
            Ok(ProducerCommand::Start) => {
                if device.is_some() {
                    continue;
                }
                match make_device() {
                    Ok(mut d) => {
                        let pipeline_result = Pipeline::new(
                            PassthroughTransform,
                            d.native_sample_rate(),
                            micnoisegate_core::constants::DENOISE_FRAME * 8,
                        );
                        let Ok(new_pipeline) = pipeline_result else {
                            log::error!("failed to construct pipeline");
                            continue;
                        };

                        if !writer.attach() {
                            log::warn!("starting capture without an attached channel; writes will be dropped");
                        }

                        native_channels = d.native_channels();
                        let callback = ForwardingCallback { tx: sample_tx.clone() };
                        if let Err(e) = d.start(Box::new(callback)) {
                            log::error!("failed to start capture device: {e}");
                            continue;
                        }

                        pipeline = Some(new_pipeline);
                        device = Some(d);
                        is_capturing.store(true, Ordering::Relaxed);
                    }
                    Err(e) => log::error!("failed to open capture device: {e}"),
                }
            }
            Ok(ProducerCommand::Stop) => {
                if let Some(mut d) = device.take() {
                    d.stop();
                }
                pipeline = None;
                writer.detach();
                is_capturing.store(false, Ordering::Relaxed);
            }
            Ok(ProducerCommand::Shutdown) => {
                if let Some(mut d) = device.take() {
                    d.stop();
                }
                writer.detach();
                is_capturing.store(false, Ordering::Relaxed);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(p) = pipeline.as_mut() {
            while let Ok(captured) = sample_rx.try_recv() {
                let stereo = if native_channels == 1 {
                    mono_to_stereo(&captured)
                } else {
                    captured
                };

                for output in p.process_capture(&stereo) {
                    let frames = output.block.len() / micnoisegate_core::constants::CHANNELS;
                    writer.write_frames(&output.block, frames);
                    levels.post(output.level);
                }
            }
        }
    }
}
