use std::io;

/// Errors surfaced while attaching to, opening, or validating the shared
/// channel. Never returned from the real-time read/write path — those
/// stay infallible `bool`/count returns so a real-time thread never has
/// to allocate or format an error.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The consumer opened before any producer created the channel.
    /// Transient; callers retry on the next read.
    #[error("shared channel {0:?} does not exist yet")]
    NotFound(String),

    /// A syscall failed during attach (`shm_open`, `ftruncate`, `mmap`).
    #[error("shared channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// The mapped region's declared `sample_rate`/`channels`/`ring_frames`
    /// do not match the compile-time constants. The consumer serves
    /// silence and does not retry with this mapping.
    #[error("shared channel header is invalid: {0}")]
    InvalidHeader(String),
}

/// Errors from the denoise pipeline's non-real-time configuration paths
/// (resampler setup, transform construction). The per-callback hot path
/// (`Pipeline::process_capture`) never returns `Result`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(usize),

    #[error("resampler configuration failed: {0}")]
    ResamplerConfig(String),
}
