//! Shared transport and denoise pipeline for the micnoisegate producer
//! and consumer. Neither half of the system depends on the other
//! directly; both depend on this crate for the wire format, the
//! lock-free ring, and (producer-side) the capture pipeline.

pub mod channel;
pub mod constants;
pub mod device;
pub mod error;
pub mod mailbox;
pub mod pipeline;

pub use channel::{ChannelStats, MemoryRegion, SharedChannel};
pub use constants::CHANNEL_NAME;
pub use error::{ChannelError, PipelineError};
