//! The cross-process shared audio channel: wire header, backing memory,
//! and the lock-free ring built on top of both.

mod header;
mod ring;
mod shm;

pub use header::Header;
pub use ring::{ChannelStats, SharedChannel};
pub use shm::MemoryRegion;

#[cfg(unix)]
pub use shm::PosixShm;

#[cfg(test)]
pub use shm::InMemoryRegion;
