//! Backing memory for the shared channel.
//!
//! [`MemoryRegion`] abstracts over where the channel's bytes actually
//! live: real POSIX shared memory on unix (`PosixShm`), or an
//! in-process heap allocation for tests (`InMemoryRegion`, behind
//! `#[cfg(test)]`). `SharedChannel` itself only ever deals with a raw
//! `*mut u8` and a length, exactly as it would against real shared
//! memory.

use crate::error::ChannelError;

/// A fixed-size, writable memory region that outlives every pointer
/// handed out by [`MemoryRegion::as_mut_ptr`].
pub trait MemoryRegion: Send + Sync {
    fn as_mut_ptr(&self) -> *mut u8;
    fn len(&self) -> usize;

    /// Remove the region's name from whatever namespace it lives in,
    /// if this handle is the one that created it. No-op for regions
    /// with no name to unlink (e.g. the in-memory test backing).
    fn destroy(&self) {}
}

/// Real POSIX shared memory, mapped via `shm_open`/`mmap`.
#[cfg(unix)]
#[derive(Debug)]
pub struct PosixShm {
    ptr: *mut libc::c_void,
    len: usize,
    name: String,
    owns_name: std::sync::atomic::AtomicBool,
}

#[cfg(unix)]
unsafe impl Send for PosixShm {}
#[cfg(unix)]
unsafe impl Sync for PosixShm {}

#[cfg(unix)]
impl PosixShm {
    /// Open `name`, creating it if absent, and truncate to `len` bytes
    /// only if this call created the object. Mirrors
    /// `SharedChannel::create_or_open`'s contract in spec.md §4.1.
    pub fn create_or_open(name: &str, len: usize) -> Result<(Self, bool), ChannelError> {
        let c_name = to_cstring(name)?;

        unsafe {
            // Try to create exclusively first so we know whether we're
            // the one responsible for sizing and initializing it.
            let mut created = true;
            let mut fd = libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600,
            );
            if fd < 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::EEXIST) {
                    return Err(ChannelError::Io(err));
                }
                created = false;
                fd = libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0o600);
                if fd < 0 {
                    return Err(ChannelError::Io(std::io::Error::last_os_error()));
                }
            }

            log::debug!("shm_open({name:?}) -> fd={fd}, created={created}");

            if created && libc::ftruncate(fd, len as libc::off_t) < 0 {
                let err = std::io::Error::last_os_error();
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
                return Err(ChannelError::Io(err));
            }

            let ptr = libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            );
            libc::close(fd);
            if ptr == libc::MAP_FAILED {
                if created {
                    libc::shm_unlink(c_name.as_ptr());
                }
                return Err(ChannelError::Io(std::io::Error::last_os_error()));
            }

            Ok((
                Self {
                    ptr,
                    len,
                    name: name.to_string(),
                    owns_name: std::sync::atomic::AtomicBool::new(created),
                },
                created,
            ))
        }
    }

    /// Open an existing region without creating it. Mirrors
    /// `SharedChannel::open_existing`'s contract in spec.md §4.1.
    pub fn open_existing(name: &str, len: usize) -> Result<Self, ChannelError> {
        let c_name = to_cstring(name)?;

        unsafe {
            let fd = libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0o600);
            if fd < 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::ENOENT) {
                    return Err(ChannelError::NotFound(name.to_string()));
                }
                return Err(ChannelError::Io(err));
            }

            let ptr = libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            );
            libc::close(fd);
            if ptr == libc::MAP_FAILED {
                return Err(ChannelError::Io(std::io::Error::last_os_error()));
            }

            Ok(Self {
                ptr,
                len,
                name: name.to_string(),
                owns_name: std::sync::atomic::AtomicBool::new(false),
            })
        }
    }
}

#[cfg(unix)]
fn to_cstring(name: &str) -> Result<std::ffi::CString, ChannelError> {
    std::ffi::CString::new(name)
        .map_err(|_| ChannelError::InvalidHeader(format!("channel name {name:?} contains a NUL byte")))
}

#[cfg(unix)]
impl MemoryRegion for PosixShm {
    fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr as *mut u8
    }

    fn len(&self) -> usize {
        self.len
    }

    fn destroy(&self) {
        use std::sync::atomic::Ordering;
        if self
            .owns_name
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Ok(c_name) = std::ffi::CString::new(self.name.clone()) {
            let rc = unsafe { libc::shm_unlink(c_name.as_ptr()) };
            if rc != 0 {
                log::warn!(
                    "shm_unlink({:?}) failed: {}",
                    self.name,
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

#[cfg(unix)]
impl Drop for PosixShm {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}

/// Heap-backed region for tests: lets `SharedChannel`'s read/write/
/// overrun/underrun logic run in-process without real shared memory.
#[cfg(test)]
pub struct InMemoryRegion {
    buf: parking_lot::Mutex<Box<[u8]>>,
    ptr: *mut u8,
    len: usize,
}

#[cfg(test)]
unsafe impl Send for InMemoryRegion {}
#[cfg(test)]
unsafe impl Sync for InMemoryRegion {}

#[cfg(test)]
impl InMemoryRegion {
    pub fn new(len: usize) -> Self {
        let mut buf: Box<[u8]> = vec![0u8; len].into_boxed_slice();
        let ptr = buf.as_mut_ptr();
        Self {
            buf: parking_lot::Mutex::new(buf),
            ptr,
            len,
        }
    }
}

#[cfg(test)]
impl MemoryRegion for InMemoryRegion {
    fn as_mut_ptr(&self) -> *mut u8 {
        // Keep the boxed slice alive; the pointer into it is stable
        // because `buf` is never reallocated after construction.
        let _guard = self.buf.lock();
        self.ptr
    }

    fn len(&self) -> usize {
        self.len
    }
}
