use super::ioutils::{close_log_on_error, dup, read_u64, write_u64};
use super::{poll, PollEvent, PollFd};
use crate::{Error, Result};

use std::os::fd::{AsRawFd, RawFd};

/// Owned `eventfd(2)` descriptor, always opened non-blocking.
///
/// Blocking reads are built on top with `poll(2)` so that a write which
/// would overflow the counter reports instead of blocking the writer.
#[derive(Debug)]
pub struct EventFd {
    handle: RawFd,
}

impl AsRawFd for EventFd {
    fn as_raw_fd(&self) -> RawFd {
        self.handle
    }
}

impl Drop for EventFd {
    fn drop(&mut self) {
        if self.handle > -1 {
            close_log_on_error(self.handle);
        }
    }
}

impl PartialEq for EventFd {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}
impl Eq for EventFd {}

impl EventFd {
    pub fn new(initval: libc::c_uint, close_on_exec: bool, semaphore: bool) -> Result<Self> {
        let mut flags = libc::EFD_NONBLOCK;
        if close_on_exec {
            flags |= libc::EFD_CLOEXEC;
        }
        if semaphore {
            flags |= libc::EFD_SEMAPHORE;
        }
        let handle = unsafe { libc::eventfd(initval, flags) };
        if handle >= 0 {
            Ok(Self { handle })
        } else {
            Err(Error::from_open(std::io::Error::last_os_error()))
        }
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            handle: dup(self.handle).map_err(Error::from_open)?,
        })
    }

    pub fn write(&self, value: u64) -> Result<()> {
        write_u64(self.handle, value).map_err(Error::from_write)
    }

    /// Single non-blocking read, `WouldBlock` when the counter is zero.
    pub fn read(&self) -> Result<u64> {
        read_u64(self.handle).map_err(Error::from_read)
    }

    /// Waits up to `timeout_ms` (-1 for ever) for the counter to become non-zero.
    /// Returns `false` on timeout.
    pub fn wait_readable(&self, timeout_ms: libc::c_int) -> Result<bool> {
        let pollfd = &mut [PollFd::new(self.handle, PollEvent::IN)];
        let n = poll(pollfd, timeout_ms).map_err(Error::from_wait)?;
        if pollfd[0].revents().contains(PollEvent::NVAL) {
            return Err(Error::AlreadyClosed);
        }
        Ok(n > 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_read_write() {
        let efd = EventFd::new(3, true, false).unwrap();
        efd.write(4).unwrap();
        assert_eq!(efd.read().unwrap(), 7);
        assert_eq!(efd.read().unwrap_err().kind(), ErrorKind::WouldBlock);
        assert!(!efd.wait_readable(0).unwrap());
        efd.write(1).unwrap();
        assert!(efd.wait_readable(0).unwrap());
    }

    #[test]
    fn test_semaphore() {
        let efd = EventFd::new(2, true, true).unwrap();
        assert_eq!(efd.read().unwrap(), 1);
        assert_eq!(efd.read().unwrap(), 1);
        assert_eq!(efd.read().unwrap_err().kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn test_overflow_is_reported() {
        let efd = EventFd::new(0, true, false).unwrap();
        efd.write(u64::MAX - 1).unwrap();
        assert_eq!(efd.write(1).unwrap_err().kind(), ErrorKind::Overflow);
        assert_eq!(efd.write(u64::MAX).unwrap_err().kind(), ErrorKind::Overflow);
        assert_eq!(efd.read().unwrap(), u64::MAX - 1);
    }

    #[test]
    fn test_clone_shares_counter() {
        let efd = EventFd::new(0, true, false).unwrap();
        let other = efd.try_clone().unwrap();
        assert_ne!(efd, other);
        other.write(5).unwrap();
        assert_eq!(efd.read().unwrap(), 5);
    }
}
