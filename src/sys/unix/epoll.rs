use super::eventfd::EventFd;
use super::ioutils::close_log_on_error;
use crate::{Error, Interest, Ready, Result};
use std::io::Error as IoError;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const WAKER_TOKEN: u64 = u64::MAX;

const _: () = assert!(
    std::mem::size_of::<EPollEvent>() == std::mem::size_of::<libc::epoll_event>()
        && Interest::READABLE.bits() == libc::EPOLLIN as u32
        && Interest::WRITABLE.bits() == libc::EPOLLOUT as u32
        && Interest::PRIORITY.bits() == libc::EPOLLPRI as u32
        && Interest::READ_HANG_UP.bits() == libc::EPOLLRDHUP as u32
        && Interest::ONESHOT.bits() == libc::EPOLLONESHOT as u32
        && Interest::EDGE_TRIGGERED.bits() == libc::EPOLLET as u32
        && Ready::ERROR.bits() == libc::EPOLLERR as u32
        && Ready::HANG_UP.bits() == libc::EPOLLHUP as u32
);

/// Owned epoll descriptor plus the eventfd used to interrupt `epoll_wait`.
#[derive(Debug)]
pub struct EPoll {
    handle: libc::c_int,
    waker: Arc<EventFd>,
    /// Waker hit that came back together with other events
    pending: AtomicBool,
}

impl AsRawFd for EPoll {
    fn as_raw_fd(&self) -> RawFd {
        self.handle
    }
}

impl EPoll {
    pub fn new(close_on_exec: bool) -> Result<Self> {
        let waker = Arc::new(EventFd::new(0, close_on_exec, false)?);
        let epfd = unsafe {
            libc::epoll_create1(if close_on_exec {
                libc::EPOLL_CLOEXEC
            } else {
                0
            })
        };
        if epfd < 0 {
            return Err(Error::from_open(IoError::last_os_error()));
        }
        let epoll = EPoll {
            handle: epfd,
            waker,
            pending: AtomicBool::new(false),
        };
        epoll
            .ctl(
                epoll.waker.as_raw_fd(),
                libc::EPOLL_CTL_ADD,
                libc::EPOLLIN as u32,
                WAKER_TOKEN,
            )
            .map_err(Error::from_open)?;
        Ok(epoll)
    }

    #[inline]
    pub fn waker(&self) -> &Arc<EventFd> {
        &self.waker
    }

    fn ctl(&self, fd: RawFd, op: libc::c_int, events: u32, token: u64) -> std::io::Result<()> {
        let mut event = libc::epoll_event { events, u64: token };
        if unsafe { libc::epoll_ctl(self.handle, op, fd, &mut event as _) } >= 0 {
            Ok(())
        } else {
            Err(IoError::last_os_error())
        }
    }

    /// Adds or modifies the registration of `fd`. `known` says which one is
    /// expected; the other is used when the kernel state disagrees (the
    /// descriptor was closed and its number reused).
    pub fn set(&self, fd: RawFd, interest: Interest, known: bool) -> Result<()> {
        if fd == self.waker.as_raw_fd() {
            return Err(Error::InvalidSource);
        }
        let (first, fallback, retry_on) = if known {
            (libc::EPOLL_CTL_MOD, libc::EPOLL_CTL_ADD, libc::ENOENT)
        } else {
            (libc::EPOLL_CTL_ADD, libc::EPOLL_CTL_MOD, libc::EEXIST)
        };
        match self.ctl(fd, first, interest.bits(), fd as u64) {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(retry_on) => self
                .ctl(fd, fallback, interest.bits(), fd as u64)
                .map_err(Error::from_ctl),
            Err(e) => Err(Error::from_ctl(e)),
        }
    }

    /// Returns `false` when the kernel no longer knew about `fd`. A closed
    /// `fd` (`EBADF`) is reported as `InvalidSource`.
    pub fn remove(&self, fd: RawFd) -> Result<bool> {
        match self.ctl(fd, libc::EPOLL_CTL_DEL, 0, 0) {
            Ok(()) => Ok(true),
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(false),
            Err(e) => Err(Error::from_ctl(e)),
        }
    }

    /// Waits for events and strips the waker from the result.
    ///
    /// A waker hit is drained at once. It is reported as `Interrupted` right
    /// away when nothing else is ready, otherwise by the next call before it
    /// blocks, so sources that stay ready cannot starve it.
    pub fn wait(&self, events: &mut [EPollEvent], timeout_ms: i32) -> Result<usize> {
        if self.pending.swap(false, Ordering::AcqRel) {
            return Err(Error::Interrupted);
        }
        let maxevents = if events.len() > i32::MAX as usize {
            i32::MAX
        } else {
            events.len() as i32
        };
        let status = unsafe {
            libc::epoll_wait(
                self.handle,
                events.as_mut_ptr() as *mut libc::epoll_event,
                maxevents,
                timeout_ms,
            )
        };
        if status < 0 {
            return Err(Error::from_wait(IoError::last_os_error()));
        }
        let mut status = status as usize;
        if let Some(i) = events[..status]
            .iter()
            .position(|e| e.token() == WAKER_TOKEN)
        {
            match self.waker.read() {
                // another waiter drained it first
                Ok(_) | Err(Error::WouldBlock) => {}
                Err(e) => return Err(e),
            }
            // remove by swapping out with the last one
            events[i] = events[status - 1];
            status -= 1;
            if status == 0 {
                return Err(Error::Interrupted);
            }
            self.pending.store(true, Ordering::Release);
        }
        Ok(status)
    }
}

impl Drop for EPoll {
    fn drop(&mut self) {
        if self.handle > -1 {
            close_log_on_error(self.handle);
        }
    }
}

#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct EPollEvent(libc::epoll_event);

impl EPollEvent {
    pub const fn zeroed() -> Self {
        Self(libc::epoll_event { events: 0, u64: 0 })
    }
    pub fn token(&self) -> u64 {
        self.0.u64
    }
    pub fn ready(&self) -> Ready {
        Ready::from_bits_truncate(self.0.events)
    }
}

impl std::fmt::Debug for EPollEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EPollEvent")
            .field("ready", &self.ready())
            .field("token", &self.token())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_waker_alone_interrupts() {
        let epoll = EPoll::new(true).unwrap();
        let mut events = [EPollEvent::zeroed(); 4];
        assert_eq!(epoll.wait(&mut events, 0).unwrap(), 0);
        epoll.waker().write(1).unwrap();
        assert_eq!(
            epoll.wait(&mut events, -1).unwrap_err().kind(),
            ErrorKind::Interrupted
        );
        // drained
        assert_eq!(epoll.wait(&mut events, 0).unwrap(), 0);
    }

    #[test]
    fn test_waker_stays_pending_behind_events() {
        let epoll = EPoll::new(true).unwrap();
        let source = EventFd::new(1, true, false).unwrap();
        epoll
            .set(source.as_raw_fd(), Interest::READABLE, false)
            .unwrap();
        epoll.waker().write(1).unwrap();

        let mut events = [EPollEvent::zeroed(); 4];
        assert_eq!(epoll.wait(&mut events, -1).unwrap(), 1);
        assert_eq!(events[0].token(), source.as_raw_fd() as u64);
        assert!(events[0].ready().contains(Ready::READABLE));

        epoll.remove(source.as_raw_fd()).unwrap();
        assert_eq!(
            epoll.wait(&mut events, 0).unwrap_err().kind(),
            ErrorKind::Interrupted
        );
    }

    #[test]
    fn test_set_recovers_from_stale_state() {
        let epoll = EPoll::new(true).unwrap();
        let source = EventFd::new(0, true, false).unwrap();
        // believed registered, kernel says no: falls back to ADD
        epoll
            .set(source.as_raw_fd(), Interest::READABLE, true)
            .unwrap();
        // believed new, kernel says exists: falls back to MOD
        epoll
            .set(source.as_raw_fd(), Interest::WRITABLE, false)
            .unwrap();
        assert!(epoll.remove(source.as_raw_fd()).unwrap());
        assert!(!epoll.remove(source.as_raw_fd()).unwrap());
    }

    #[test]
    fn test_remove_bad_descriptor() {
        let epoll = EPoll::new(true).unwrap();
        assert_eq!(
            epoll.remove(-1).unwrap_err().kind(),
            ErrorKind::InvalidSource
        );
    }

    #[test]
    fn test_waker_cannot_be_registered() {
        let epoll = EPoll::new(true).unwrap();
        let fd = epoll.waker().as_raw_fd();
        assert_eq!(
            epoll.set(fd, Interest::READABLE, false).unwrap_err().kind(),
            ErrorKind::InvalidSource
        );
    }
}
