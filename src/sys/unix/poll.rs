use std::io::{Error, ErrorKind, Result};

#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct PollFd(libc::pollfd);

pub const MAX_POLL_FDS: usize = libc::nfds_t::MAX as _;

bitflags::bitflags! {
    /// Represents a set of input and output flags for poll.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct PollEvent: i16 {
        /// Readable interests or event.
        const IN = libc::POLLIN;
        /// Writable interests or event.
        const OUT = libc::POLLOUT;

        /// Error event.
        const ERR = libc::POLLERR;
        /// Hang-up event.
        const HUP = libc::POLLHUP;
        /// Descriptor is not open.
        const NVAL = libc::POLLNVAL;
    }
}

impl PollFd {
    #[inline]
    pub fn new(fd: libc::c_int, events: PollEvent) -> Self {
        Self(libc::pollfd {
            fd,
            events: events.bits(),
            revents: 0 as _,
        })
    }

    #[inline(always)]
    pub fn revents(&self) -> PollEvent {
        PollEvent::from_bits_truncate(self.0.revents)
    }
}

impl std::fmt::Debug for PollFd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollFd")
            .field("fd", &self.0.fd)
            .field("events", &PollEvent::from_bits_truncate(self.0.events))
            .field("revents", &self.revents())
            .finish()
    }
}

/// `poll(2)`, returns the number of descriptors with a non-empty `revents`.
pub fn poll(pfd: &mut [PollFd], timeout: libc::c_int) -> Result<usize> {
    // A bug in kernels < 2.6.37 makes timeouts larger than LONG_MAX / CONFIG_HZ
    // (approx. 30 minutes with CONFIG_HZ=1200) effectively infinite on 32 bits
    // architectures. The magic number is the same constant used by libuv.
    #[cfg(target_pointer_width = "32")]
    let timeout = std::cmp::min(1789569 as libc::c_int, timeout);

    if pfd.len() > MAX_POLL_FDS {
        return Err(Error::from(ErrorKind::InvalidInput));
    }
    let poll_result = unsafe { libc::poll(pfd.as_mut_ptr() as _, pfd.len() as _, timeout as _) };
    if poll_result < 0 {
        Err(Error::last_os_error())
    } else {
        Ok(poll_result as usize)
    }
}
