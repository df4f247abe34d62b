use bitflags::bitflags;

cfg_if::cfg_if! {
    if #[cfg(has_epoll_eventfd)] {
        const READABLE: u32 = libc::EPOLLIN as u32;
        const PRIORITY: u32 = libc::EPOLLPRI as u32;
        const WRITABLE: u32 = libc::EPOLLOUT as u32;
        const ERROR: u32 = libc::EPOLLERR as u32;
        const HANG_UP: u32 = libc::EPOLLHUP as u32;
        const READ_HANG_UP: u32 = libc::EPOLLRDHUP as u32;
        const ONESHOT: u32 = libc::EPOLLONESHOT as u32;
        const EDGE_TRIGGERED: u32 = libc::EPOLLET as u32;
    } else {
        const READABLE: u32 = 0x001u32;
        const PRIORITY: u32 = 0x002u32;
        const WRITABLE: u32 = 0x004u32;
        const ERROR: u32 = 0x008u32;
        const HANG_UP: u32 = 0x010u32;
        const READ_HANG_UP: u32 = 0x2000u32;
        const ONESHOT: u32 = 1u32 << 30;
        const EDGE_TRIGGERED: u32 = 1u32 << 31;
    }
}

bitflags! {
    /// What a registration asks to be woken for.
    ///
    /// Registrations are level-triggered unless [`Interest::EDGE_TRIGGERED`]
    /// is set; the mode is handed to the kernel as is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Interest: u32 {
        /// Readable interests.
        const READABLE = READABLE;
        /// Writable interests.
        const WRITABLE = WRITABLE;
        /// Priority (out of band) interests.
        const PRIORITY = PRIORITY;
        /// Peer closed its end or shut down its writing half.
        const READ_HANG_UP = READ_HANG_UP;
        /// Report transitions only.
        const EDGE_TRIGGERED = EDGE_TRIGGERED;
        /// Disarm after the first event until registered again.
        const ONESHOT = ONESHOT;
    }
}

impl Interest {
    #[inline]
    pub const fn is_edge_triggered(&self) -> bool {
        self.contains(Interest::EDGE_TRIGGERED)
    }

    #[inline]
    pub const fn is_oneshot(&self) -> bool {
        self.contains(Interest::ONESHOT)
    }
}

bitflags! {
    /// What the kernel observed on a source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Ready: u32 {
        const READABLE = READABLE;
        const WRITABLE = WRITABLE;
        const PRIORITY = PRIORITY;
        /// Error condition, always reported.
        const ERROR = ERROR;
        /// Hang-up, always reported.
        const HANG_UP = HANG_UP;
        const READ_HANG_UP = READ_HANG_UP;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trigger_mode() {
        assert!(!Interest::READABLE.is_edge_triggered());
        assert!((Interest::READABLE | Interest::EDGE_TRIGGERED).is_edge_triggered());
        assert!((Interest::WRITABLE | Interest::ONESHOT).is_oneshot());
    }

    #[test]
    fn test_ready_truncates_interest_only_bits() {
        let raw = (Interest::READABLE | Interest::EDGE_TRIGGERED | Interest::ONESHOT).bits();
        assert_eq!(Ready::from_bits_truncate(raw), Ready::READABLE);
    }
}
