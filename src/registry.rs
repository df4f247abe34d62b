use crate::sys::{self, AsRawFd, RawFd};
use crate::{
    saturating_opt_duration_to_ms, Error, EventNotifier, Interest, Ready, RegistryConfig,
    RegistryFlags, Result,
};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// One source observed ready by [`Registry::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Notification {
    pub fd: RawFd,
    pub ready: Ready,
}

impl Notification {
    /// Readable/writable part of the observation.
    #[inline]
    pub fn events(&self) -> Ready {
        self.ready & (Ready::READABLE | Ready::WRITABLE)
    }

    /// Like [`events`](Self::events), but falls back to the registered
    /// readable/writable interest when the kernel only reported an error or
    /// hang-up, so waiters on that interest still get woken.
    pub fn events_or(&self, interest: Interest) -> Ready {
        let events = self.events();
        if events.is_empty() {
            Ready::from_bits_truncate((interest & (Interest::READABLE | Interest::WRITABLE)).bits())
        } else {
            events
        }
    }

    /// The peer hung up and nothing is left to read.
    pub fn is_end_of_file(&self) -> bool {
        !self.ready.contains(Ready::READABLE)
            && self.ready.intersects(Ready::HANG_UP | Ready::READ_HANG_UP)
    }

    pub fn is_error(&self) -> bool {
        self.ready.intersects(Ready::ERROR | Ready::PRIORITY)
    }
}

/// A readiness multiplexing context.
///
/// `wait` takes `&self` and may run on several threads at once; membership
/// changes take `&mut self`.
#[derive(Debug)]
pub struct Registry {
    epoll: Option<sys::EPoll>,
    members: FxHashMap<RawFd, Interest>,
    max_events: usize,
}

impl Registry {
    /// Upper bound for [`RegistryConfig::max_events`], larger values are clamped.
    pub const MAX_EVENTS_LIMIT: usize = 4096;

    /// Opens a registry on the resolved platform family.
    pub fn open() -> Result<Self> {
        EventNotifier::new().open_registry()
    }

    pub fn with_config(config: RegistryConfig) -> Result<Self> {
        EventNotifier::new().open_registry_with(config)
    }

    /// Backend constructor, the family check happens in [`EventNotifier`].
    pub(crate) fn create(config: &RegistryConfig) -> Result<Self> {
        let epoll = sys::EPoll::new(config.flags.contains(RegistryFlags::CLOSE_ON_EXEC))?;
        log::debug!(
            "opened registry fd={} max_events={}",
            epoll.as_raw_fd(),
            config.max_events
        );
        Ok(Self {
            epoll: Some(epoll),
            members: FxHashMap::default(),
            max_events: (config.max_events as usize).clamp(1, Self::MAX_EVENTS_LIMIT),
        })
    }

    #[inline]
    fn epoll(&self) -> Result<&sys::EPoll> {
        self.epoll.as_ref().ok_or(Error::AlreadyClosed)
    }

    /// Registers `source`, or replaces its interest if already registered.
    pub fn register<S: AsRawFd + ?Sized>(&mut self, source: &S, interest: Interest) -> Result<()> {
        let fd = source.as_raw_fd();
        // borrow the fields apart, `members` is mutated while `epoll` is live
        let epoll = self.epoll.as_ref().ok_or(Error::AlreadyClosed)?;
        if fd < 0 || fd == epoll.as_raw_fd() {
            return Err(Error::InvalidSource);
        }
        self.members.try_reserve(1).map_err(|_| {
            Error::ResourceExhausted(std::io::Error::from(std::io::ErrorKind::OutOfMemory))
        })?;
        let known = self.members.contains_key(&fd);
        epoll.set(fd, interest, known)?;
        log::trace!("register fd={} interest={:?} known={}", fd, interest, known);
        self.members.insert(fd, interest);
        Ok(())
    }

    /// Removes `source` from the registry.
    ///
    /// When the descriptor was already closed the local entry is cleared and
    /// `InvalidSource` is returned: if a duplicate still holds the open file,
    /// the kernel keeps reporting it under the old number until that
    /// duplicate is closed too.
    pub fn unregister<S: AsRawFd + ?Sized>(&mut self, source: &S) -> Result<()> {
        let fd = source.as_raw_fd();
        let epoll = self.epoll.as_ref().ok_or(Error::AlreadyClosed)?;
        if !self.members.contains_key(&fd) {
            return Err(Error::NotRegistered);
        }
        match epoll.remove(fd) {
            Ok(true) => {}
            Ok(false) => log::debug!("fd={} was already dropped by the kernel", fd),
            Err(Error::InvalidSource) => {
                log::debug!("fd={} is no longer open, clearing its entry", fd);
                self.members.remove(&fd);
                return Err(Error::InvalidSource);
            }
            Err(e) => return Err(e),
        }
        log::trace!("unregister fd={}", fd);
        self.members.remove(&fd);
        Ok(())
    }

    /// Waits until a registered source is ready or `timeout` elapses.
    ///
    /// `Some(Duration::ZERO)` polls, `None` blocks indefinitely. A timeout
    /// returns an empty vector.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Vec<Notification>> {
        let epoll = self.epoll()?;
        let mut events = vec![sys::EPollEvent::zeroed(); self.max_events];
        let n = epoll.wait(&mut events, saturating_opt_duration_to_ms(timeout))?;
        log::trace!("wait fd={} timeout={:?} -> {}", epoll.as_raw_fd(), timeout, n);
        Ok(events[..n]
            .iter()
            .map(|e| Notification {
                fd: e.token() as RawFd,
                ready: e.ready(),
            })
            .collect())
    }

    /// Releases the handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(epoll) = self.epoll.take() {
            log::debug!(
                "closing registry fd={} with {} members",
                epoll.as_raw_fd(),
                self.members.len()
            );
            drop(epoll);
        }
        self.members.clear();
        Ok(())
    }

    /// Handle that makes a blocked or the next `wait` return `Interrupted`.
    /// When the interrupt lands together with ready sources, those are
    /// returned first and the following `wait` reports the interrupt.
    pub fn interrupter(&self) -> Result<Interrupter> {
        Ok(Interrupter {
            waker: Arc::downgrade(self.epoll()?.waker()),
        })
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.epoll.is_none()
    }

    pub fn contains<S: AsRawFd + ?Sized>(&self, source: &S) -> bool {
        self.members.contains_key(&source.as_raw_fd())
    }

    /// Interest currently registered for `source`.
    pub fn interest_of<S: AsRawFd + ?Sized>(&self, source: &S) -> Option<Interest> {
        self.members.get(&source.as_raw_fd()).copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }
}

/// The epoll descriptor, or -1 once closed.
impl AsRawFd for Registry {
    fn as_raw_fd(&self) -> RawFd {
        self.epoll
            .as_ref()
            .map_or(sys::INVALID_RAW_FD, |e| e.as_raw_fd())
    }
}

/// Cancels waits on a [`Registry`] from any thread.
#[derive(Debug, Clone)]
pub struct Interrupter {
    waker: Weak<sys::EventFd>,
}

impl Interrupter {
    /// Fails with `AlreadyClosed` once the registry is closed or dropped.
    pub fn interrupt(&self) -> Result<()> {
        let waker = self.waker.upgrade().ok_or(Error::AlreadyClosed)?;
        match waker.write(1) {
            // saturated, an interrupt is already pending
            Err(Error::Overflow) => Ok(()),
            r => r,
        }
    }
}
