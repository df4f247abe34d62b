use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the facade reports.
///
/// There is no catch-all variant: a kernel errno is always folded into the
/// outcome that describes it for the operation that produced it.
#[derive(Debug)]
pub enum Error {
    /// The platform lacks the primitive family. Structural, never retried.
    Unsupported,
    /// The handle was used after `close`.
    AlreadyClosed,
    /// The source is not a member of the registry.
    NotRegistered,
    /// The kernel refused the descriptor (closed, not pollable, or the registry itself).
    InvalidSource,
    /// The counter would exceed [`crate::EventCounter::MAX_VALUE`]. The value is unchanged.
    Overflow,
    /// A wait was cancelled by a signal or an [`crate::Interrupter`].
    Interrupted,
    /// A non-blocking consume found the counter at zero.
    WouldBlock,
    /// A kernel resource limit was hit (descriptors, memory, `max_user_watches`).
    ResourceExhausted(io::Error),
}

/// Fieldless discriminant of [`Error`], handy for comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unsupported,
    AlreadyClosed,
    NotRegistered,
    InvalidSource,
    Overflow,
    Interrupted,
    WouldBlock,
    ResourceExhausted,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unsupported => ErrorKind::Unsupported,
            Error::AlreadyClosed => ErrorKind::AlreadyClosed,
            Error::NotRegistered => ErrorKind::NotRegistered,
            Error::InvalidSource => ErrorKind::InvalidSource,
            Error::Overflow => ErrorKind::Overflow,
            Error::Interrupted => ErrorKind::Interrupted,
            Error::WouldBlock => ErrorKind::WouldBlock,
            Error::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
        }
    }

    /// `true` when retrying the same call may succeed without any other change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Interrupted | Error::WouldBlock)
    }

    /// `true` when the handle is still usable after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Interrupted | Error::WouldBlock | Error::Overflow | Error::NotRegistered
        )
    }
}

#[cfg(has_epoll_eventfd)]
impl Error {
    fn exhausted(err: &io::Error) -> bool {
        matches!(
            err.raw_os_error(),
            Some(libc::EMFILE | libc::ENFILE | libc::ENOMEM | libc::ENOSPC | libc::ENODEV)
        )
    }

    /// `epoll_create1`, `eventfd`, `dup`
    pub(crate) fn from_open(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ENOSYS) | Some(libc::EINVAL) => Error::Unsupported,
            _ => Error::ResourceExhausted(err),
        }
    }

    /// `epoll_ctl`, once `EEXIST`/`ENOENT` have been handled by the caller
    pub(crate) fn from_ctl(err: io::Error) -> Self {
        if Self::exhausted(&err) {
            Error::ResourceExhausted(err)
        } else {
            Error::InvalidSource
        }
    }

    /// `epoll_wait`, `poll`
    pub(crate) fn from_wait(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EINTR) => Error::Interrupted,
            _ if Self::exhausted(&err) => Error::ResourceExhausted(err),
            _ => Error::AlreadyClosed,
        }
    }

    /// `read(2)` on an eventfd
    pub(crate) fn from_read(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EAGAIN) => Error::WouldBlock,
            Some(libc::EINTR) => Error::Interrupted,
            _ if Self::exhausted(&err) => Error::ResourceExhausted(err),
            _ => Error::AlreadyClosed,
        }
    }

    /// `write(2)` on an eventfd
    pub(crate) fn from_write(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EAGAIN) | Some(libc::EINVAL) => Error::Overflow,
            Some(libc::EINTR) => Error::Interrupted,
            _ if Self::exhausted(&err) => Error::ResourceExhausted(err),
            _ => Error::AlreadyClosed,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported => f.write_str("event notification primitives are not supported on this platform"),
            Error::AlreadyClosed => f.write_str("handle already closed"),
            Error::NotRegistered => f.write_str("source is not registered"),
            Error::InvalidSource => f.write_str("invalid event source"),
            Error::Overflow => f.write_str("event counter overflow"),
            Error::Interrupted => f.write_str("wait interrupted"),
            Error::WouldBlock => f.write_str("operation would block"),
            Error::ResourceExhausted(err) => write!(f, "kernel resource exhausted: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ResourceExhausted(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(val: Error) -> Self {
        if let Error::ResourceExhausted(err) = val {
            return err;
        }
        let kind = match &val {
            Error::Unsupported => io::ErrorKind::Unsupported,
            Error::NotRegistered => io::ErrorKind::NotFound,
            Error::InvalidSource | Error::Overflow => io::ErrorKind::InvalidInput,
            Error::Interrupted => io::ErrorKind::Interrupted,
            Error::WouldBlock => io::ErrorKind::WouldBlock,
            Error::AlreadyClosed | Error::ResourceExhausted(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, val)
    }
}
