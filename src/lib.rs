//! Portable facade over kernel event-notification primitives: an epoll
//! readiness registry and an eventfd counter.
//!
//! The primitive family is picked at build time and queried with
//! [`resolve`]. On targets without it every constructor fails with
//! [`Error::Unsupported`] instead of the symbols going missing.
//!
//! ```no_run
//! use evnotify::{EventCounter, Interest, Registry};
//! use std::time::Duration;
//!
//! let mut registry = Registry::open()?;
//! let counter = EventCounter::open(0)?;
//! registry.register(&counter, Interest::READABLE)?;
//! counter.add(1)?;
//! for n in registry.wait(Some(Duration::from_secs(1)))? {
//!     println!("{} is ready: {:?}", n.fd, n.ready);
//! }
//! # Ok::<(), evnotify::Error>(())
//! ```

mod config;
mod counter;
mod error;
mod interest;
mod notifier;
mod platform;
mod registry;
mod sys;

pub use config::*;
pub use counter::EventCounter;
pub use error::{Error, ErrorKind, Result};
pub use interest::{Interest, Ready};
pub use notifier::EventNotifier;
pub use platform::{resolve, PlatformFamily};
pub use registry::{Interrupter, Notification, Registry};
pub use sys::{AsRawFd, RawFd};

#[inline]
pub(crate) fn saturating_duration_to_ms(duration: &std::time::Duration) -> libc::c_int {
    // At least one ms when duration > 0
    num::clamp(
        duration
            .saturating_add(std::time::Duration::from_nanos(999_999))
            .as_millis(),
        0,
        libc::c_int::MAX as u128,
    ) as libc::c_int
}

/// `None` waits for ever (-1).
pub(crate) fn saturating_opt_duration_to_ms(duration: Option<std::time::Duration>) -> libc::c_int {
    match duration {
        Some(duration) => saturating_duration_to_ms(&duration),
        None => -1,
    }
}
