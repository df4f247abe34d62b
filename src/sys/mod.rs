//! Native primitive families. Exactly one arm is compiled in, picked by the
//! `has_epoll_eventfd` cfg emitted by the build script.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        pub use std::os::fd::{AsRawFd, RawFd};
    } else {
        pub type RawFd = i32;

        /// Stand-in for `std::os::fd::AsRawFd` on targets without unix descriptors.
        pub trait AsRawFd {
            fn as_raw_fd(&self) -> RawFd;
        }
    }
}

pub const INVALID_RAW_FD: RawFd = -1;

cfg_if::cfg_if! {
    if #[cfg(has_epoll_eventfd)] {
        mod unix;
        pub(crate) use unix::*;
    } else {
        mod none;
        pub(crate) use none::*;
    }
}
