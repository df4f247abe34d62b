pub(crate) mod ioutils;

mod poll;
pub(crate) use poll::{poll, PollEvent, PollFd};

mod eventfd;
pub(crate) use eventfd::EventFd;

mod epoll;
pub(crate) use epoll::{EPoll, EPollEvent};
