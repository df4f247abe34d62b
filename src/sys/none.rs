//! Targets without a supported primitive family. Constructors fail with
//! `Unsupported` so no value of these types can ever exist.

use super::{AsRawFd, RawFd};
use crate::{Error, Interest, Ready, Result};
use std::sync::Arc;

#[derive(Debug)]
pub enum EventFd {}

impl AsRawFd for EventFd {
    fn as_raw_fd(&self) -> RawFd {
        match *self {}
    }
}

impl EventFd {
    pub fn new(_initval: u32, _close_on_exec: bool, _semaphore: bool) -> Result<Self> {
        Err(Error::Unsupported)
    }
    pub fn try_clone(&self) -> Result<Self> {
        match *self {}
    }
    pub fn write(&self, _value: u64) -> Result<()> {
        match *self {}
    }
    pub fn read(&self) -> Result<u64> {
        match *self {}
    }
    pub fn wait_readable(&self, _timeout_ms: i32) -> Result<bool> {
        match *self {}
    }
}

#[derive(Debug)]
pub enum EPoll {}

impl AsRawFd for EPoll {
    fn as_raw_fd(&self) -> RawFd {
        match *self {}
    }
}

impl EPoll {
    pub fn new(_close_on_exec: bool) -> Result<Self> {
        Err(Error::Unsupported)
    }
    pub fn waker(&self) -> &Arc<EventFd> {
        match *self {}
    }
    pub fn set(&self, _fd: RawFd, _interest: Interest, _known: bool) -> Result<()> {
        match *self {}
    }
    pub fn remove(&self, _fd: RawFd) -> Result<bool> {
        match *self {}
    }
    pub fn wait(&self, _events: &mut [EPollEvent], _timeout_ms: i32) -> Result<usize> {
        match *self {}
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EPollEvent {
    token: u64,
    ready: Ready,
}

impl EPollEvent {
    pub const fn zeroed() -> Self {
        Self {
            token: 0,
            ready: Ready::empty(),
        }
    }
    pub fn token(&self) -> u64 {
        self.token
    }
    pub fn ready(&self) -> Ready {
        self.ready
    }
}
