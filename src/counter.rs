use crate::sys::{self, AsRawFd, RawFd};
use crate::{
    saturating_opt_duration_to_ms, CounterConfig, CounterFlags, CounterMode, Error, EventNotifier,
    Result,
};
use std::time::{Duration, Instant};

/// A kernel-backed 64-bit counter for lightweight cross-thread signaling.
///
/// The value lives in the kernel only; `add` and `consume` are atomic with
/// respect to every other handle on the same counter. A non-zero counter is
/// readable, so the counter can be watched by a [`crate::Registry`].
#[derive(Debug)]
pub struct EventCounter {
    fd: Option<sys::EventFd>,
    mode: CounterMode,
}

impl EventCounter {
    /// Largest value the kernel object can hold.
    pub const MAX_VALUE: u64 = u64::MAX - 1;

    /// Opens a blocking counter on the resolved platform family.
    pub fn open(initial: u64) -> Result<Self> {
        EventNotifier::new().open_counter(initial)
    }

    pub fn with_config(initial: u64, config: CounterConfig) -> Result<Self> {
        EventNotifier::new().open_counter_with(initial, config)
    }

    /// Backend constructor, the family check happens in [`EventNotifier`].
    pub(crate) fn create(initial: u64, config: &CounterConfig) -> Result<Self> {
        if initial > Self::MAX_VALUE {
            return Err(Error::Overflow);
        }
        let close_on_exec = config.flags.contains(CounterFlags::CLOSE_ON_EXEC);
        let semaphore = config.flags.contains(CounterFlags::SEMAPHORE);
        // eventfd(2) only takes a 32 bit initial value
        let fd = match u32::try_from(initial) {
            Ok(initval) => sys::EventFd::new(initval, close_on_exec, semaphore)?,
            Err(_) => {
                let fd = sys::EventFd::new(0, close_on_exec, semaphore)?;
                fd.write(initial)?;
                fd
            }
        };
        log::debug!(
            "opened counter fd={} initial={} mode={:?} semaphore={}",
            fd.as_raw_fd(),
            initial,
            config.mode,
            semaphore
        );
        Ok(Self {
            fd: Some(fd),
            mode: config.mode,
        })
    }

    #[inline]
    fn fd(&self) -> Result<&sys::EventFd> {
        self.fd.as_ref().ok_or(Error::AlreadyClosed)
    }

    /// Adds `delta`. Fails with `Overflow`, leaving the value untouched, when
    /// the sum would exceed [`Self::MAX_VALUE`].
    pub fn add(&self, delta: u64) -> Result<()> {
        let fd = self.fd()?;
        if delta > Self::MAX_VALUE {
            return Err(Error::Overflow);
        }
        fd.write(delta)?;
        log::trace!("add fd={} delta={}", fd.as_raw_fd(), delta);
        Ok(())
    }

    /// Reads the value and resets it to zero.
    ///
    /// A zero counter blocks in [`CounterMode::Blocking`] and reports
    /// `WouldBlock` in [`CounterMode::NonBlocking`].
    pub fn consume(&self) -> Result<u64> {
        match self.mode {
            CounterMode::Blocking => self.consume_timeout(None),
            CounterMode::NonBlocking => {
                let value = self.fd()?.read()?;
                log::trace!("consume -> {}", value);
                Ok(value)
            }
        }
    }

    /// Like a blocking [`consume`](Self::consume) bounded by `timeout`, `WouldBlock` once it elapses.
    pub fn consume_timeout(&self, timeout: Option<Duration>) -> Result<u64> {
        let fd = self.fd()?;
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        loop {
            match fd.read() {
                Ok(value) => {
                    log::trace!("consume fd={} -> {}", fd.as_raw_fd(), value);
                    return Ok(value);
                }
                Err(Error::WouldBlock) => {}
                Err(e) => return Err(e),
            }
            // Another consumer may win the race, read again after each wakeup
            let remaining = match deadline {
                None => None,
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => Some(remaining),
                    _ => return Err(Error::WouldBlock),
                },
            };
            fd.wait_readable(saturating_opt_duration_to_ms(remaining))?;
        }
    }

    /// Releases the handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(fd) = self.fd.take() {
            log::debug!("closing counter fd={}", fd.as_raw_fd());
        }
        Ok(())
    }

    /// A second handle on the same kernel counter.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            fd: Some(self.fd()?.try_clone()?),
            mode: self.mode,
        })
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    #[inline]
    pub fn mode(&self) -> CounterMode {
        self.mode
    }
}

/// The eventfd descriptor, or -1 once closed.
impl AsRawFd for EventCounter {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
            .as_ref()
            .map_or(sys::INVALID_RAW_FD, |fd| fd.as_raw_fd())
    }
}

#[cfg(all(test, has_epoll_eventfd))]
mod test {
    use super::*;
    use crate::ErrorKind;
    use rand::Rng;
    use std::sync::Arc;

    fn non_blocking(initial: u64) -> EventCounter {
        EventCounter::with_config(initial, CounterConfig::default().mode(CounterMode::NonBlocking))
            .unwrap()
    }

    #[test]
    fn test_add_then_consume() {
        let c = non_blocking(0);
        c.add(3).unwrap();
        c.add(4).unwrap();
        assert_eq!(c.consume().unwrap(), 7);
        assert_eq!(c.consume().unwrap_err().kind(), ErrorKind::WouldBlock);

        let c = EventCounter::open(0).unwrap();
        c.add(3).unwrap();
        c.add(4).unwrap();
        assert_eq!(c.consume().unwrap(), 7);
        assert_eq!(
            c.consume_timeout(Some(Duration::ZERO)).unwrap_err().kind(),
            ErrorKind::WouldBlock
        );
    }

    #[test]
    fn test_initial_value() {
        assert_eq!(non_blocking(9).consume().unwrap(), 9);
        let big = u32::MAX as u64 + 10;
        assert_eq!(non_blocking(big).consume().unwrap(), big);
        assert_eq!(
            EventCounter::open(u64::MAX).unwrap_err().kind(),
            ErrorKind::Overflow
        );
    }

    #[test]
    fn test_overflow_leaves_value_unchanged() {
        let c = non_blocking(0);
        c.add(EventCounter::MAX_VALUE - 5).unwrap();
        assert_eq!(c.add(6).unwrap_err().kind(), ErrorKind::Overflow);
        assert_eq!(c.add(u64::MAX).unwrap_err().kind(), ErrorKind::Overflow);
        c.add(5).unwrap();
        assert_eq!(c.consume().unwrap(), EventCounter::MAX_VALUE);
    }

    #[test]
    fn test_add_zero() {
        let c = non_blocking(0);
        c.add(0).unwrap();
        assert_eq!(c.consume().unwrap_err().kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut c = non_blocking(1);
        c.close().unwrap();
        c.close().unwrap();
        assert!(c.is_closed());
        assert_eq!(c.as_raw_fd(), -1);
        assert_eq!(c.add(1).unwrap_err().kind(), ErrorKind::AlreadyClosed);
        assert_eq!(c.consume().unwrap_err().kind(), ErrorKind::AlreadyClosed);
        assert_eq!(c.try_clone().unwrap_err().kind(), ErrorKind::AlreadyClosed);
    }

    #[test]
    fn test_semaphore_mode() {
        let config = CounterConfig::default()
            .mode(CounterMode::NonBlocking)
            .flags(CounterFlags::CLOSE_ON_EXEC | CounterFlags::SEMAPHORE);
        let c = EventCounter::with_config(2, config).unwrap();
        assert_eq!(c.consume().unwrap(), 1);
        assert_eq!(c.consume().unwrap(), 1);
        assert_eq!(c.consume().unwrap_err().kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn test_blocking_consume_wakes_on_add() {
        let c = Arc::new(EventCounter::open(0).unwrap());
        let producer = c.try_clone().unwrap();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.add(42).unwrap();
        });
        assert_eq!(c.consume().unwrap(), 42);
        t.join().unwrap();
    }

    #[test]
    fn test_consume_timeout_elapses() {
        let c = EventCounter::open(0).unwrap();
        let start = Instant::now();
        assert_eq!(
            c.consume_timeout(Some(Duration::from_millis(20)))
                .unwrap_err()
                .kind(),
            ErrorKind::WouldBlock
        );
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_concurrent_adds_are_atomic() {
        const N_THREADS: usize = 8;
        const N_ADDS: usize = 500;
        let c = Arc::new(non_blocking(0));
        let handles: Vec<_> = (0..N_THREADS)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    let mut sum = 0u64;
                    for _ in 0..N_ADDS {
                        let delta = rng.gen_range(0..1000u64);
                        c.add(delta).unwrap();
                        sum += delta;
                    }
                    sum
                })
            })
            .collect();
        let expected: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(c.consume().unwrap_or(0), expected);
    }

    #[test]
    fn test_competing_consumers() {
        const TOTAL: u64 = 1000;
        let c = Arc::new(EventCounter::open(0).unwrap());
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    let mut got = 0u64;
                    while let Ok(v) = c.consume_timeout(Some(Duration::from_millis(200))) {
                        got += v;
                    }
                    got
                })
            })
            .collect();
        for _ in 0..TOTAL {
            c.add(1).unwrap();
        }
        let got: u64 = consumers.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(got, TOTAL);
    }
}
