use crate::{
    CounterConfig, Error, EventCounter, PlatformFamily, Registry, RegistryConfig, Result,
};

/// Capability-checked entry point: every constructor consults the platform
/// family before touching the kernel, and fails with `Unsupported` without
/// returning a partial object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventNotifier {
    family: PlatformFamily,
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventNotifier {
    /// Notifier bound to the process wide [`PlatformFamily::resolve`].
    pub fn new() -> Self {
        Self::with_family(PlatformFamily::resolve())
    }

    /// Notifier bound to an explicit family, e.g. to exercise the
    /// `Unsupported` arm on a capable target.
    pub const fn with_family(family: PlatformFamily) -> Self {
        Self { family }
    }

    #[inline]
    pub const fn family(&self) -> PlatformFamily {
        self.family
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.family.is_supported() {
            Ok(())
        } else {
            log::debug!("cannot open {}: platform family is {}", what, self.family);
            Err(Error::Unsupported)
        }
    }

    pub fn open_registry(&self) -> Result<Registry> {
        self.open_registry_with(RegistryConfig::default())
    }

    pub fn open_registry_with(&self, config: RegistryConfig) -> Result<Registry> {
        self.check("registry")?;
        Registry::create(&config)
    }

    pub fn open_counter(&self, initial: u64) -> Result<EventCounter> {
        self.open_counter_with(initial, CounterConfig::default())
    }

    pub fn open_counter_with(&self, initial: u64, config: CounterConfig) -> Result<EventCounter> {
        self.check("counter")?;
        EventCounter::create(initial, &config)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_unsupported_family_opens_nothing() {
        let notifier = EventNotifier::with_family(PlatformFamily::Unsupported);
        assert_eq!(
            notifier.open_registry().unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            notifier.open_counter(0).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        // the family check comes before argument validation
        assert_eq!(
            notifier.open_counter(u64::MAX).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_default_uses_resolved_family() {
        assert_eq!(EventNotifier::default().family(), PlatformFamily::resolve());
    }

    #[cfg(has_epoll_eventfd)]
    #[test]
    fn test_supported_family_opens() {
        let notifier = EventNotifier::new();
        let mut registry = notifier.open_registry().unwrap();
        let counter = notifier.open_counter(1).unwrap();
        registry
            .register(&counter, crate::Interest::READABLE)
            .unwrap();
        assert_eq!(
            registry.wait(Some(std::time::Duration::ZERO)).unwrap().len(),
            1
        );
    }

    #[cfg(not(has_epoll_eventfd))]
    #[test]
    fn test_capable_family_on_incapable_target() {
        let notifier = EventNotifier::with_family(PlatformFamily::EpollEventfd);
        assert_eq!(
            notifier.open_registry().unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            Registry::open().unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            EventCounter::open(0).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }
}
