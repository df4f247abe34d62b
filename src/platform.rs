use std::fmt;
use std::sync::OnceLock;

/// The kernel primitive family backing the facade on the current target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFamily {
    /// `epoll` readiness multiplexing and `eventfd` counters (linux, android).
    EpollEventfd,
    /// No supported primitive family, every constructor fails with [`crate::Error::Unsupported`].
    Unsupported,
}

static RESOLVED: OnceLock<PlatformFamily> = OnceLock::new();

impl PlatformFamily {
    /// Uncached compile-time answer, see [`resolve`] for the process wide value.
    pub const fn detect() -> Self {
        if cfg!(has_epoll_eventfd) {
            PlatformFamily::EpollEventfd
        } else {
            PlatformFamily::Unsupported
        }
    }

    /// Resolves the family once per process and returns the cached value.
    pub fn resolve() -> Self {
        *RESOLVED.get_or_init(|| {
            let family = Self::detect();
            log::debug!(
                "resolved platform family {} (target_os={})",
                family,
                std::env::consts::OS
            );
            family
        })
    }

    #[inline]
    pub const fn is_supported(&self) -> bool {
        matches!(self, PlatformFamily::EpollEventfd)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            PlatformFamily::EpollEventfd => "epoll+eventfd",
            PlatformFamily::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shorthand for [`PlatformFamily::resolve`].
#[inline]
pub fn resolve() -> PlatformFamily {
    PlatformFamily::resolve()
}
