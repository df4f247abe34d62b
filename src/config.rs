use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegistryFlags: u32 {
        const CLOSE_ON_EXEC = 1u32 << 0;
    }
}

/// Registry parameters
#[derive(Debug, Copy, Clone)]
pub struct RegistryConfig {
    /// maximal number of notifications returned by one `wait`, at least 1
    pub max_events: u32,
    /// Flags
    pub flags: RegistryFlags,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_events: 20,
            flags: RegistryFlags::CLOSE_ON_EXEC,
        }
    }
}

impl RegistryConfig {
    pub fn max_events(mut self, max_events: u32) -> Self {
        self.max_events = max_events;
        self
    }
    pub fn flags(mut self, flags: RegistryFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// What `EventCounter::consume` does when the counter is zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CounterMode {
    /// Park the calling thread until the counter becomes non-zero.
    #[default]
    Blocking,
    /// Return `Error::WouldBlock`.
    NonBlocking,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CounterFlags: u32 {
        const CLOSE_ON_EXEC = 1u32 << 0;
        /// `consume` returns 1 and decrements instead of draining.
        const SEMAPHORE = 1u32 << 1;
    }
}

/// Event counter parameters
#[derive(Debug, Copy, Clone)]
pub struct CounterConfig {
    pub mode: CounterMode,
    /// Flags
    pub flags: CounterFlags,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            mode: CounterMode::Blocking,
            flags: CounterFlags::CLOSE_ON_EXEC,
        }
    }
}

impl CounterConfig {
    pub fn mode(mut self, mode: CounterMode) -> Self {
        self.mode = mode;
        self
    }
    pub fn flags(mut self, flags: CounterFlags) -> Self {
        self.flags = flags;
        self
    }
}
