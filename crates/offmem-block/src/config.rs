//! Block factory configuration.

/// Configuration for a [`MemoryBlockFactory`](crate::MemoryBlockFactory).
///
/// Immutable once the factory is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Whether [`release`](crate::MemoryBlockFactory::release) also
    /// releases the allocator.
    ///
    /// Default: `true`.
    pub owns_allocator: bool,

    /// Whether produced roots (and every view sliced from them) validate
    /// offsets, addresses and slice bounds before use.
    ///
    /// Default: `false`. Memory-touching operations check the root range
    /// either way; this flag adds argument validation on top.
    pub checking: bool,
}

impl FactoryConfig {
    /// Default ownership: the factory owns its allocator.
    pub const DEFAULT_OWNS_ALLOCATOR: bool = true;

    /// Default checking: off.
    pub const DEFAULT_CHECKING: bool = false;

    /// Explicit configuration.
    pub fn new(owns_allocator: bool, checking: bool) -> Self {
        Self {
            owns_allocator,
            checking,
        }
    }

    /// Owned allocator, no argument checking.
    pub fn production() -> Self {
        Self::new(true, false)
    }

    /// Owned allocator, argument checking on.
    pub fn testing() -> Self {
        Self::new(true, true)
    }

    /// Same configuration with a borrowed allocator.
    pub fn borrowed(self) -> Self {
        Self {
            owns_allocator: false,
            ..self
        }
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_OWNS_ALLOCATOR, Self::DEFAULT_CHECKING)
    }
}
