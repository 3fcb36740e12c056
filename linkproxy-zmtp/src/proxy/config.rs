//! Proxy topology capacity and poll timeout configuration.

/// Maximum number of poll-table entries (open endpoints + pairs*2 +
/// control) a single proxy instance may hold. Implementation-defined, per
/// the underlying design's `CHAIN_MAX`; overridable via [`ProxyConfig`].
pub const CHAIN_MAX: usize = 10;

/// How long a single [`crate::proxy::Proxy::poll_once`] call waits before
/// giving up.
///
/// Splits the original conflated "-1 means both block forever and require a
/// strict topology" flag into two orthogonal concepts: this type controls
/// only blocking, while strict-topology enforcement is driven directly off
/// `TimeOut::Block` at construction time (see `ProxyBuilder::build`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOut {
    /// Block until a control command, pair forward, or open-endpoint
    /// readiness occurs. Implies the strict-mode construction check.
    Block,
    /// Wait at most this many milliseconds before returning idle.
    Millis(u64),
}

/// A small bitset over the events a poll-table entry is watched for.
///
/// Only `READABLE` has observable behavior in this core: forwarding and
/// control handling are both triggered by read-readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollEvents(u8);

impl PollEvents {
    pub const READABLE: Self = Self(0b01);
    pub const WRITABLE: Self = Self(0b10);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for PollEvents {
    fn default() -> Self {
        Self::READABLE
    }
}

impl std::ops::BitOr for PollEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Construction-time configuration for a [`crate::proxy::Proxy`].
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub chain_max: usize,
    pub time_out: TimeOut,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            chain_max: CHAIN_MAX,
            time_out: TimeOut::Millis(0),
        }
    }
}

impl ProxyConfig {
    #[must_use]
    pub fn custom(chain_max: usize, time_out: TimeOut) -> Self {
        Self { chain_max, time_out }
    }

    /// Build a config from the legacy signed-millisecond convention: `-1`
    /// means block indefinitely (and implies strict mode), any other value
    /// is a bounded wait in milliseconds.
    #[must_use]
    pub fn with_legacy_timeout(millis: i64) -> Self {
        let time_out = if millis < 0 {
            TimeOut::Block
        } else {
            TimeOut::Millis(millis as u64)
        };
        Self {
            chain_max: CHAIN_MAX,
            time_out,
        }
    }
}
