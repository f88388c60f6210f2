use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Feature flags carried alongside a [`SpanContext`].
///
/// The bit values are part of the wire contract shared with other Zipkin
/// propagation implementations and must not be renumbered.
///
/// [`SpanContext`]: crate::SpanContext
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Hash)]
pub struct Flags(u64);

impl Flags {
    /// Force sampling and trace emission regardless of the normal
    /// sampling decision.
    pub const DEBUG: Flags = Flags(1);

    /// The sampling decision was explicitly communicated by the upstream
    /// service, as opposed to left open for a downstream sampler.
    ///
    /// This is what distinguishes "not sampled" from "sampling
    /// undecided".
    pub const SAMPLING_SET: Flags = Flags(1 << 1);

    /// The communicated sampling decision is "sampled".
    pub const SAMPLED: Flags = Flags(1 << 2);

    /// The context is the root of a new trace and carries no parent span
    /// id.
    pub const IS_ROOT: Flags = Flags(1 << 3);

    /// Construct flags from their raw bit representation.
    pub const fn new(flags: u64) -> Self {
        Flags(flags)
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub fn contains(&self, other: Flags) -> bool {
        (*self & other) == other
    }

    /// Returns `true` if the debug bit is set.
    pub fn is_debug(&self) -> bool {
        self.contains(Flags::DEBUG)
    }

    /// Returns the flags as a `u64`.
    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl BitAnd for Flags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl Not for Flags {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl fmt::LowerHex for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
