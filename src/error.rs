//! Error types for cache geometry validation and unrecoverable simulator invariants.

use thiserror::Error;

/// A cache level identifier, used to attribute configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// First-level instruction cache.
    I1,
    /// First-level data cache.
    D1,
    /// Last-level (unified) cache.
    LL,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Level::I1 => "I1",
            Level::D1 => "D1",
            Level::LL => "LL",
        };
        f.write_str(s)
    }
}

/// Errors raised while validating cache geometry at construction time.
///
/// This is the only recoverable error surface in the crate: every other
/// entry point either succeeds or aborts, because there is no well-defined
/// state to return to once a reference stream is already in flight.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `associativity` is zero; a cache with no ways cannot hold a line.
    #[error("{level} geometry invalid: associativity must be nonzero")]
    ZeroAssociativity {
        /// The level this geometry belongs to.
        level: Level,
    },

    /// `size` is zero; a cache with no capacity cannot hold a line.
    #[error("{level} geometry invalid: size must be nonzero")]
    ZeroSize {
        /// The level this geometry belongs to.
        level: Level,
    },

    /// `size` is not evenly divisible by `associativity * line_size`.
    #[error("{level} geometry invalid: size {size} is not divisible by assoc {assoc} * line_size {line_size}")]
    SizeNotDivisible {
        /// The level this geometry belongs to.
        level: Level,
        /// The configured total size in bytes.
        size: usize,
        /// The configured associativity.
        assoc: usize,
        /// The configured line size in bytes.
        line_size: usize,
    },

    /// `line_size` is not a power of two.
    #[error("{level} line_size {line_size} is not a power of two")]
    LineSizeNotPowerOfTwo {
        /// The level this geometry belongs to.
        level: Level,
        /// The offending line size.
        line_size: usize,
    },

    /// `line_size` is smaller than the machine word size.
    #[error("{level} line_size {line_size} is smaller than the machine word size {word_size}")]
    LineSizeTooSmall {
        /// The level this geometry belongs to.
        level: Level,
        /// The offending line size.
        line_size: usize,
        /// The machine word size in bytes.
        word_size: usize,
    },

    /// I1 and LL must share a line size so the instruction fast path is valid.
    #[error("I1 line_size {i1_line_size} does not match LL line_size {ll_line_size}")]
    I1LLLineSizeMismatch {
        /// I1's configured line size.
        i1_line_size: usize,
        /// LL's configured line size.
        ll_line_size: usize,
    },
}

/// Internal errors detected mid-simulation that have no well-defined recovery.
///
/// Every entry point that decomposes a reference into cache lines returns
/// this as an `Err` rather than panicking, so a caller can choose how to
/// react to an upstream instrumentation bug (a reference wider than two
/// lines) instead of the whole process aborting. In practice this should
/// never trigger: nothing this crate is specified to see spans more than
/// two lines.
#[derive(Debug, Error)]
pub enum RuntimeFault {
    /// A single reference spanned more than two cache lines.
    #[error("reference at {addr:#x} of size {size} spans more than two cache lines (line_size={line_size})")]
    StraddleOverflow {
        /// The reference's starting address.
        addr: u64,
        /// The reference's size in bytes.
        size: u64,
        /// The line size it was checked against.
        line_size: usize,
    },
}
