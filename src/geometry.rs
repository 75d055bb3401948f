//! Cache geometry: the immutable size/associativity/line-size triple each
//! level is configured with, plus the derived shift/mask constants the
//! hot path needs on every reference.

use crate::bits::log2_exact;
use crate::error::{ConfigError, Level};

/// The machine word size this crate assumes line sizes are multiples of.
pub const WORD_SIZE: usize = std::mem::size_of::<u64>();

/// A validated cache geometry: total size, associativity and line size,
/// plus every value derived from them that the simulation hot path reads.
#[derive(Debug, Clone, Copy)]
pub struct CacheGeometry {
    /// Total cache size in bytes.
    pub size: usize,
    /// Number of ways per set.
    pub assoc: usize,
    /// Line size in bytes.
    pub line_size: usize,
    /// Number of sets (`size / (assoc * line_size)`).
    pub sets: usize,
    /// `sets - 1`, used as a mask since `sets` is a power of two.
    pub sets_mask: usize,
    /// `log2(line_size)`.
    pub line_size_bits: u32,
    /// `log2(line_size)`, used to split an address into word-within-line offsets.
    pub word_size_bits: u32,
    /// Number of machine words per line.
    pub num_words_per_line: usize,
}

impl CacheGeometry {
    /// Validates and derives a cache geometry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `assoc` or `size` is zero, if `size` is
    /// not divisible by `assoc * line_size`, if `line_size` is not a power
    /// of two, or if `line_size` is smaller than the machine word size.
    pub fn new(level: Level, size: usize, assoc: usize, line_size: usize) -> Result<Self, ConfigError> {
        let line_size_bits = log2_exact(line_size).ok_or(ConfigError::LineSizeNotPowerOfTwo { level, line_size })?;

        if line_size < WORD_SIZE {
            return Err(ConfigError::LineSizeTooSmall {
                level,
                line_size,
                word_size: WORD_SIZE,
            });
        }

        if assoc == 0 {
            return Err(ConfigError::ZeroAssociativity { level });
        }

        if size == 0 {
            return Err(ConfigError::ZeroSize { level });
        }

        if size % (assoc * line_size) != 0 {
            return Err(ConfigError::SizeNotDivisible {
                level,
                size,
                assoc,
                line_size,
            });
        }

        let num_lines = size / line_size;
        let sets = num_lines / assoc;
        debug_assert!(sets.is_power_of_two(), "sets derives to a power of two whenever size/assoc/line_size are themselves powers of two multiples");

        let word_size_bits = log2_exact(WORD_SIZE).expect("WORD_SIZE is a compile-time power of two");
        let num_words_per_line = line_size / WORD_SIZE;

        Ok(CacheGeometry {
            size,
            assoc,
            line_size,
            sets,
            sets_mask: sets - 1,
            line_size_bits,
            word_size_bits,
            num_words_per_line,
        })
    }

    /// Splits a block address into `(set_index, tag)`.
    #[inline]
    pub fn set_and_tag(&self, block: u64) -> (usize, u64) {
        let set_index = (block as usize) & self.sets_mask;
        (set_index, block)
    }

    /// The block number containing byte address `addr`.
    #[inline]
    pub fn block_of(&self, addr: u64) -> u64 {
        addr >> self.line_size_bits
    }

    /// The word-within-line index of byte offset `offset`.
    #[inline]
    pub fn word_of(&self, offset_in_line: u64) -> u32 {
        (offset_in_line >> self.word_size_bits) as u32
    }

    /// The byte offset of `addr` within its line.
    #[inline]
    pub fn offset_in_line(&self, addr: u64) -> u64 {
        addr & (self.line_size as u64 - 1)
    }
}

/// Validates that I1 and LL share a line size, as the instruction fast
/// path requires.
pub fn check_i1_ll_line_size(i1: &CacheGeometry, ll: &CacheGeometry) -> Result<(), ConfigError> {
    if i1.line_size != ll.line_size {
        Err(ConfigError::I1LLLineSizeMismatch {
            i1_line_size: i1.line_size,
            ll_line_size: ll.line_size,
        })
    } else {
        Ok(())
    }
}
