//! The memory reference type and the line-decomposition logic shared by
//! every straddle-aware component.

use crate::error::RuntimeFault;
use crate::geometry::CacheGeometry;

/// The kind of access a [`Reference`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// An instruction fetch.
    InstrFetch,
    /// A data load.
    DataRead,
    /// A data store.
    DataWrite,
}

/// A single memory reference: address, size in bytes, and kind.
///
/// Source-location attribution is carried separately by callers (as a
/// borrowed [`crate::counters::CounterBlock`]) rather than embedded here,
/// since this type is also used for instruction references, which are not
/// attributed to a per-source counter block in this design.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    /// The starting byte address.
    pub addr: u64,
    /// The size in bytes; normally small (1-16).
    pub size: u64,
    /// What kind of access this is.
    pub kind: RefKind,
}

impl Reference {
    /// Creates a new reference.
    pub fn new(addr: u64, size: u64, kind: RefKind) -> Self {
        Reference { addr, size, kind }
    }
}

/// One line-worth of a (possibly straddled) reference, with the word range
/// within that line that the reference touches.
#[derive(Debug, Clone, Copy)]
pub struct LineSlice {
    /// The block/tag number of the line this slice falls in.
    pub block: u64,
    /// First word-within-line touched.
    pub word_begin: u32,
    /// Last word-within-line touched (inclusive).
    pub word_end: u32,
}

/// The decomposition of a reference into one or two line slices.
#[derive(Debug, Clone, Copy)]
pub enum Decomposed {
    /// The reference falls entirely within one line.
    Single(LineSlice),
    /// The reference straddles exactly two consecutive lines.
    Straddle(LineSlice, LineSlice),
}

/// Splits `reference` into the line(s) it touches under `geometry`.
///
/// # Errors
///
/// Returns [`RuntimeFault::StraddleOverflow`] if the reference spans more
/// than two lines — an upstream instrumentation bug, since every access
/// this crate is specified to see is at most two lines wide.
pub fn decompose(geometry: &CacheGeometry, reference: &Reference) -> Result<Decomposed, RuntimeFault> {
    let block1 = geometry.block_of(reference.addr);
    let last_byte = reference.addr + reference.size - 1;
    let block2 = geometry.block_of(last_byte);

    let offset = geometry.offset_in_line(reference.addr);
    let word_begin = geometry.word_of(offset);
    let word_end_overall = geometry.word_of(offset + reference.size - 1);

    if block1 == block2 {
        return Ok(Decomposed::Single(LineSlice {
            block: block1,
            word_begin,
            word_end: word_end_overall,
        }));
    }

    if block1 + 1 == block2 {
        let word_end2 = word_end_overall - geometry.num_words_per_line as u32;
        let word_end1 = geometry.num_words_per_line as u32 - 1;
        return Ok(Decomposed::Straddle(
            LineSlice {
                block: block1,
                word_begin,
                word_end: word_end1,
            },
            LineSlice {
                block: block2,
                word_begin: 0,
                word_end: word_end2,
            },
        ));
    }

    Err(RuntimeFault::StraddleOverflow {
        addr: reference.addr,
        size: reference.size,
        line_size: geometry.line_size,
    })
}

/// Returns `true` if `addr..addr+size` falls within a single cache block
/// under `geometry`, i.e. does not straddle.
pub fn is_single_block(geometry: &CacheGeometry, addr: u64, size: u64) -> bool {
    geometry.block_of(addr) == geometry.block_of(addr + size - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Level;

    #[test]
    fn single_block_reference() {
        let g = CacheGeometry::new(Level::D1, 256, 4, 64).unwrap();
        let r = Reference::new(0x10, 8, RefKind::DataRead);
        match decompose(&g, &r).unwrap() {
            Decomposed::Single(slice) => {
                assert_eq!(slice.block, 0);
                assert_eq!(slice.word_begin, 2);
                assert_eq!(slice.word_end, 2);
            }
            Decomposed::Straddle(..) => panic!("expected single"),
        }
    }

    #[test]
    fn straddling_reference() {
        let g = CacheGeometry::new(Level::D1, 256, 4, 64).unwrap();
        let r = Reference::new(0x3C, 8, RefKind::DataRead);
        match decompose(&g, &r).unwrap() {
            Decomposed::Straddle(first, second) => {
                assert_eq!(first.block, 0);
                assert_eq!(first.word_end, 7);
                assert_eq!(second.block, 1);
                assert_eq!(second.word_begin, 0);
            }
            Decomposed::Single(..) => panic!("expected straddle"),
        }
    }

    #[test]
    fn overflowing_reference_errors() {
        let g = CacheGeometry::new(Level::D1, 256, 4, 64).unwrap();
        let r = Reference::new(0x0, 200, RefKind::DataRead);
        assert!(decompose(&g, &r).is_err());
    }
}
