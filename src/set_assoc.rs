//! Set-associative LRU cache model, shared by the I1, D1 and LL levels.
//!
//! Each set's LRU order is a small vector of way-indices, most-recently
//! used first — simpler and faster than a linked list for the
//! associativities this crate targets (typically ≤ 16).

use crate::bits::{popcount, set_bit_range};
use crate::counters::CounterBlock;
use crate::geometry::CacheGeometry;
use crate::reference::{decompose, Decomposed, LineSlice, Reference};
use crate::error::RuntimeFault;

/// Which level's usage histogram an eviction should be charged to.
///
/// I1 instances pass [`HistogramLevel::D1`] as an inert placeholder: I1
/// never binds an `install_source`, so the eviction-accounting branch
/// that reads this value is never reached for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramLevel {
    /// Charge evictions to `CounterBlock::record_d1_eviction_usage`.
    D1,
    /// Charge evictions to `CounterBlock::record_ll_eviction_usage`.
    LL,
}

/// One cache line's live state: its tag, which words have been touched
/// since install, and (for D1/LL) the source location that installed it.
struct LineEntry<'a> {
    /// Whether this slot has ever been installed. Tracked separately from
    /// `tag` rather than reusing `tag == 0` as an "empty" sentinel: block
    /// 0 (address range `0..line_size`) is a legitimate tag, and a stream
    /// that references it would otherwise spuriously "hit" an empty slot.
    valid: bool,
    tag: u64,
    bitvector: u32,
    install_source: Option<&'a CounterBlock>,
    install_line_number: u32,
}

impl<'a> Default for LineEntry<'a> {
    fn default() -> Self {
        LineEntry {
            valid: false,
            tag: 0,
            bitvector: 0,
            install_source: None,
            install_line_number: 0,
        }
    }
}

/// A set-associative, LRU-replaced cache level.
///
/// The `'a` lifetime ties the cache to the counter blocks it may borrow a
/// reference into on eviction; the simulator that owns this cache must
/// not outlive the table of counter blocks its caller is attributing
/// references to.
pub struct SetAssociativeCache<'a> {
    geometry: CacheGeometry,
    histogram_level: HistogramLevel,
    lines: Vec<LineEntry<'a>>,
    /// Per-set way order, MRU-first; `lru[set][0]` is the MRU way.
    lru: Vec<Vec<u8>>,
}

impl<'a> std::fmt::Debug for SetAssociativeCache<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetAssociativeCache")
            .field("sets", &self.geometry.sets)
            .field("assoc", &self.geometry.assoc)
            .field("histogram_level", &self.histogram_level)
            .finish()
    }
}

impl<'a> SetAssociativeCache<'a> {
    /// Builds a level model from a validated geometry.
    pub fn new(geometry: CacheGeometry, histogram_level: HistogramLevel) -> Self {
        let assoc = geometry.assoc;
        let total_lines = geometry.sets * assoc;
        let mut lines = Vec::with_capacity(total_lines);
        lines.resize_with(total_lines, LineEntry::default);

        let mut lru = Vec::with_capacity(geometry.sets);
        for _ in 0..geometry.sets {
            lru.push((0..assoc as u8).rev().collect());
        }

        SetAssociativeCache {
            geometry,
            histogram_level,
            lines,
            lru,
        }
    }

    /// The geometry this level was built from.
    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    fn line_index(&self, set_index: usize, way: u8) -> usize {
        set_index * self.geometry.assoc + way as usize
    }

    fn charge_eviction(&self, evicted: &LineEntry<'a>) {
        let Some(source) = evicted.install_source else {
            return;
        };
        if !evicted.valid {
            return;
        }
        let words_used = popcount(evicted.bitvector);
        if words_used == 0 {
            #[cfg(feature = "trace")]
            log::error!(
                "classification ambiguity: evicted line had a source location but an empty usage bitvector (line_num={})",
                evicted.install_line_number
            );
            return;
        }
        match self.histogram_level {
            HistogramLevel::D1 => source.record_d1_eviction_usage(words_used),
            HistogramLevel::LL => source.record_ll_eviction_usage(words_used),
        }
    }

    /// Accesses a single already-decomposed line slice. Returns `true` on
    /// miss.
    fn access_slice(
        &mut self,
        slice: LineSlice,
        install_source: Option<&'a CounterBlock>,
        install_line_number: u32,
    ) -> bool {
        let (set_index, tag) = self.geometry.set_and_tag(slice.block);
        let assoc = self.geometry.assoc;

        // MRU fast path: the common case.
        let mru_way = self.lru[set_index][0];
        let mru_idx = self.line_index(set_index, mru_way);
        if self.lines[mru_idx].valid && self.lines[mru_idx].tag == tag {
            set_bit_range(&mut self.lines[mru_idx].bitvector, slice.word_begin, slice.word_end);
            return false;
        }

        // Scan remaining ways.
        for pos in 1..assoc {
            let way = self.lru[set_index][pos];
            let idx = self.line_index(set_index, way);
            if self.lines[idx].valid && self.lines[idx].tag == tag {
                // Rotate: `way` moves to position 0, everything before it shifts down one.
                self.lru[set_index].copy_within(0..pos, 1);
                self.lru[set_index][0] = way;
                set_bit_range(&mut self.lines[idx].bitvector, slice.word_begin, slice.word_end);
                return false;
            }
        }

        // Miss: evict the LRU way.
        let victim_way = self.lru[set_index][assoc - 1];
        let victim_idx = self.line_index(set_index, victim_way);

        self.charge_eviction(&self.lines[victim_idx]);

        self.lru[set_index].copy_within(0..assoc - 1, 1);
        self.lru[set_index][0] = victim_way;

        let victim = &mut self.lines[victim_idx];
        victim.valid = true;
        victim.tag = tag;
        victim.bitvector = 0;
        victim.install_source = install_source;
        victim.install_line_number = install_line_number;
        set_bit_range(&mut victim.bitvector, slice.word_begin, slice.word_end);

        true
    }

    /// Same behavior as [`Self::access_slice`], but with the MRU-way special
    /// case removed: every way, including the one at position 0, is found
    /// through the general linear scan. Exists only so a test can check that
    /// the fast path is a pure optimization, never a semantic shortcut.
    #[cfg(test)]
    fn access_slice_no_mru_fastpath(
        &mut self,
        slice: LineSlice,
        install_source: Option<&'a CounterBlock>,
        install_line_number: u32,
    ) -> bool {
        let (set_index, tag) = self.geometry.set_and_tag(slice.block);
        let assoc = self.geometry.assoc;

        for pos in 0..assoc {
            let way = self.lru[set_index][pos];
            let idx = self.line_index(set_index, way);
            if self.lines[idx].valid && self.lines[idx].tag == tag {
                self.lru[set_index].copy_within(0..pos, 1);
                self.lru[set_index][0] = way;
                set_bit_range(&mut self.lines[idx].bitvector, slice.word_begin, slice.word_end);
                return false;
            }
        }

        let victim_way = self.lru[set_index][assoc - 1];
        let victim_idx = self.line_index(set_index, victim_way);

        self.charge_eviction(&self.lines[victim_idx]);

        self.lru[set_index].copy_within(0..assoc - 1, 1);
        self.lru[set_index][0] = victim_way;

        let victim = &mut self.lines[victim_idx];
        victim.valid = true;
        victim.tag = tag;
        victim.bitvector = 0;
        victim.install_source = install_source;
        victim.install_line_number = install_line_number;
        set_bit_range(&mut victim.bitvector, slice.word_begin, slice.word_end);

        true
    }

    /// Accesses `reference`, handling a two-line straddle by probing both
    /// halves unconditionally and reporting a miss if either half missed.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFault::StraddleOverflow`] if `reference` spans
    /// more than two lines.
    pub fn ref_is_miss(
        &mut self,
        reference: &Reference,
        install_source: Option<&'a CounterBlock>,
        install_line_number: u32,
    ) -> Result<bool, RuntimeFault> {
        match decompose(&self.geometry, reference)? {
            Decomposed::Single(slice) => Ok(self.access_slice(slice, install_source, install_line_number)),
            Decomposed::Straddle(first, second) => {
                let first_miss = self.access_slice(first, install_source, install_line_number);
                let second_miss = self.access_slice(second, install_source, install_line_number);
                Ok(first_miss || second_miss)
            }
        }
    }

    /// Accesses a single block directly by its tag, bypassing decomposition.
    /// Used by the instruction fast path, where the caller already knows
    /// the reference is single-block.
    pub fn access_block(&mut self, block: u64) -> bool {
        let slice = LineSlice {
            block,
            word_begin: 0,
            word_end: self.geometry.num_words_per_line as u32 - 1,
        };
        self.access_slice(slice, None, 0)
    }

    /// Iterates every live line across all sets, invoking `f(words_used,
    /// source, line_number)` for lines that hold a tag and a source
    /// location. Used at end-of-run to flush partial-lifetime utilization
    /// data for lines that were never evicted.
    pub fn drain_live_lines(&self, mut f: impl FnMut(u32, &'a CounterBlock, u32)) {
        for line in &self.lines {
            if !line.valid {
                continue;
            }
            let Some(source) = line.install_source else {
                continue;
            };
            let words_used = popcount(line.bitvector);
            if words_used == 0 {
                #[cfg(feature = "trace")]
                log::error!(
                    "classification ambiguity: still-resident line had a source location but an empty usage bitvector (line_num={})",
                    line.install_line_number
                );
                continue;
            }
            f(words_used, source, line.install_line_number);
        }
    }
}
