//! The hierarchy coordinator: wires the three set-associative levels and
//! the two miss-classification oracles together behind the crate's public
//! per-reference entry points.

use crate::counters::{CounterBlock, MissClass};
use crate::error::{check_i1_ll_line_size, ConfigError, Level, RuntimeFault};
use crate::fully_assoc::FullyAssociativeCache;
use crate::geometry::CacheGeometry;
use crate::infinite::InfiniteCache;
use crate::reference::{is_single_block, RefKind, Reference};
use crate::set_assoc::{HistogramLevel, SetAssociativeCache};

/// Geometry for one cache level, as supplied to [`Simulator::init`].
#[derive(Debug, Clone, Copy)]
pub struct LevelConfig {
    /// Total size in bytes.
    pub size: usize,
    /// Associativity (ways per set).
    pub assoc: usize,
    /// Line size in bytes.
    pub line_size: usize,
}

/// The outcome of an instruction-fetch reference: which levels missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrOutcome {
    /// Whether I1 missed.
    pub i1_miss: bool,
    /// Whether LL missed. Always `false` if I1 hit, since LL is only
    /// consulted on an I1 miss.
    pub ll_miss: bool,
}

/// The full three-level memory-reference simulator.
///
/// Borrows nothing at construction; each [`Self::data_ref`] call borrows
/// a [`CounterBlock`] for its duration only, so the lifetime `'a` ties the
/// simulator to however long the host's source-line attribution table
/// (which owns the counter blocks) is guaranteed to live.
pub struct Simulator<'a> {
    i1: SetAssociativeCache<'a>,
    d1: SetAssociativeCache<'a>,
    ll: SetAssociativeCache<'a>,
    infinite: InfiniteCache,
    fa_d1: FullyAssociativeCache,
    fa_ll: FullyAssociativeCache,
}

impl<'a> std::fmt::Debug for Simulator<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("i1", &self.i1)
            .field("d1", &self.d1)
            .field("ll", &self.ll)
            .field("infinite", &self.infinite)
            .finish()
    }
}

impl<'a> Simulator<'a> {
    /// Validates `i1`, `d1` and `ll` geometries and builds a simulator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any geometry is malformed, or if I1 and
    /// LL have different line sizes (required for the instruction fast
    /// path and for reusing one infinite-oracle granularity across both
    /// D-path levels).
    pub fn init(i1: LevelConfig, d1: LevelConfig, ll: LevelConfig) -> Result<Self, ConfigError> {
        let i1_geom = CacheGeometry::new(Level::I1, i1.size, i1.assoc, i1.line_size)?;
        let d1_geom = CacheGeometry::new(Level::D1, d1.size, d1.assoc, d1.line_size)?;
        let ll_geom = CacheGeometry::new(Level::LL, ll.size, ll.assoc, ll.line_size)?;
        check_i1_ll_line_size(&i1_geom, &ll_geom)?;

        let fa_d1_capacity = d1.size / d1.line_size;
        let fa_ll_capacity = ll.size / ll.line_size;

        Ok(Simulator {
            i1: SetAssociativeCache::new(i1_geom, HistogramLevel::D1),
            d1: SetAssociativeCache::new(d1_geom, HistogramLevel::D1),
            ll: SetAssociativeCache::new(ll_geom, HistogramLevel::LL),
            infinite: InfiniteCache::new(d1.line_size),
            fa_d1: FullyAssociativeCache::new(fa_d1_capacity),
            fa_ll: FullyAssociativeCache::new(fa_ll_capacity),
        })
    }

    /// Pure predicate: would `addr..addr+size` be eligible for the
    /// instruction fast path (single block, same line size at I1 and LL)?
    ///
    /// Since I1 and LL line sizes are validated equal at [`Self::init`],
    /// this reduces to "does the reference span a single block".
    pub fn is_instr_nox_eligible(&self, addr: u64, size: u64) -> bool {
        is_single_block(self.i1.geometry(), addr, size)
    }

    /// Instruction fetch, fast path. Precondition: `addr..addr+size` is
    /// single-block (check with [`Self::is_instr_nox_eligible`] first).
    pub fn instr_ref_nox(&mut self, addr: u64, size: u64) -> InstrOutcome {
        debug_assert!(
            self.is_instr_nox_eligible(addr, size),
            "instr_ref_nox called on a reference that is not fast-path eligible"
        );
        #[cfg(feature = "trace")]
        log::trace!("instr_ref_nox addr={addr:#x} size={size}");

        let block = self.i1.geometry().block_of(addr);
        let i1_miss = self.i1.access_block(block);
        let ll_miss = if i1_miss { self.ll.access_block(block) } else { false };
        InstrOutcome { i1_miss, ll_miss }
    }

    /// Instruction fetch, general path: may straddle two lines.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFault`] if the reference spans more than two lines.
    pub fn instr_ref(&mut self, addr: u64, size: u64) -> Result<InstrOutcome, RuntimeFault> {
        #[cfg(feature = "trace")]
        log::trace!("instr_ref addr={addr:#x} size={size}");

        let reference = Reference::new(addr, size, RefKind::InstrFetch);
        let i1_miss = self.i1.ref_is_miss(&reference, None, 0)?;
        let ll_miss = if i1_miss {
            self.ll.ref_is_miss(&reference, None, 0)?
        } else {
            false
        };
        Ok(InstrOutcome { i1_miss, ll_miss })
    }

    /// Data reference: drives the D1/LL level models and both
    /// miss-classification oracles, attributing misses to `counter_block`.
    ///
    /// Returns `true` if D1 missed.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFault`] if the reference spans more than two
    /// lines.
    pub fn data_ref(
        &mut self,
        addr: u64,
        size: u64,
        kind: RefKind,
        source_line: u32,
        counter_block: &'a CounterBlock,
    ) -> Result<bool, RuntimeFault> {
        debug_assert!(matches!(kind, RefKind::DataRead | RefKind::DataWrite));
        #[cfg(feature = "trace")]
        log::trace!("data_ref addr={addr:#x} size={size} kind={kind:?}");

        counter_block.record_access();

        let reference = Reference::new(addr, size, kind);

        // Each of these oracles/level wrappers is itself straddle-aware
        // (§4.B-§4.D): the coordinator calls each exactly once per whole
        // reference, never re-splitting a reference its callees already
        // split.
        let line_size_bits = self.d1.geometry().line_size_bits;
        let miss_infi = !self.infinite.touch_and_was_present(addr, size);
        let miss_fa_d1 = self.fa_d1.is_miss(addr, size, line_size_bits);
        let miss_fa_ll = self.fa_ll.is_miss(addr, size, line_size_bits);

        let miss_d1 = self.d1.ref_is_miss(&reference, Some(counter_block), source_line)?;

        if miss_d1 {
            let class = classify(miss_infi, !miss_fa_d1);
            counter_block.record_d1_miss(class);

            let miss_ll = self.ll.ref_is_miss(&reference, Some(counter_block), source_line)?;
            if miss_ll {
                // Corrected classification rule: the conflict test is
                // symmetric with D1's (`!miss_fa_ll`), not `miss_fa_ll`
                // directly; see the crate's design notes.
                let ll_class = classify(miss_infi, !miss_fa_ll);
                counter_block.record_ll_miss(ll_class);
            }
        }

        Ok(miss_d1)
    }

    /// Flushes usage-histogram data for every line still resident at
    /// shutdown, as if each had just been evicted.
    pub fn finish(&self) {
        self.d1.drain_live_lines(|words_used, source, _line_num| {
            source.record_d1_eviction_usage(words_used);
        });
        self.ll.drain_live_lines(|words_used, source, _line_num| {
            source.record_ll_eviction_usage(words_used);
        });
    }
}

fn classify(miss_infi: bool, would_hit_in_fa: bool) -> MissClass {
    if miss_infi {
        MissClass::Compulsory
    } else if would_hit_in_fa {
        MissClass::Conflict
    } else {
        MissClass::Capacity
    }
}
