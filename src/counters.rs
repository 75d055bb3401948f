//! Per-source-location counters.
//!
//! A [`CounterBlock`] is owned by the host's source-line attribution
//! table (out of scope for this crate) and only ever borrowed by the
//! simulator for the duration of a call. Because the simulator never
//! allocates or frees one, its fields use [`Cell`] so they can be updated
//! through a shared reference — the coordinator holds `&CounterBlock`,
//! never `&mut CounterBlock`, matching that externally-owned shape.

use std::cell::Cell;

/// Why a miss occurred, per the classification rule in the hierarchy
/// coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissClass {
    /// First-ever touch of this line; would miss in an infinite cache too.
    Compulsory,
    /// Would have hit in a fully-associative cache of equal capacity.
    Conflict,
    /// Would also have missed in a fully-associative cache of equal capacity.
    Capacity,
}

/// Number of word-usage histogram bins (1 to 8 distinct words touched).
pub const NUM_USAGE_BINS: usize = 8;

/// Per-location hit/miss/classification counters and word-usage
/// histograms, for a single source location's data references.
#[derive(Debug, Default)]
pub struct CounterBlock {
    /// Total data references attributed to this location.
    pub accesses: Cell<u64>,
    /// D1 (first-level data cache) misses.
    pub d1_misses: Cell<u64>,
    /// D1 misses classified as compulsory.
    pub d1_compulsory: Cell<u64>,
    /// D1 misses classified as conflict.
    pub d1_conflict: Cell<u64>,
    /// D1 misses classified as capacity.
    pub d1_capacity: Cell<u64>,
    /// LL (last-level cache) misses.
    pub ll_misses: Cell<u64>,
    /// LL misses classified as compulsory.
    pub ll_compulsory: Cell<u64>,
    /// LL misses classified as conflict.
    pub ll_conflict: Cell<u64>,
    /// LL misses classified as capacity.
    pub ll_capacity: Cell<u64>,
    /// Word-usage histogram for D1 evictions; bin `i` counts evictions of
    /// lines that had exactly `i + 1` distinct words touched.
    pub usage_histogram_d1: [Cell<u64>; NUM_USAGE_BINS],
    /// Word-usage histogram for LL evictions, same bin convention.
    pub usage_histogram_ll: [Cell<u64>; NUM_USAGE_BINS],
}

impl CounterBlock {
    /// Creates a fresh, all-zero counter block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one data access.
    pub fn record_access(&self) {
        self.accesses.set(self.accesses.get() + 1);
    }

    /// Records a classified D1 miss.
    pub fn record_d1_miss(&self, class: MissClass) {
        self.d1_misses.set(self.d1_misses.get() + 1);
        let cell = match class {
            MissClass::Compulsory => &self.d1_compulsory,
            MissClass::Conflict => &self.d1_conflict,
            MissClass::Capacity => &self.d1_capacity,
        };
        cell.set(cell.get() + 1);
    }

    /// Records a classified LL miss.
    pub fn record_ll_miss(&self, class: MissClass) {
        self.ll_misses.set(self.ll_misses.get() + 1);
        let cell = match class {
            MissClass::Compulsory => &self.ll_compulsory,
            MissClass::Conflict => &self.ll_conflict,
            MissClass::Capacity => &self.ll_capacity,
        };
        cell.set(cell.get() + 1);
    }

    /// Bumps the D1 usage histogram bin for `words_used` distinct words
    /// touched (1 to 8). Out-of-range values are an internal contradiction
    /// (see the classification-ambiguity case in the crate's error handling
    /// design) and are silently ignored here; the level model logs them
    /// before calling this.
    pub fn record_d1_eviction_usage(&self, words_used: u32) {
        if let Some(cell) = usage_bin(&self.usage_histogram_d1, words_used) {
            cell.set(cell.get() + 1);
        }
    }

    /// Bumps the LL usage histogram bin, same convention as
    /// [`Self::record_d1_eviction_usage`].
    pub fn record_ll_eviction_usage(&self, words_used: u32) {
        if let Some(cell) = usage_bin(&self.usage_histogram_ll, words_used) {
            cell.set(cell.get() + 1);
        }
    }
}

fn usage_bin(histogram: &[Cell<u64>; NUM_USAGE_BINS], words_used: u32) -> Option<&Cell<u64>> {
    if words_used == 0 {
        return None;
    }
    // Clamp rather than drop: a line wider than 8 machine words still owes
    // exactly one eviction event, charged to the top bin.
    let clamped = words_used.min(NUM_USAGE_BINS as u32);
    histogram.get((clamped - 1) as usize)
}
