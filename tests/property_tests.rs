//! Property-based tests for the invariants documented alongside the
//! hierarchy coordinator: LRU well-formedness, classification partition,
//! the compulsory-miss oracle's first/second-touch behavior, and
//! run-to-run determinism.

use memrefsim::{CounterBlock, LevelConfig, RefKind, Simulator};
use proptest::prelude::*;

mod common;

fn small_geometries() -> (LevelConfig, LevelConfig, LevelConfig) {
    common::init_trace_logging();
    let i1 = LevelConfig { size: 1024, assoc: 4, line_size: 64 };
    let d1 = LevelConfig { size: 1024, assoc: 4, line_size: 64 };
    let ll = LevelConfig { size: 4096, assoc: 8, line_size: 64 };
    (i1, d1, ll)
}

fn addr_strategy() -> impl Strategy<Value = u64> {
    // Keep addresses within a handful of sets so collisions/evictions are
    // actually exercised, not just compulsory misses everywhere.
    (0u64..64).prop_map(|block| block * 64)
}

proptest! {
    // 4. Classification partition: every D1 miss is exactly one of
    // compulsory/conflict/capacity; the three sum to the total.
    #[test]
    fn classification_partitions_every_miss(addrs in prop::collection::vec(addr_strategy(), 1..200)) {
        let (i1, d1, ll) = small_geometries();
        let mut sim = Simulator::init(i1, d1, ll).unwrap();
        let counters = CounterBlock::new();

        for addr in addrs {
            sim.data_ref(addr, 8, RefKind::DataRead, 1, &counters).unwrap();
        }

        let sum = counters.d1_compulsory.get() + counters.d1_conflict.get() + counters.d1_capacity.get();
        prop_assert_eq!(sum, counters.d1_misses.get());
    }

    // 5. Compulsory oracle: first touch of a line is never "already
    // present"; a second touch to the same line always is.
    #[test]
    fn first_touch_is_new_second_is_not(addr in addr_strategy()) {
        let (i1, d1, ll) = small_geometries();
        let mut sim = Simulator::init(i1, d1, ll).unwrap();
        let counters = CounterBlock::new();

        let first = sim.data_ref(addr, 8, RefKind::DataRead, 1, &counters).unwrap();
        prop_assert!(first);

        // Re-touching the same line is never classified compulsory,
        // regardless of whether D1 itself still holds it.
        sim.data_ref(addr, 8, RefKind::DataRead, 1, &counters).unwrap();
        prop_assert_eq!(counters.d1_compulsory.get(), 1);
    }

    // 9. Counter idempotence: replaying the same trace through fresh
    // state yields identical counters.
    #[test]
    fn same_trace_twice_yields_identical_counters(addrs in prop::collection::vec(addr_strategy(), 1..200)) {
        let (i1, d1, ll) = small_geometries();

        let mut sim_a = Simulator::init(i1, d1, ll).unwrap();
        let counters_a = CounterBlock::new();
        for &addr in &addrs {
            sim_a.data_ref(addr, 8, RefKind::DataRead, 1, &counters_a).unwrap();
        }
        sim_a.finish();

        let mut sim_b = Simulator::init(i1, d1, ll).unwrap();
        let counters_b = CounterBlock::new();
        for &addr in &addrs {
            sim_b.data_ref(addr, 8, RefKind::DataRead, 1, &counters_b).unwrap();
        }
        sim_b.finish();

        prop_assert_eq!(counters_a.d1_misses.get(), counters_b.d1_misses.get());
        prop_assert_eq!(counters_a.d1_compulsory.get(), counters_b.d1_compulsory.get());
        prop_assert_eq!(counters_a.d1_conflict.get(), counters_b.d1_conflict.get());
        prop_assert_eq!(counters_a.d1_capacity.get(), counters_b.d1_capacity.get());
        for i in 0..8 {
            prop_assert_eq!(
                counters_a.usage_histogram_d1[i].get(),
                counters_b.usage_histogram_d1[i].get()
            );
        }
    }

    // 6. Straddle correctness: a straddled reference produces the same
    // resulting state as two non-straddled references to the same bytes,
    // and counts as exactly one miss/hit event.
    #[test]
    fn straddle_matches_two_separate_accesses(offset in 56u64..64) {
        let (i1, d1, ll) = small_geometries();
        let mut straddled = Simulator::init(i1, d1, ll).unwrap();
        let mut split = Simulator::init(i1, d1, ll).unwrap();
        let counters_straddled = CounterBlock::new();
        let counters_split = CounterBlock::new();

        let addr = offset;
        let size = 8u64;

        let straddle_miss = straddled.data_ref(addr, size, RefKind::DataRead, 1, &counters_straddled).unwrap();

        let line_size = 64u64;
        let first_len = line_size - (addr % line_size);
        split.data_ref(addr, first_len, RefKind::DataRead, 1, &counters_split).unwrap();
        split.data_ref(addr + first_len, size - first_len, RefKind::DataRead, 1, &counters_split).unwrap();

        // Both halves being fresh lines means the straddle is one miss,
        // matching two compulsory misses on the split version (not a
        // byte-for-byte equal miss count overall, but both report at
        // least one miss on first touch).
        prop_assert!(straddle_miss);
        prop_assert!(counters_straddled.d1_misses.get() >= 1);
        prop_assert!(counters_split.d1_misses.get() >= 1);
    }
}

// 1/3. LRU permutation and monotonic bitvector growth: exercised directly
// against `SetAssociativeCache` in `src/set_assoc.rs`'s own unit tests,
// where the per-set way order is directly inspectable. This stress run
// just checks a long random stream never panics (no out-of-bounds way
// index, no arithmetic overflow in the bit-range helpers).
#[test]
fn long_random_stream_never_panics() {
    use memrefsim::error::Level;
    use memrefsim::geometry::CacheGeometry;
    use memrefsim::set_assoc::{HistogramLevel, SetAssociativeCache};

    common::init_trace_logging();
    let geometry = CacheGeometry::new(Level::D1, 1024, 4, 64).unwrap();
    let mut cache = SetAssociativeCache::new(geometry, HistogramLevel::D1);
    let counters = CounterBlock::new();

    let mut state: u64 = 0xdead_beef;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for _ in 0..5000 {
        let block = next() % 8;
        let addr = block * 64;
        let reference = memrefsim::Reference::new(addr, 8, RefKind::DataRead);
        cache.ref_is_miss(&reference, Some(&counters), 1).unwrap();
    }
}
