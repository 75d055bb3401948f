//! A memory-reference cache simulator.
//!
//! Given cache geometries for a split L1 (instruction + data) and a
//! unified last-level cache, this crate classifies every data reference
//! as a hit or a miss, and classifies every miss as **compulsory**
//! (first-ever touch), **conflict** (would have hit in a fully-associative
//! cache of equal capacity) or **capacity** (would have missed there too).
//! It also reports, per source location, how many distinct machine words
//! of an evicted cache line were actually touched during its residency.
//!
//! The design follows a classic three-oracle approach: the modeled
//! set-associative cache runs alongside an infinite (never-evicting)
//! cache and a fully-associative cache of the same capacity, and a miss
//! is classified by where it would also have missed.
//!
//! Building, owning, and keying a source-line attribution table is the
//! host's job; this crate defines the [`counters::CounterBlock`] shape
//! such a table holds one of per location, and the [`coordinator::Simulator`]
//! that borrows one for the duration of each data reference.
//!
//! ```
//! use memrefsim::{CounterBlock, LevelConfig, RefKind, Simulator};
//!
//! let mut sim = Simulator::init(
//!     LevelConfig { size: 32 * 1024, assoc: 8, line_size: 64 },
//!     LevelConfig { size: 32 * 1024, assoc: 8, line_size: 64 },
//!     LevelConfig { size: 2 * 1024 * 1024, assoc: 16, line_size: 64 },
//! )
//! .expect("valid geometry");
//!
//! let counters = CounterBlock::new();
//! let missed = sim.data_ref(0x1000, 8, RefKind::DataRead, 42, &counters).unwrap();
//! assert!(missed); // first touch of this line is always a miss
//! sim.finish();
//! ```

pub mod bits;
pub mod counters;
pub mod error;
pub mod fully_assoc;
pub mod geometry;
pub mod infinite;
pub mod reference;
pub mod set_assoc;

mod coordinator;

pub use coordinator::{InstrOutcome, LevelConfig, Simulator};
pub use counters::{CounterBlock, MissClass};
pub use error::{ConfigError, Level, RuntimeFault};
pub use reference::{Reference, RefKind};
