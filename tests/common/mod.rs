//! Shared test-harness helpers.

/// Enables the crate's `trace`-feature log output under `RUST_LOG`, so
/// `cargo test --features trace -- --nocapture` surfaces it. A no-op when
/// the `trace` feature isn't enabled, since there's nothing to subscribe to
/// then.
#[cfg(feature = "trace")]
pub fn init_trace_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(not(feature = "trace"))]
pub fn init_trace_logging() {}
