//! Shared helpers for integration tests

#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

use entwash::{ArrayValue, Value};

/// Install a test-friendly subscriber once; `RUST_LOG` controls the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `[1, 2, ...]` as a list array.
pub fn longs(values: &[i64]) -> ArrayValue {
    values.iter().map(|n| Value::Long(*n)).collect()
}

/// The integer values of an array, in order.
pub fn as_longs(array: &ArrayValue) -> Vec<i64> {
    array.values().iter().map(Value::to_long).collect()
}
