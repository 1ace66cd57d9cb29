//! Benchmark profiles for Tether.
//!
//! Provides deterministic inputs shared by the criterion benches:
//!
//! - [`signal`]: `len` pseudo-random `f64` samples from a seed
//! - [`native_signal`] / [`foreign_signal`]: the same samples in a
//!   [`NativeVec`] or a [`ForeignArray`]
//! - [`event_table`]: a three-column table (`x: f64`, `y: i64`, `flag: u8`)
//!   for filter, define, and snapshot benches
//! - [`SMALL`], [`MEDIUM`], [`LARGE`]: the element counts benches sweep

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tether_columns::{ColumnData, ColumnTable};
use tether_foreign::ForeignArray;
use tether_native::NativeVec;

/// 1K elements: fits in L1 for every element type.
pub const SMALL: usize = 1_000;

/// 100K elements.
pub const MEDIUM: usize = 100_000;

/// 1M elements.
pub const LARGE: usize = 1_000_000;

fn lcg(state: u64) -> u64 {
    state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407)
}

/// Generate `len` samples in `[-1, 1)` from `seed`.
///
/// Same seed, same samples.
pub fn signal(len: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = lcg(state);
            // Top 53 bits as a fraction in [0, 1).
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            unit * 2.0 - 1.0
        })
        .collect()
}

/// [`signal`] in a native container.
pub fn native_signal(len: usize, seed: u64) -> NativeVec<f64> {
    NativeVec::from_vec(signal(len, seed))
}

/// [`signal`] in a one-dimensional foreign array.
pub fn foreign_signal(len: usize, seed: u64) -> ForeignArray {
    ForeignArray::from_vec(signal(len, seed))
}

/// Build a table of `rows` events.
///
/// - `x`: [`signal`] samples
/// - `y`: row index
/// - `flag`: 1 for every third row, else 0
pub fn event_table(rows: usize, seed: u64) -> ColumnTable {
    let y: Vec<i64> = (0..rows as i64).collect();
    let flag: Vec<u8> = (0..rows).map(|i| u8::from(i % 3 == 0)).collect();
    let mut table = ColumnTable::new();
    for (name, data) in [
        ("x", ColumnData::from(signal(rows, seed))),
        ("y", ColumnData::from(y)),
        ("flag", ColumnData::from(flag)),
    ] {
        // Names are distinct and lengths equal, so insertion cannot fail.
        let _ = table.insert(name, data);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_is_deterministic_and_bounded() {
        let a = signal(1000, 42);
        assert_eq!(a, signal(1000, 42));
        assert_ne!(a, signal(1000, 43));
        assert!(a.iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn containers_hold_the_signal() {
        let expected = signal(16, 7);
        assert_eq!(native_signal(16, 7).to_vec(), expected);
        assert_eq!(foreign_signal(16, 7).to_vec::<f64>().unwrap(), expected);
    }

    #[test]
    fn event_table_shape() {
        let t = event_table(10, 1);
        assert_eq!(t.len(), 10);
        assert_eq!(t.names().collect::<Vec<_>>(), ["x", "y", "flag"]);
        let flagged = t
            .filter("flagged", |row| Ok(row.get_i64("flag")? == 1))
            .count()
            .unwrap();
        assert_eq!(flagged, 4);
    }
}
