//! Shared fixtures.
//!
//! - [`xy_table`]: the two-column `x`/`y` table used across the round-trip
//!   tests.
//! - [`boundary_values`]: per element type, values that exercise every
//!   edge of the bit pattern (extremes, zero, signed zero, NaN payloads,
//!   subnormals).

use tether_columns::{ColumnData, ColumnTable};
use tether_core::Element;

/// Values of the `x` column in [`xy_table`].
pub const XY_X: [f64; 3] = [1.0, 2.0, 3.0];

/// Values of the `y` column in [`xy_table`].
pub const XY_Y: [i64; 3] = [4, 5, 6];

/// A table with `x: float64 = [1, 2, 3]` and `y: int64 = [4, 5, 6]`, in
/// that order.
pub fn xy_table() -> ColumnTable {
    let mut table = ColumnTable::new();
    // Fresh table, distinct names, equal lengths: inserts cannot fail.
    let _ = table.insert("x", ColumnData::from(XY_X.to_vec()));
    let _ = table.insert("y", ColumnData::from(XY_Y.to_vec()));
    table
}

/// An element type with a known set of edge-case values.
pub trait Boundary: Element {
    /// Edge-case values for this type.
    fn boundary() -> Vec<Self>;

    /// The raw bit pattern, for exact comparisons (NaN != NaN).
    fn bits(self) -> u64;
}

macro_rules! int_boundary {
    ($($t:ty => $u:ty),* $(,)?) => {
        $(
            impl Boundary for $t {
                fn boundary() -> Vec<Self> {
                    vec![<$t>::MIN, <$t>::MIN + 1, 0, 1, <$t>::MAX / 2, <$t>::MAX - 1, <$t>::MAX]
                }

                fn bits(self) -> u64 {
                    self as $u as u64
                }
            }
        )*
    };
}

int_boundary!(
    i8 => u8, i16 => u16, i32 => u32, i64 => u64,
    u8 => u8, u16 => u16, u32 => u32, u64 => u64,
);

impl Boundary for f32 {
    fn boundary() -> Vec<Self> {
        vec![
            0.0,
            -0.0,
            1.5,
            f32::MIN,
            f32::MAX,
            f32::MIN_POSITIVE,
            f32::from_bits(0x0000_0001),
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
            f32::from_bits(0x7fc0_1234),
            f32::from_bits(0xffa0_0001),
        ]
    }

    fn bits(self) -> u64 {
        u64::from(self.to_bits())
    }
}

impl Boundary for f64 {
    fn boundary() -> Vec<Self> {
        vec![
            0.0,
            -0.0,
            1.5,
            f64::MIN,
            f64::MAX,
            f64::MIN_POSITIVE,
            f64::from_bits(0x0000_0000_0000_0001),
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NAN,
            f64::from_bits(0x7ff8_0000_0000_1234),
            f64::from_bits(0xfff4_0000_dead_beef),
        ]
    }

    fn bits(self) -> u64 {
        self.to_bits()
    }
}

/// Edge-case values for `T`.
pub fn boundary_values<T: Boundary>() -> Vec<T> {
    T::boundary()
}
