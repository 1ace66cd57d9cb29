//! Container configuration parameters.

use std::error::Error;
use std::fmt;

use tether_core::ElementType;

/// How a [`NativeVec`](crate::NativeVec) grows when it runs out of capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Amortized doubling (the `Vec` default). Fewer reallocations.
    #[default]
    Amortized,
    /// Grow to exactly the required length. Every growth reallocates.
    Exact,
}

/// Configuration for a native container.
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeConfig {
    /// Elements to reserve up front. Default: 0.
    pub initial_capacity: usize,
    /// Growth strategy. Default: [`GrowthPolicy::Amortized`].
    pub growth: GrowthPolicy,
}

impl NativeConfig {
    /// Default up-front reservation.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 0;

    /// Config with the given initial capacity and default growth.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Check that the initial reservation is addressable for `element`.
    pub fn validate(&self, element: ElementType) -> Result<(), NativeConfigError> {
        let bytes = self
            .initial_capacity
            .checked_mul(element.itemsize())
            .filter(|&b| b <= isize::MAX as usize);
        if bytes.is_none() {
            return Err(NativeConfigError::CapacityOverflow {
                requested: self.initial_capacity,
                element,
            });
        }
        Ok(())
    }
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            growth: GrowthPolicy::default(),
        }
    }
}

/// Errors detected by [`NativeConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeConfigError {
    /// `initial_capacity * itemsize` exceeds `isize::MAX` bytes.
    CapacityOverflow {
        /// The requested element capacity.
        requested: usize,
        /// The element kind being stored.
        element: ElementType,
    },
}

impl fmt::Display for NativeConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow { requested, element } => write!(
                f,
                "initial capacity of {requested} {element} elements exceeds the address space"
            ),
        }
    }
}

impl Error for NativeConfigError {}
