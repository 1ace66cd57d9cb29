//! C-compatible status codes.
//!
//! [`TetherStatus`] is a `repr(i32)` enum returned (as `i32`) by every FFI
//! function. `Ok` is 0 and every error is negative. Values are ABI-stable.

use tether_core::AdoptError;

/// C-compatible status code returned by all FFI functions.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TetherStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// An argument is null, out of range, or otherwise invalid.
    InvalidArgument = -2,
    /// The dtype code or type string has no mapping.
    UnsupportedElementType = -3,
    /// Rank, contiguity, alignment, or span does not fit the adopter.
    ShapeMismatch = -4,
    /// The exporting vector was resized or destroyed after export.
    StaleBuffer = -5,
    /// Write through a read-only descriptor.
    ReadOnlyViolation = -6,
    /// Element index past the end.
    IndexOutOfBounds = -7,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -8,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&AdoptError> for TetherStatus {
    fn from(e: &AdoptError) -> Self {
        match e {
            AdoptError::UnsupportedElementType { .. } => TetherStatus::UnsupportedElementType,
            AdoptError::ShapeMismatch { .. } => TetherStatus::ShapeMismatch,
            AdoptError::StaleBuffer { .. } => TetherStatus::StaleBuffer,
            AdoptError::ReadOnlyViolation => TetherStatus::ReadOnlyViolation,
            AdoptError::IndexOutOfBounds { .. } => TetherStatus::IndexOutOfBounds,
        }
    }
}

impl TetherStatus {
    /// Map an `i32` returned over the C ABI back to a status.
    ///
    /// Unknown codes map to [`TetherStatus::InternalError`].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::InvalidHandle,
            -2 => Self::InvalidArgument,
            -3 => Self::UnsupportedElementType,
            -4 => Self::ShapeMismatch,
            -5 => Self::StaleBuffer,
            -6 => Self::ReadOnlyViolation,
            -7 => Self::IndexOutOfBounds,
            -128 => Self::Panicked,
            _ => Self::InternalError,
        }
    }

    /// Short description, used in error messages of higher-level bindings.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::InvalidHandle => "invalid or destroyed handle",
            Self::InvalidArgument => "invalid argument",
            Self::UnsupportedElementType => "unsupported element type",
            Self::ShapeMismatch => "shape mismatch",
            Self::StaleBuffer => "stale buffer",
            Self::ReadOnlyViolation => "write through a read-only buffer",
            Self::IndexOutOfBounds => "index out of bounds",
            Self::InternalError => "internal error",
            Self::Panicked => "panic at the FFI boundary",
        }
    }
}
