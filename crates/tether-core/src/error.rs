//! Error types for buffer export and adoption.
//!
//! Every failure is local and synchronous: it is reported by the call that
//! attempted the adoption or the access. Adoption is atomic, so no view
//! exists after a failed adoption.

use std::error::Error;
use std::fmt;

/// Errors from exporting, adopting, or accessing a shared buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdoptError {
    /// The descriptor's type code has no mapping on the adopting side.
    UnsupportedElementType {
        /// The offending type string (array-interface notation).
        typestr: String,
    },
    /// The adopter requires a rank, contiguity, or span the descriptor
    /// does not satisfy.
    ShapeMismatch {
        /// Description of the mismatch.
        reason: String,
    },
    /// The originating allocation was moved or released after the
    /// descriptor was captured.
    StaleBuffer {
        /// Generation recorded when the descriptor was captured.
        adopted: u64,
        /// Generation of the allocation now.
        current: u64,
        /// Whether the owning container has been destroyed.
        released: bool,
    },
    /// A write was attempted through a read-only descriptor.
    ReadOnlyViolation,
    /// An element index past the end of the view.
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of elements in the view.
        len: usize,
    },
}

impl AdoptError {
    /// Shorthand for [`AdoptError::ShapeMismatch`].
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AdoptError::UnsupportedElementType`].
    pub fn unsupported(typestr: impl Into<String>) -> Self {
        Self::UnsupportedElementType {
            typestr: typestr.into(),
        }
    }

    /// Whether this error reports a stale or released allocation.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleBuffer { .. })
    }
}

impl fmt::Display for AdoptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedElementType { typestr } => {
                write!(f, "unsupported element type '{typestr}'")
            }
            Self::ShapeMismatch { reason } => write!(f, "shape mismatch: {reason}"),
            Self::StaleBuffer {
                adopted,
                current,
                released,
            } => {
                if *released {
                    write!(
                        f,
                        "stale buffer: allocation released (adopted at generation {adopted})"
                    )
                } else {
                    write!(
                        f,
                        "stale buffer: adopted at generation {adopted}, allocation now at {current}"
                    )
                }
            }
            Self::ReadOnlyViolation => write!(f, "write through a read-only buffer"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
        }
    }
}

impl Error for AdoptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_generations() {
        let e = AdoptError::StaleBuffer {
            adopted: 3,
            current: 5,
            released: false,
        };
        let s = e.to_string();
        assert!(s.contains('3') && s.contains('5'), "{s}");
        assert!(e.is_stale());
    }

    #[test]
    fn released_display_differs() {
        let e = AdoptError::StaleBuffer {
            adopted: 1,
            current: 1,
            released: true,
        };
        assert!(e.to_string().contains("released"));
    }

    #[test]
    fn helpers_build_expected_variants() {
        assert_eq!(
            AdoptError::shape("rank 2"),
            AdoptError::ShapeMismatch {
                reason: "rank 2".into()
            }
        );
        assert_eq!(
            AdoptError::unsupported("|O"),
            AdoptError::UnsupportedElementType {
                typestr: "|O".into()
            }
        );
        assert!(!AdoptError::ReadOnlyViolation.is_stale());
    }
}
