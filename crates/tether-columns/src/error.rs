//! Error types for column tables and column stores.

use std::error::Error;
use std::fmt;

use tether_core::{AdoptError, ElementType};

/// Errors from building, filtering, or materializing a column table.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnError {
    /// A step or request named a column the table does not have.
    UnknownColumn {
        /// The requested name.
        name: String,
    },
    /// A column name was inserted, defined, or requested twice.
    DuplicateColumn {
        /// The repeated name.
        name: String,
    },
    /// A column's length differs from the table's row count.
    LengthMismatch {
        /// The offending column.
        name: String,
        /// The table's row count.
        expected: usize,
        /// The column's length.
        found: usize,
    },
    /// A column was read as a different element type than it holds.
    TypeMismatch {
        /// The column.
        name: String,
        /// The requested element type.
        expected: ElementType,
        /// The column's element type.
        found: ElementType,
    },
    /// Exporting or adopting column memory failed.
    Adopt(AdoptError),
}

impl fmt::Display for ColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownColumn { name } => write!(f, "unknown column '{name}'"),
            Self::DuplicateColumn { name } => write!(f, "duplicate column '{name}'"),
            Self::LengthMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "column '{name}' has {found} rows, table has {expected}"
            ),
            Self::TypeMismatch {
                name,
                expected,
                found,
            } => write!(f, "column '{name}' holds {found}, not {expected}"),
            Self::Adopt(e) => write!(f, "buffer adoption failed: {e}"),
        }
    }
}

impl Error for ColumnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Adopt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AdoptError> for ColumnError {
    fn from(e: AdoptError) -> Self {
        Self::Adopt(e)
    }
}

/// Errors from writing to or reading from a [`ColumnStore`](crate::ColumnStore).
#[derive(Clone, Debug, PartialEq)]
pub enum StoreError {
    /// No tree with this name exists.
    UnknownTree {
        /// The requested tree.
        tree: String,
    },
    /// The tree exists and the options do not allow overwriting it.
    TreeExists {
        /// The existing tree.
        tree: String,
    },
    /// The snapshot options are not usable.
    InvalidOptions {
        /// What is wrong with them.
        reason: String,
    },
    /// A stored page could not be decoded.
    Corrupt {
        /// The tree being read.
        tree: String,
        /// What went wrong.
        detail: String,
    },
    /// Materializing or rebuilding the columns failed.
    Column(ColumnError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTree { tree } => write!(f, "unknown tree '{tree}'"),
            Self::TreeExists { tree } => write!(
                f,
                "tree '{tree}' already exists (set overwrite_if_exists to replace it)"
            ),
            Self::InvalidOptions { reason } => write!(f, "invalid snapshot options: {reason}"),
            Self::Corrupt { tree, detail } => write!(f, "corrupt page in tree '{tree}': {detail}"),
            Self::Column(e) => write!(f, "column error: {e}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Column(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ColumnError> for StoreError {
    fn from(e: ColumnError) -> Self {
        Self::Column(e)
    }
}

impl From<AdoptError> for StoreError {
    fn from(e: AdoptError) -> Self {
        Self::Column(ColumnError::Adopt(e))
    }
}
