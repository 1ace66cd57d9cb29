//! Column tables over native and adopted buffers.
//!
//! A [`ColumnTable`] holds named, equal-length columns. Each column either
//! owns a [`NativeVec`](tether_native::NativeVec) or adopts foreign memory
//! without copying. Declarative [`Pipeline`] steps (filters and computed
//! columns) run at materialization time:
//!
//! - [`Pipeline::materialize`] copies the selected rows into owned,
//!   contiguous [`Materialized`] columns, in requested order. Those columns
//!   can then be viewed as foreign arrays without a further copy.
//! - [`Pipeline::snapshot`] writes materialized columns to a
//!   [`ColumnStore`] and reads them back.
//!
//! [`MemoryStore`] is the in-memory store, grouping rows into clusters of
//! little-endian pages (see [`codec`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

pub mod codec;
pub mod column;
pub mod error;
pub mod materialize;
pub mod step;
pub mod store;
pub mod table;

pub use column::{Column, ColumnBuf, ColumnData, ColumnElement};
pub use error::{ColumnError, StoreError};
pub use materialize::Materialized;
pub use step::{Pipeline, Row, Step};
pub use store::{ColumnStore, MemoryStore, SnapshotMode, SnapshotOptions, WriteReport};
pub use table::ColumnTable;
