//! Foreign arrays and adopted views for the Tether buffer adoption protocol.
//!
//! This crate is the numpy-like side of the protocol:
//!
//! - [`ForeignArray`] owns an n-dimensional array with its own allocation,
//!   shape, strides and type string, and exports descriptors of it.
//! - [`adopt`], [`adopt_any`] and [`adopt_records`] wrap any
//!   [`BufferDescriptor`](tether_core::BufferDescriptor) without copying,
//!   producing an [`ArrayView`], an [`AnyView`] or a [`RecordView`].
//!
//! Views check the descriptor's provenance on every access, so a view that
//! outlives a resize or the owner reports `StaleBuffer` rather than reading
//! memory that has moved.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod adopt;
pub mod any;
pub mod array;
pub mod record;
mod scalar;
pub mod view;

pub use adopt::{adopt, adopt_any, adopt_interface, adopt_records, adopt_source};
pub use any::AnyView;
pub use array::{ForeignArray, Shape};
pub use record::RecordView;
pub use view::ArrayView;
