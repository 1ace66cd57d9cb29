//! The bridge between buffer descriptors and plain native functions.
//!
//! Any source that can export a descriptor (`NativeVec`, `ExternalSlice`,
//! `ForeignArray`, an adopted `ArrayView`) is accepted interchangeably by
//! degrading it to a pointer and a length. No data is converted and no
//! ownership moves; the caller keeps the source alive and unmoved for the
//! duration of the call, which the borrow in every safe entry point
//! enforces.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod kernels;
pub mod raw;

pub use kernels::{fill, iota, scale, sum, sum_doubles};
pub use raw::{with_raw_parts, with_raw_parts_mut, RawParts};
