//! Native contiguous containers for the Tether buffer adoption protocol.
//!
//! Two container shapes export [`BufferDescriptor`](tether_core::BufferDescriptor)s
//! without copying:
//!
//! - [`NativeVec`]: owns a growable allocation. Every size-changing
//!   mutation advances its allocation epoch, so views adopted before the
//!   change report `StaleBuffer` instead of reading moved memory.
//! - [`ExternalSlice`]: a fixed-size, non-owning wrapper over memory that
//!   somebody else owns (a raw pointer and length, or an adopted foreign
//!   descriptor). It never reallocates, but it carries the provenance of
//!   the memory it wraps so the owner's moves are still detected.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod external;
pub mod vector;

pub use config::{GrowthPolicy, NativeConfig, NativeConfigError};
pub use external::ExternalSlice;
pub use vector::{NativeVec, NativeVecIter};
