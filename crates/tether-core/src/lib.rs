//! Core types for the Tether zero-copy buffer adoption protocol.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary every other crate speaks:
//!
//! - [`ElementType`] / [`Element`]: the closed set of scalar numeric kinds
//!   that can cross an adoption boundary, and the Rust types that map to them.
//! - [`ElementLayout`]: a scalar kind, or a record whose fields are all
//!   scalar kinds.
//! - [`BufferDescriptor`]: base address, layout, count, byte stride, and
//!   mutability of a shared region, plus the [`Provenance`] of the
//!   allocation it was captured from.
//! - [`AllocationEpoch`]: a generation counter bumped whenever an owner's
//!   backing store may have moved. Views compare against it on every access
//!   and surface [`AdoptError::StaleBuffer`] instead of reading freed memory.
//! - [`ArrayInterface`]: the structural array-interface record used at the
//!   in-process boundary with numpy-like consumers.
//! - [`ExportBuffer`] / [`ExportBufferMut`]: the capability traits that
//!   replace duck-typed "anything with an array interface" probing.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod descriptor;
pub mod dtype;
pub mod epoch;
pub mod error;
pub mod interface;
pub mod layout;
pub mod traits;

pub use descriptor::BufferDescriptor;
pub use dtype::{Element, ElementType};
pub use epoch::{AllocationEpoch, Provenance};
pub use error::AdoptError;
pub use interface::{ArrayInterface, DescrField, DescrKind, ARRAY_INTERFACE_VERSION};
pub use layout::{ElementLayout, RecordField, RecordLayout};
pub use traits::{ExportBuffer, ExportBufferMut};
