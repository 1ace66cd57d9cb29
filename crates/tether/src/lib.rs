//! Tether: zero-copy buffer sharing between native containers and
//! numpy-like foreign arrays.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tether sub-crates. For most users, adding `tether` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tether::prelude::*;
//!
//! // Native → foreign: a view over the container's own memory.
//! let mut v = NativeVec::from_vec(vec![1.0f64, 2.0, 3.0]);
//! let mut view = adopt::<f64>(&v.export_buffer_mut().unwrap()).unwrap();
//! view.set(0, 10.0).unwrap();
//! assert_eq!(v.get(0), Some(10.0));
//!
//! // Growing the container invalidates the view instead of leaving it
//! // dangling.
//! v.push(4.0);
//! assert!(matches!(view.get(0), Err(AdoptError::StaleBuffer { .. })));
//!
//! // Foreign → native: a fixed-size wrapper over a foreign array.
//! let mut a = ForeignArray::from_vec(vec![1i32, 2, 3]);
//! let mut slice = ExternalSlice::<i32>::adopt(&a.export_buffer_mut().unwrap()).unwrap();
//! slice.set(2, 30).unwrap();
//! assert_eq!(a.get::<i32>(&[2]).unwrap(), 30);
//!
//! // Bridge: pointer and length for a statically typed kernel.
//! assert_eq!(tether::bridge::sum_doubles(&v).unwrap(), 10.0 + 2.0 + 3.0 + 4.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tether-core` | Element types, descriptors, array-interface records, epochs, errors |
//! | [`native`] | `tether-native` | `NativeVec`, `ExternalSlice`, container configuration |
//! | [`foreign`] | `tether-foreign` | `ForeignArray` and adopted views |
//! | [`bridge`] | `tether-bridge` | Raw pointer extraction and kernels |
//! | [`columns`] | `tether-columns` | Column tables, materialization, column stores |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Element types, descriptors, and allocation epochs (`tether-core`).
///
/// Contains [`types::BufferDescriptor`], [`types::ArrayInterface`], the
/// [`types::Element`] trait, and the capability traits
/// [`types::ExportBuffer`] and [`types::ExportBufferMut`].
pub use tether_core as types;

/// Native containers (`tether-native`).
///
/// [`native::NativeVec`] owns and exports its store;
/// [`native::ExternalSlice`] wraps memory owned elsewhere.
pub use tether_native as native;

/// Foreign arrays and adopted views (`tether-foreign`).
///
/// [`foreign::ForeignArray`] is the numpy-like owned array;
/// [`foreign::adopt`] and friends turn any descriptor into a view.
pub use tether_foreign as foreign;

/// Pointer-and-length interop (`tether-bridge`).
///
/// [`bridge::RawParts`] and [`bridge::with_raw_parts`] hand validated raw
/// pointers to statically typed functions.
pub use tether_bridge as bridge;

/// Column tables and stores (`tether-columns`).
///
/// Build a [`columns::ColumnTable`], filter and define columns, then
/// materialize or snapshot into a [`columns::ColumnStore`].
pub use tether_columns as columns;

/// Common imports for typical Tether usage.
///
/// ```rust
/// use tether::prelude::*;
/// ```
///
/// This imports containers, views, the capability traits, adoption
/// functions, column tables, and the error types.
pub mod prelude {
    // Core types and traits
    pub use tether_core::{
        ArrayInterface, BufferDescriptor, Element, ElementType, ExportBuffer, ExportBufferMut,
    };

    // Errors
    pub use tether_columns::{ColumnError, StoreError};
    pub use tether_core::AdoptError;

    // Containers
    pub use tether_native::{ExternalSlice, NativeVec};

    // Foreign arrays and views
    pub use tether_foreign::{
        adopt, adopt_any, adopt_records, adopt_source, AnyView, ArrayView, ForeignArray,
        RecordView,
    };

    // Bridge
    pub use tether_bridge::{with_raw_parts, with_raw_parts_mut, RawParts};

    // Columns
    pub use tether_columns::{
        ColumnData, ColumnStore, ColumnTable, Materialized, MemoryStore, SnapshotMode,
        SnapshotOptions,
    };
}
