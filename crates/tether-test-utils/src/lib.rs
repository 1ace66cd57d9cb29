//! Test utilities and mock buffer sources for Tether development.
//!
//! Provides mock [`ExportBuffer`] implementations that misbehave in
//! controlled ways (relocating, read-only, counting exports) and, in
//! [`fixtures`], shared column tables and boundary values per element
//! type.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{boundary_values, xy_table, Boundary, XY_X, XY_Y};

use std::cell::Cell;

use tether_core::{AdoptError, BufferDescriptor, Element, ExportBuffer, ExportBufferMut};
use tether_native::NativeVec;

/// A source whose backing store can be forced to move.
///
/// [`relocate`](RelocatingSource::relocate) copies the values into a fresh
/// container and drops the old one, so every descriptor exported before
/// the call reports a released allocation.
pub struct RelocatingSource<T: Element> {
    inner: NativeVec<T>,
    relocations: usize,
}

impl<T: Element> RelocatingSource<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            inner: NativeVec::from_vec(values),
            relocations: 0,
        }
    }

    /// Move the backing store to a new allocation.
    pub fn relocate(&mut self) {
        self.inner = NativeVec::from_vec(self.inner.to_vec());
        self.relocations += 1;
    }

    /// How many times the store has moved.
    pub fn relocations(&self) -> usize {
        self.relocations
    }

    pub fn values(&self) -> Vec<T> {
        self.inner.to_vec()
    }

    pub fn inner_mut(&mut self) -> &mut NativeVec<T> {
        &mut self.inner
    }
}

impl<T: Element> ExportBuffer for RelocatingSource<T> {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        self.inner.export_buffer()
    }
}

impl<T: Element> ExportBufferMut for RelocatingSource<T> {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        self.inner.export_buffer_mut()
    }
}

/// A source that only ever exports read-only descriptors, even through
/// [`ExportBufferMut`].
pub struct ReadOnlySource<T: Element> {
    inner: NativeVec<T>,
}

impl<T: Element> ReadOnlySource<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            inner: NativeVec::from_vec(values),
        }
    }

    pub fn values(&self) -> Vec<T> {
        self.inner.to_vec()
    }
}

impl<T: Element> ExportBuffer for ReadOnlySource<T> {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        self.inner.export_buffer()
    }
}

impl<T: Element> ExportBufferMut for ReadOnlySource<T> {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        self.inner.export_buffer()
    }
}

/// Wraps a source and counts how many descriptors it hands out.
pub struct CountingSource<S> {
    inner: S,
    exports: Cell<usize>,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            exports: Cell::new(0),
        }
    }

    /// Descriptors exported so far, read-only and writable combined.
    pub fn exports(&self) -> usize {
        self.exports.get()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ExportBuffer> ExportBuffer for CountingSource<S> {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        self.exports.set(self.exports.get() + 1);
        self.inner.export_buffer()
    }
}

impl<S: ExportBufferMut> ExportBufferMut for CountingSource<S> {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        self.exports.set(self.exports.get() + 1);
        self.inner.export_buffer_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocation_releases_earlier_descriptors() {
        let mut s = RelocatingSource::new(vec![1.0f64, 2.0]);
        let before = s.export_buffer().unwrap();
        s.relocate();
        assert_eq!(s.relocations(), 1);
        assert!(matches!(
            before.check_fresh(),
            Err(AdoptError::StaleBuffer { released: true, .. })
        ));
        assert!(s.export_buffer().unwrap().check_fresh().is_ok());
        assert_eq!(s.values(), vec![1.0, 2.0]);
    }

    #[test]
    fn read_only_source_never_exports_writable() {
        let mut s = ReadOnlySource::new(vec![1u8]);
        assert!(s.export_buffer_mut().unwrap().is_readonly());
    }

    #[test]
    fn counting_source_counts_both_kinds() {
        let mut s = CountingSource::new(NativeVec::from_vec(vec![1i32]));
        s.export_buffer().unwrap();
        s.export_buffer_mut().unwrap();
        assert_eq!(s.exports(), 2);
    }
}
