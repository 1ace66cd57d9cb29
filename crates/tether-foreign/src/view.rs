//! Typed views over adopted descriptors.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;

use tether_core::{AdoptError, BufferDescriptor, Element, ExportBuffer, ExportBufferMut};

/// A typed, possibly strided view of memory owned by someone else.
///
/// Holds a copy of the descriptor, never the payload. Every access checks
/// the descriptor's provenance first, so a view outliving a resize or the
/// owner itself reports [`AdoptError::StaleBuffer`]. Loads and stores are
/// unaligned-tolerant, so record fields and odd strides are fine.
///
/// Cloning a view yields a second view of the same memory.
#[derive(Clone)]
pub struct ArrayView<T: Element> {
    desc: BufferDescriptor,
    _marker: PhantomData<T>,
}

impl<T: Element> ArrayView<T> {
    /// Wrap a descriptor whose layout is already known to be `Scalar(T)`.
    pub(crate) fn from_checked(desc: BufferDescriptor) -> Self {
        Self {
            desc,
            _marker: PhantomData,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.desc.count()
    }

    /// Whether the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.desc.is_empty()
    }

    /// Byte distance between consecutive elements.
    pub fn stride(&self) -> isize {
        self.desc.stride()
    }

    /// Whether writes are refused.
    pub fn is_readonly(&self) -> bool {
        self.desc.is_readonly()
    }

    /// Whether the originating allocation has moved or been released.
    pub fn is_stale(&self) -> bool {
        self.desc.is_stale()
    }

    /// The adopted descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.desc
    }

    /// Read element `index`.
    pub fn get(&self, index: usize) -> Result<T, AdoptError> {
        self.desc.check_fresh()?;
        let ptr = self.desc.element_ptr(index)?;
        // SAFETY: fresh and in bounds, so the element lies inside the live
        // allocation the descriptor was exported from.
        Ok(unsafe { ptr.cast::<T>().read_unaligned() })
    }

    fn check_writable(&self) -> Result<(), AdoptError> {
        if self.desc.is_readonly() {
            return Err(AdoptError::ReadOnlyViolation);
        }
        self.desc.check_fresh()
    }

    /// Write element `index`. The owner sees the new value immediately.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), AdoptError> {
        self.check_writable()?;
        let ptr = self.desc.element_ptr(index)?;
        // SAFETY: as `get`, and the exporter granted write access.
        unsafe { ptr.cast::<T>().write_unaligned(value) };
        Ok(())
    }

    /// Iterate over the elements. Each item re-checks freshness.
    pub fn iter(&self) -> impl Iterator<Item = Result<T, AdoptError>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Copy the elements out.
    pub fn to_vec(&self) -> Result<Vec<T>, AdoptError> {
        self.desc.check_fresh()?;
        self.iter().collect()
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) -> Result<(), AdoptError> {
        self.check_writable()?;
        for i in 0..self.len() {
            self.set(i, value)?;
        }
        Ok(())
    }

    /// Overwrite every element from `src`, which must have the same length.
    pub fn copy_from_slice(&mut self, src: &[T]) -> Result<(), AdoptError> {
        self.check_writable()?;
        if src.len() != self.len() {
            return Err(AdoptError::shape(format!(
                "source has {} elements, view has {}",
                src.len(),
                self.len()
            )));
        }
        for (i, &value) in src.iter().enumerate() {
            self.set(i, value)?;
        }
        Ok(())
    }
}

impl<T: Element> ExportBuffer for ArrayView<T> {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        self.desc.check_fresh()?;
        Ok(self.desc.clone().into_readonly())
    }
}

impl<T: Element> ExportBufferMut for ArrayView<T> {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        if self.desc.is_readonly() {
            return Err(AdoptError::ReadOnlyViolation);
        }
        self.desc.check_fresh()?;
        Ok(self.desc.clone())
    }
}

impl<T: Element> fmt::Debug for ArrayView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayView")
            .field("element", &T::TYPE)
            .field("len", &self.len())
            .field("stride", &self.stride())
            .field("readonly", &self.is_readonly())
            .field("stale", &self.is_stale())
            .finish()
    }
}
