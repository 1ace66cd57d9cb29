//! Degrading descriptors to `{pointer, length}`.

#![allow(unsafe_code)]

use std::fmt;
use std::mem;
use std::ptr::NonNull;

use tether_core::{AdoptError, BufferDescriptor, Element, ExportBuffer, ExportBufferMut, Provenance};

/// A contiguous run of `T` as a bare pointer and length.
///
/// Carries no ownership. The provenance of the source descriptor is kept
/// so [`RawParts::check_fresh`] can be asked before each use; the pointer
/// itself is only meaningful while the source is unmoved.
pub struct RawParts<T: Element> {
    ptr: NonNull<T>,
    len: usize,
    readonly: bool,
    provenance: Option<Provenance>,
}

impl<T: Element> RawParts<T> {
    /// Extract pointer and length from a descriptor.
    ///
    /// Requires `Scalar(T::TYPE)`, packed elements, an aligned base, and a
    /// fresh provenance.
    pub fn from_descriptor(desc: &BufferDescriptor) -> Result<Self, AdoptError> {
        desc.require_scalar(T::TYPE)?;
        desc.require_contiguous()?;
        desc.check_fresh()?;
        let ptr = desc.base().cast::<T>();
        if !desc.is_empty() && (ptr.as_ptr() as usize) % mem::align_of::<T>() != 0 {
            return Err(AdoptError::shape(format!(
                "base address is not aligned for {}",
                T::TYPE
            )));
        }
        tracing::trace!(element = %T::TYPE, len = desc.count(), "raw parts extracted");
        Ok(Self {
            ptr,
            len: desc.count(),
            readonly: desc.is_readonly(),
            provenance: desc.provenance().cloned(),
        })
    }

    /// Read-only parts of any exporting source.
    pub fn from_source<S: ExportBuffer + ?Sized>(source: &S) -> Result<Self, AdoptError> {
        Self::from_descriptor(&source.export_buffer()?)
    }

    /// Writable parts of any exporting source.
    pub fn from_source_mut<S: ExportBufferMut + ?Sized>(source: &mut S) -> Result<Self, AdoptError> {
        Self::from_descriptor(&source.export_buffer_mut()?)
    }

    /// Pointer to element 0. Dangling (never null) when empty.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Mutable pointer to element 0.
    pub fn as_mut_ptr(&mut self) -> Result<*mut T, AdoptError> {
        if self.readonly {
            return Err(AdoptError::ReadOnlyViolation);
        }
        Ok(self.ptr.as_ptr())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the source granted write access.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Fail with `StaleBuffer` if the source has moved since extraction.
    pub fn check_fresh(&self) -> Result<(), AdoptError> {
        match &self.provenance {
            Some(p) => p.check(),
            None => Ok(()),
        }
    }
}

impl<T: Element> fmt::Debug for RawParts<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawParts")
            .field("element", &T::TYPE)
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("readonly", &self.readonly)
            .finish()
    }
}

/// Call `f` with the read-only pointer and length of `source`.
///
/// `f` must not retain the pointer past its return.
pub fn with_raw_parts<T, S, R>(source: &S, f: impl FnOnce(*const T, usize) -> R) -> Result<R, AdoptError>
where
    T: Element,
    S: ExportBuffer + ?Sized,
{
    let parts = RawParts::<T>::from_source(source)?;
    Ok(f(parts.as_ptr(), parts.len()))
}

/// Call `f` with the writable pointer and length of `source`.
///
/// Fails with [`AdoptError::ReadOnlyViolation`] if `source` only exports
/// read-only memory. `f` must not retain the pointer past its return.
pub fn with_raw_parts_mut<T, S, R>(
    source: &mut S,
    f: impl FnOnce(*mut T, usize) -> R,
) -> Result<R, AdoptError>
where
    T: Element,
    S: ExportBufferMut + ?Sized,
{
    let mut parts = RawParts::<T>::from_source_mut(source)?;
    let ptr = parts.as_mut_ptr()?;
    Ok(f(ptr, parts.len()))
}
