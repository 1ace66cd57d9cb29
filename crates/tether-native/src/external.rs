//! Non-owning contiguous slice over memory owned elsewhere.
//!
//! [`ExternalSlice`] is the `span` analogue: a typed pointer plus length
//! that never frees what it points to. It is either built from raw parts
//! (for memory the caller vouches for) or adopted from a contiguous
//! [`BufferDescriptor`], in which case it carries the descriptor's
//! provenance and refuses every access once the owner has moved or gone.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use tether_core::{AdoptError, BufferDescriptor, Element, ExportBuffer, ExportBufferMut, Provenance};

/// A non-owning view of `len` contiguous `T`s.
///
/// Cloning shares the underlying memory; it does not copy elements.
#[derive(Clone)]
pub struct ExternalSlice<T: Element> {
    ptr: NonNull<T>,
    len: usize,
    readonly: bool,
    provenance: Option<Provenance>,
    _marker: PhantomData<*mut T>,
}

impl<T: Element> ExternalSlice<T> {
    /// Wrap a writable region.
    ///
    /// # Safety
    ///
    /// `ptr .. ptr + len` must be aligned, initialized, and valid for reads
    /// and writes for as long as the slice (or any clone of it) is used.
    /// Nothing tracks the owner: the caller guarantees it outlives the
    /// slice and does not move.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> Self {
        Self {
            ptr,
            len,
            readonly: false,
            provenance: None,
            _marker: PhantomData,
        }
    }

    /// Wrap a read-only region.
    ///
    /// # Safety
    ///
    /// As [`ExternalSlice::from_raw_parts`], except only reads need be valid.
    pub unsafe fn from_raw_parts_readonly(ptr: NonNull<T>, len: usize) -> Self {
        Self {
            readonly: true,
            ..Self::from_raw_parts(ptr, len)
        }
    }

    /// Adopt a contiguous descriptor of `T`.
    ///
    /// Fails with [`AdoptError::UnsupportedElementType`] on a kind mismatch,
    /// [`AdoptError::ShapeMismatch`] if the elements are not packed back to
    /// back or the base is misaligned for `T`, and
    /// [`AdoptError::StaleBuffer`] if the owner has already moved.
    pub fn adopt(desc: &BufferDescriptor) -> Result<Self, AdoptError> {
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
        Ok(Self {
            ptr,
            len: desc.count(),
            readonly: desc.is_readonly(),
            provenance: desc.provenance().cloned(),
            _marker: PhantomData,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the slice is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether writes are forbidden.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Whether the owner is known to have moved or been released.
    pub fn is_stale(&self) -> bool {
        self.provenance.as_ref().is_some_and(Provenance::is_stale)
    }

    /// Provenance inherited from the adopted descriptor.
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    fn check_fresh(&self) -> Result<(), AdoptError> {
        match &self.provenance {
            Some(p) => p.check(),
            None => Ok(()),
        }
    }

    fn check_writable(&self) -> Result<(), AdoptError> {
        if self.readonly {
            return Err(AdoptError::ReadOnlyViolation);
        }
        self.check_fresh()
    }

    fn check_index(&self, index: usize) -> Result<(), AdoptError> {
        if index >= self.len {
            return Err(AdoptError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    /// Read element `index`.
    pub fn get(&self, index: usize) -> Result<T, AdoptError> {
        self.check_fresh()?;
        self.check_index(index)?;
        // SAFETY: fresh and in bounds; the region was vouched for (or
        // exported) as valid for reads.
        Ok(unsafe { self.ptr.as_ptr().add(index).read() })
    }

    /// Write element `index`. Visible to the owner immediately.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), AdoptError> {
        self.check_writable()?;
        self.check_index(index)?;
        // SAFETY: as `get`, plus the region is writable.
        unsafe { self.ptr.as_ptr().add(index).write(value) };
        Ok(())
    }

    /// Copy the elements out.
    pub fn to_vec(&self) -> Result<Vec<T>, AdoptError> {
        self.check_fresh()?;
        // SAFETY: fresh; the whole region is valid for reads.
        Ok(unsafe { self.as_slice() }.to_vec())
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) -> Result<(), AdoptError> {
        self.check_writable()?;
        // SAFETY: fresh and writable.
        unsafe { self.as_mut_slice() }.fill(value);
        Ok(())
    }

    /// Overwrite every element from `src`, which must have the same length.
    pub fn copy_from_slice(&mut self, src: &[T]) -> Result<(), AdoptError> {
        self.check_writable()?;
        if src.len() != self.len {
            return Err(AdoptError::shape(format!(
                "source has {} elements, destination has {}",
                src.len(),
                self.len
            )));
        }
        // SAFETY: fresh and writable; lengths match.
        unsafe { self.as_mut_slice() }.copy_from_slice(src);
        Ok(())
    }

    /// Borrow the region as a slice.
    ///
    /// # Safety
    ///
    /// The owner must not move, release, or write the region while the
    /// returned slice is alive. Freshness is not checked.
    pub unsafe fn as_slice(&self) -> &[T] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }

    /// Borrow the region as a mutable slice.
    ///
    /// # Safety
    ///
    /// As [`ExternalSlice::as_slice`], and nothing else may read or write the
    /// region while the returned slice is alive. The slice must be writable.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [T] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }

    fn describe(&self, readonly: bool) -> Result<BufferDescriptor, AdoptError> {
        self.check_fresh()?;
        // SAFETY: the region is valid for as long as the owner behind our
        // provenance (or the caller of from_raw_parts) keeps it so.
        let desc = unsafe { BufferDescriptor::from_slice_parts(self.ptr, self.len, readonly) };
        Ok(match &self.provenance {
            Some(p) => desc.with_provenance(p.clone()),
            None => desc,
        })
    }
}

impl<T: Element> ExportBuffer for ExternalSlice<T> {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        self.describe(true)
    }
}

impl<T: Element> ExportBufferMut for ExternalSlice<T> {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        if self.readonly {
            return Err(AdoptError::ReadOnlyViolation);
        }
        self.describe(false)
    }
}

impl<T: Element> fmt::Debug for ExternalSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalSlice")
            .field("element", &T::TYPE)
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("readonly", &self.readonly)
            .field("stale", &self.is_stale())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NativeVec;
    use tether_core::ElementType;

    #[test]
    fn adopt_shares_memory_both_ways() {
        let mut v = NativeVec::from_vec(vec![1.0f64, 2.0, 3.0]);
        let desc = v.export_buffer_mut().unwrap();
        let mut s = ExternalSlice::<f64>::adopt(&desc).unwrap();
        s.set(0, 10.0).unwrap();
        assert_eq!(v.get(0), Some(10.0));
        v.set(2, 30.0).unwrap();
        assert_eq!(s.get(2).unwrap(), 30.0);
        assert_eq!(s.to_vec().unwrap(), vec![10.0, 2.0, 30.0]);
    }

    #[test]
    fn kind_mismatch_is_unsupported() {
        let mut v = NativeVec::from_vec(vec![1i32]);
        let desc = v.export_buffer_mut().unwrap();
        assert!(matches!(
            ExternalSlice::<u32>::adopt(&desc),
            Err(AdoptError::UnsupportedElementType { .. })
        ));
    }

    #[test]
    fn strided_descriptor_is_rejected() {
        let mut v = NativeVec::from_vec(vec![1u16, 2, 3, 4]);
        let desc = v.export_buffer_mut().unwrap().with_step(2).unwrap();
        assert!(matches!(
            ExternalSlice::<u16>::adopt(&desc),
            Err(AdoptError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn stale_descriptor_is_rejected_at_adoption() {
        let mut v = NativeVec::from_vec(vec![1u8]);
        let desc = v.export_buffer_mut().unwrap();
        v.push(2);
        assert!(ExternalSlice::<u8>::adopt(&desc).unwrap_err().is_stale());
    }

    #[test]
    fn access_after_resize_is_stale() {
        let mut v = NativeVec::from_vec(vec![1i64, 2]);
        let mut s = ExternalSlice::<i64>::adopt(&v.export_buffer_mut().unwrap()).unwrap();
        v.resize(100, 0);
        assert!(s.is_stale());
        assert!(s.get(0).unwrap_err().is_stale());
        assert!(s.set(0, 1).unwrap_err().is_stale());
        assert!(s.to_vec().unwrap_err().is_stale());
        assert!(s.fill(0).unwrap_err().is_stale());
    }

    #[test]
    fn readonly_adoption_refuses_writes() {
        let v = NativeVec::from_vec(vec![1.0f32, 2.0]);
        let mut s = ExternalSlice::<f32>::adopt(&v.export_buffer().unwrap()).unwrap();
        assert!(s.is_readonly());
        assert_eq!(s.set(0, 0.0), Err(AdoptError::ReadOnlyViolation));
        assert_eq!(s.fill(0.0), Err(AdoptError::ReadOnlyViolation));
        assert_eq!(s.export_buffer_mut().unwrap_err(), AdoptError::ReadOnlyViolation);
        assert_eq!(s.get(1).unwrap(), 2.0);
    }

    #[test]
    fn raw_parts_are_untracked() {
        let mut data = [1u32, 2, 3];
        let ptr = NonNull::new(data.as_mut_ptr()).unwrap();
        let mut s = unsafe { ExternalSlice::from_raw_parts(ptr, data.len()) };
        s.copy_from_slice(&[4, 5, 6]).unwrap();
        assert!(s.copy_from_slice(&[1]).is_err());
        assert!(!s.is_stale());
        assert!(s.provenance().is_none());
        assert_eq!(data, [4, 5, 6]);
    }

    #[test]
    fn reexport_keeps_provenance() {
        let mut v = NativeVec::from_vec(vec![7i8; 4]);
        let s = ExternalSlice::<i8>::adopt(&v.export_buffer_mut().unwrap()).unwrap();
        let again = s.export_buffer().unwrap();
        assert_eq!(again.element_type(), Some(ElementType::I8));
        assert!(again.is_readonly());
        v.clear();
        assert!(again.is_stale());
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let v = NativeVec::from_vec(vec![0u64; 2]);
        let s = ExternalSlice::<u64>::adopt(&v.export_buffer().unwrap()).unwrap();
        assert_eq!(
            s.get(2),
            Err(AdoptError::IndexOutOfBounds { index: 2, len: 2 })
        );
    }
}
