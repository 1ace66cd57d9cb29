//! Statically typed native functions over `(pointer, length)`.
//!
//! The raw kernels are what a C or C++ routine looks like from Rust: they
//! know nothing about descriptors or owners. The safe wrappers below
//! accept any [`ExportBuffer`] source, degrade it with [`RawParts`], and
//! call the kernel.

#![allow(unsafe_code)]

use std::slice;

use tether_core::{AdoptError, Element, ExportBuffer, ExportBufferMut};

use crate::raw::{with_raw_parts, with_raw_parts_mut, RawParts};

/// Sum `len` doubles starting at `ptr`.
///
/// # Safety
///
/// `ptr` must be non-null, aligned, and valid for `len` reads.
pub unsafe fn sum_f64(ptr: *const f64, len: usize) -> f64 {
    slice::from_raw_parts(ptr, len).iter().sum()
}

/// Sum `len` floats starting at `ptr`, accumulating in `f64`.
///
/// # Safety
///
/// `ptr` must be non-null, aligned, and valid for `len` reads.
pub unsafe fn sum_f32(ptr: *const f32, len: usize) -> f64 {
    slice::from_raw_parts(ptr, len).iter().map(|&x| f64::from(x)).sum()
}

/// Set `len` doubles starting at `ptr` to `value`.
///
/// # Safety
///
/// `ptr` must be non-null, aligned, and valid for `len` writes.
pub unsafe fn fill_f64(ptr: *mut f64, len: usize, value: f64) {
    slice::from_raw_parts_mut(ptr, len).fill(value);
}

/// Multiply `len` doubles starting at `ptr` by `factor` in place.
///
/// # Safety
///
/// `ptr` must be non-null, aligned, and valid for `len` reads and writes.
pub unsafe fn scale_f64(ptr: *mut f64, len: usize, factor: f64) {
    for x in slice::from_raw_parts_mut(ptr, len) {
        *x *= factor;
    }
}

/// Write `start, start + 1, ...` into `len` ints starting at `ptr`.
///
/// Wraps on overflow.
///
/// # Safety
///
/// `ptr` must be non-null, aligned, and valid for `len` writes.
pub unsafe fn fill_iota_i32(ptr: *mut i32, len: usize, start: i32) {
    for (i, x) in slice::from_raw_parts_mut(ptr, len).iter_mut().enumerate() {
        *x = start.wrapping_add(i as i32);
    }
}

/// Sum the elements of any contiguous source, converted to `f64`.
pub fn sum<T: Element, S: ExportBuffer + ?Sized>(source: &S) -> Result<f64, AdoptError> {
    let parts = RawParts::<T>::from_source(source)?;
    // SAFETY: the parts were extracted from a fresh, contiguous, aligned
    // descriptor and the source is borrowed for the whole call.
    let values = unsafe { slice::from_raw_parts(parts.as_ptr(), parts.len()) };
    Ok(values.iter().map(|&x| x.to_f64()).sum())
}

/// Sum a contiguous `f64` source with the [`sum_f64`] kernel.
pub fn sum_doubles<S: ExportBuffer + ?Sized>(source: &S) -> Result<f64, AdoptError> {
    // SAFETY: with_raw_parts hands over a validated pointer and length.
    with_raw_parts(source, |ptr, len| unsafe { sum_f64(ptr, len) })
}

/// Set every element of a writable contiguous source to `value`.
pub fn fill<T: Element, S: ExportBufferMut + ?Sized>(source: &mut S, value: T) -> Result<(), AdoptError> {
    with_raw_parts_mut(source, |ptr: *mut T, len| {
        // SAFETY: validated writable pointer and length.
        unsafe { slice::from_raw_parts_mut(ptr, len) }.fill(value);
    })
}

/// Multiply every element of a writable contiguous `f64` source by `factor`.
pub fn scale<S: ExportBufferMut + ?Sized>(source: &mut S, factor: f64) -> Result<(), AdoptError> {
    // SAFETY: validated writable pointer and length.
    with_raw_parts_mut(source, |ptr, len| unsafe { scale_f64(ptr, len, factor) })
}

/// Fill a writable contiguous `i32` source with `start, start + 1, ...`.
pub fn iota<S: ExportBufferMut + ?Sized>(source: &mut S, start: i32) -> Result<(), AdoptError> {
    // SAFETY: validated writable pointer and length.
    with_raw_parts_mut(source, |ptr, len| unsafe { fill_iota_i32(ptr, len, start) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_foreign::{adopt, ForeignArray};
    use tether_native::{ExternalSlice, NativeVec};

    #[test]
    fn kernels_accept_native_and_foreign_alike() {
        let v = NativeVec::from_vec(vec![1.0f64, 2.0, 3.0]);
        let a = ForeignArray::from_vec(vec![1.0f64, 2.0, 3.0]);
        assert_eq!(sum_doubles(&v).unwrap(), 6.0);
        assert_eq!(sum_doubles(&a).unwrap(), 6.0);
        assert_eq!(sum::<f64, _>(&a).unwrap(), 6.0);
    }

    #[test]
    fn mutation_through_kernel_is_visible_to_owner() {
        let mut a = ForeignArray::from_vec(vec![1.0f64, 2.0]);
        scale(&mut a, 10.0).unwrap();
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![10.0, 20.0]);
        let mut v = NativeVec::from_vec(vec![0.0f64; 3]);
        fill(&mut v, 2.5).unwrap();
        assert_eq!(v.to_vec(), vec![2.5, 2.5, 2.5]);
    }

    #[test]
    fn iota_through_adopted_slice() {
        let mut a = ForeignArray::from_vec(vec![0i32; 4]);
        let mut s = ExternalSlice::<i32>::adopt(&a.export_buffer_mut().unwrap()).unwrap();
        iota(&mut s, 5).unwrap();
        assert_eq!(a.to_vec::<i32>().unwrap(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn sum_f32_accumulates_in_double() {
        let v = NativeVec::from_vec(vec![0.5f32, 0.25]);
        let total = with_raw_parts(&v, |ptr, len| unsafe { sum_f32(ptr, len) }).unwrap();
        assert_eq!(total, 0.75);
    }

    #[test]
    fn wrong_element_type_is_rejected() {
        let v = NativeVec::from_vec(vec![1i64]);
        assert!(matches!(
            sum_doubles(&v),
            Err(AdoptError::UnsupportedElementType { .. })
        ));
        assert_eq!(sum::<i64, _>(&v).unwrap(), 1.0);
    }

    #[test]
    fn readonly_view_cannot_be_filled() {
        let v = NativeVec::from_vec(vec![1.0f64]);
        let mut view = adopt::<f64>(&v.export_buffer().unwrap()).unwrap();
        assert_eq!(fill(&mut view, 0.0), Err(AdoptError::ReadOnlyViolation));
    }

    #[test]
    fn stale_view_cannot_be_summed() {
        let mut v = NativeVec::from_vec(vec![1.0f64]);
        let view = adopt::<f64>(&v.export_buffer_mut().unwrap()).unwrap();
        v.resize(8, 0.0);
        assert!(sum_doubles(&view).unwrap_err().is_stale());
    }
}
