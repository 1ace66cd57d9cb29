//! Raw-pointer kernels and dtype queries over the C ABI.

use tether_bridge::{kernels, RawParts};

use crate::status::TetherStatus;
use crate::types::{element_type, TetherBufferDesc};
use crate::view::descriptor_from_c;

/// Sum a contiguous `double` buffer into `out`.
///
/// The descriptor goes through the same checks as adoption: dtype, packed
/// stride, alignment, and owner freshness.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_bridge_sum_f64(desc: *const TetherBufferDesc, out: *mut f64) -> i32 {
    ffi_guard!({
        if desc.is_null() || out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        // SAFETY: desc is non-null and valid per caller contract; region
        // validity is the caller's contract as well.
        let built = match unsafe { descriptor_from_c(&*desc) } {
            Ok(d) => d,
            Err(status) => return status as i32,
        };
        let parts = match RawParts::<f64>::from_descriptor(&built) {
            Ok(p) => p,
            Err(e) => return TetherStatus::from(&e) as i32,
        };
        // SAFETY: parts were checked for type, contiguity, alignment and
        // freshness; out is non-null and valid for writes.
        unsafe { *out = kernels::sum_f64(parts.as_ptr(), parts.len()) };
        TetherStatus::Ok as i32
    })
}

/// Multiply every element of a contiguous, writable `double` buffer by
/// `factor`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_bridge_scale_f64(desc: *const TetherBufferDesc, factor: f64) -> i32 {
    ffi_guard!({
        if desc.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        // SAFETY: desc is non-null and valid per caller contract.
        let built = match unsafe { descriptor_from_c(&*desc) } {
            Ok(d) => d,
            Err(status) => return status as i32,
        };
        let ptr = match RawParts::<f64>::from_descriptor(&built).and_then(|mut p| {
            p.as_mut_ptr().map(|ptr| (ptr, p.len()))
        }) {
            Ok(ptr) => ptr,
            Err(e) => return TetherStatus::from(&e) as i32,
        };
        // SAFETY: checked as in tether_bridge_sum_f64, plus writability.
        unsafe { kernels::scale_f64(ptr.0, ptr.1, factor) };
        TetherStatus::Ok as i32
    })
}

/// Write the size in bytes of one element of `dtype` to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_dtype_itemsize(dtype: i32, out: *mut usize) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let Some(element) = element_type(dtype) else {
            return TetherStatus::UnsupportedElementType as i32;
        };
        // SAFETY: out is non-null and valid for writes per caller contract.
        unsafe { *out = element.itemsize() };
        TetherStatus::Ok as i32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{tether_vec_create, tether_vec_destroy, tether_vec_export, tether_vec_get_f64, tether_vec_set_f64};

    #[test]
    fn sum_and_scale_through_exported_vector() {
        let mut h = 0;
        assert_eq!(tether_vec_create(9, 3, &mut h), 0);
        for (i, v) in [1.0, 2.0, 3.5].into_iter().enumerate() {
            assert_eq!(tether_vec_set_f64(h, i, v), 0);
        }
        let mut desc = TetherBufferDesc::default();
        assert_eq!(tether_vec_export(h, 0, &mut desc), 0);
        let mut total = 0.0;
        assert_eq!(tether_bridge_sum_f64(&desc, &mut total), 0);
        assert_eq!(total, 6.5);

        assert_eq!(tether_bridge_scale_f64(&desc, 2.0), 0);
        let mut v = 0.0;
        assert_eq!(tether_vec_get_f64(h, 2, &mut v), 0);
        assert_eq!(v, 7.0);

        let mut readonly = TetherBufferDesc::default();
        assert_eq!(tether_vec_export(h, 1, &mut readonly), 0);
        assert_eq!(
            tether_bridge_scale_f64(&readonly, 2.0),
            TetherStatus::ReadOnlyViolation as i32
        );
        tether_vec_destroy(h);
        assert_eq!(
            tether_bridge_sum_f64(&desc, &mut total),
            TetherStatus::StaleBuffer as i32
        );
    }

    #[test]
    fn sum_rejects_wrong_dtype_and_strided_buffers() {
        let data = [1.0f64, 2.0, 3.0, 4.0];
        let strided = TetherBufferDesc {
            data: data.as_ptr() as *mut _,
            dtype: 9,
            count: 2,
            stride: 16,
            readonly: 1,
            ..TetherBufferDesc::default()
        };
        let mut total = 0.0;
        assert_eq!(
            tether_bridge_sum_f64(&strided, &mut total),
            TetherStatus::ShapeMismatch as i32
        );
        let floats = TetherBufferDesc {
            dtype: 8,
            stride: 4,
            ..strided
        };
        assert_eq!(
            tether_bridge_sum_f64(&floats, &mut total),
            TetherStatus::UnsupportedElementType as i32
        );
    }

    #[test]
    fn itemsize_per_dtype() {
        let mut size = 0;
        assert_eq!(tether_dtype_itemsize(0, &mut size), 0);
        assert_eq!(size, 1);
        assert_eq!(tether_dtype_itemsize(7, &mut size), 0);
        assert_eq!(size, 8);
        assert_eq!(tether_dtype_itemsize(8, &mut size), 0);
        assert_eq!(size, 4);
        assert_eq!(
            tether_dtype_itemsize(11, &mut size),
            TetherStatus::UnsupportedElementType as i32
        );
    }
}
