//! Native kernels over any shareable buffer.

use numpy::PyUntypedArray;
use pyo3::prelude::*;

use tether_ffi::{tether_bridge_sum_f64, tether_dtype_itemsize, TetherBufferDesc};

use crate::error::check_status;
use crate::rvec::{ArrayParts, RVec};
use crate::vector::{parse_dtype, Vector};

/// Sum a float64 buffer with a native kernel, without copying.
///
/// Args:
///     obj: a Vector, an RVec, or a numpy array. Must hold contiguous
///         float64 values.
#[pyfunction]
pub(crate) fn sum_buffer(py: Python<'_>, obj: &Bound<'_, PyAny>) -> PyResult<f64> {
    let desc = if let Ok(v) = obj.cast::<Vector>() {
        v.borrow().export(true)?
    } else if let Ok(r) = obj.cast::<RVec>() {
        r.borrow().descriptor()
    } else if let Ok(a) = obj.cast::<PyUntypedArray>() {
        ArrayParts::of(a)?.descriptor()
    } else {
        return Err(pyo3::exceptions::PyTypeError::new_err(format!(
            "sum_buffer expects a Vector, RVec or numpy array, got {}",
            obj.get_type().name()?
        )));
    };
    let desc_addr = &desc as *const TetherBufferDesc as usize;
    // Release GIL: the kernel may run long and briefly locks the vector table.
    let (status, total) = py.detach(|| {
        let mut total = 0.0;
        let s = tether_bridge_sum_f64(desc_addr as *const TetherBufferDesc, &mut total);
        (s, total)
    });
    check_status(status)?;
    Ok(total)
}

/// Size in bytes of one element of `dtype`.
#[pyfunction]
pub(crate) fn itemsize(dtype: &str) -> PyResult<usize> {
    let element = parse_dtype(dtype)?;
    let mut out = 0;
    check_status(tether_dtype_itemsize(i32::from(element.code()), &mut out))?;
    Ok(out)
}
