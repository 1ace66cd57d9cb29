//! Vector: a native growable vector that numpy can adopt without copying.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use tether_core::{ElementType, ARRAY_INTERFACE_VERSION};
use tether_ffi::{
    tether_vec_create, tether_vec_destroy, tether_vec_export, tether_vec_generation,
    tether_vec_get_f64, tether_vec_len, tether_vec_push_f64, tether_vec_resize,
    tether_vec_set_f64, TetherBufferDesc,
};

use crate::error::check_status;

/// Parse a numpy-style dtype name (`"float64"`) or type string (`"<f8"`).
pub(crate) fn parse_dtype(dtype: &str) -> PyResult<ElementType> {
    ElementType::from_name(dtype)
        .or_else(|| ElementType::from_typestr(dtype).ok())
        .ok_or_else(|| {
            pyo3::exceptions::PyValueError::new_err(format!(
                "unsupported dtype '{dtype}'; expected one of int8..int64, uint8..uint64, float32, float64"
            ))
        })
}

/// Resolve a possibly negative Python index against `len`.
pub(crate) fn resolve_index(index: isize, len: usize) -> PyResult<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize).filter(|&i| i < len)
    };
    resolved.ok_or_else(|| {
        pyo3::exceptions::PyIndexError::new_err(format!(
            "index {index} out of range for length {len}"
        ))
    })
}

/// A native contiguous vector.
///
/// `numpy.asarray(v)` shares the vector's memory through
/// `__array_interface__`; the vector becomes the array's base and stays
/// alive as long as the array does. Any size change (`push_back`,
/// `resize`) may move the memory: arrays taken before it must be
/// re-created. Compare `generation` to detect this.
///
/// Args:
///     dtype: numpy-style name such as "float64" or "int32".
///     values: optional initial values, converted to `dtype`.
#[pyclass]
pub(crate) struct Vector {
    handle: Option<u64>,
    element: ElementType,
}

#[pymethods]
impl Vector {
    #[new]
    #[pyo3(signature = (dtype="float64", values=None))]
    fn new(py: Python<'_>, dtype: &str, values: Option<Vec<f64>>) -> PyResult<Self> {
        let element = parse_dtype(dtype)?;
        let values = values.unwrap_or_default();
        let code = i32::from(element.code());
        let len = values.len();
        // Release GIL: tether_vec_* lock the vector table.
        let (status, h) = py.detach(|| {
            let mut h: u64 = 0;
            let s = tether_vec_create(code, len, &mut h);
            if s != 0 {
                return (s, h);
            }
            for (i, &v) in values.iter().enumerate() {
                let s = tether_vec_set_f64(h, i, v);
                if s != 0 {
                    tether_vec_destroy(h);
                    return (s, h);
                }
            }
            (0, h)
        });
        check_status(status)?;
        Ok(Vector {
            handle: Some(h),
            element,
        })
    }

    /// Append a value. Invalidates arrays taken earlier.
    fn push_back(&self, py: Python<'_>, value: f64) -> PyResult<()> {
        let h = self.require_handle()?;
        check_status(py.detach(|| tether_vec_push_f64(h, value)))
    }

    /// Resize, zero-filling new elements. Invalidates arrays taken earlier.
    fn resize(&self, py: Python<'_>, len: usize) -> PyResult<()> {
        let h = self.require_handle()?;
        check_status(py.detach(|| tether_vec_resize(h, len)))
    }

    /// Number of elements.
    fn size(&self) -> PyResult<usize> {
        self.len()
    }

    fn __len__(&self) -> PyResult<usize> {
        self.len()
    }

    fn __getitem__(&self, index: isize) -> PyResult<f64> {
        let h = self.require_handle()?;
        let i = resolve_index(index, self.len()?)?;
        let mut out = 0.0;
        check_status(tether_vec_get_f64(h, i, &mut out))?;
        Ok(out)
    }

    fn __setitem__(&self, index: isize, value: f64) -> PyResult<()> {
        let h = self.require_handle()?;
        let i = resolve_index(index, self.len()?)?;
        check_status(tether_vec_set_f64(h, i, value))
    }

    /// Counter advanced on every size change.
    #[getter]
    fn generation(&self) -> PyResult<u64> {
        let h = self.require_handle()?;
        let mut out = 0;
        check_status(tether_vec_generation(h, &mut out))?;
        Ok(out)
    }

    /// numpy-style element type name.
    #[getter]
    fn dtype(&self) -> &'static str {
        self.element.name()
    }

    /// Copy the values out as a list.
    fn tolist(&self) -> PyResult<Vec<f64>> {
        (0..self.len()?)
            .map(|i| self.__getitem__(i as isize))
            .collect()
    }

    /// The array-interface record numpy uses to share this vector's memory.
    #[getter]
    fn __array_interface__<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let desc = self.export(false)?;
        let d = PyDict::new(py);
        d.set_item("data", (desc.data as usize, desc.readonly != 0))?;
        d.set_item("typestr", self.element.typestr())?;
        d.set_item("shape", (desc.count,))?;
        d.set_item("strides", py.None())?;
        d.set_item("version", ARRAY_INTERFACE_VERSION)?;
        Ok(d)
    }

    /// Explicitly destroy the vector. Arrays sharing it must not be used
    /// afterwards.
    fn destroy(&mut self, py: Python<'_>) {
        if let Some(h) = self.handle.take() {
            py.detach(|| tether_vec_destroy(h));
        }
    }

    fn __repr__(&self) -> String {
        match self.len() {
            Ok(len) => format!("Vector(dtype={}, size={len})", self.element.name()),
            Err(_) => format!("Vector(dtype={}, destroyed)", self.element.name()),
        }
    }
}

impl Vector {
    fn require_handle(&self) -> PyResult<u64> {
        self.handle
            .ok_or_else(|| pyo3::exceptions::PyRuntimeError::new_err("Vector already destroyed"))
    }

    fn len(&self) -> PyResult<usize> {
        let h = self.require_handle()?;
        let mut out = 0;
        check_status(tether_vec_len(h, &mut out))?;
        Ok(out)
    }

    /// Export a descriptor of the current store.
    pub(crate) fn export(&self, readonly: bool) -> PyResult<TetherBufferDesc> {
        let h = self.require_handle()?;
        let mut desc = TetherBufferDesc::default();
        check_status(tether_vec_export(h, u8::from(readonly), &mut desc))?;
        Ok(desc)
    }
}

impl Drop for Vector {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            tether_vec_destroy(h);
        }
    }
}
