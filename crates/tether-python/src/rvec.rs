//! RVec: a fixed-size native view adopted from a numpy array.

use numpy::{PyUntypedArray, PyUntypedArrayMethods};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use tether_core::{ElementType, ARRAY_INTERFACE_VERSION};
use tether_ffi::{
    tether_view_adopt, tether_view_destroy, tether_view_get_f64, tether_view_is_stale,
    tether_view_len, tether_view_set_f64, TetherBufferDesc, TetherStatus, TETHER_NO_OWNER,
};

use crate::error::check_status;
use crate::vector::resolve_index;

/// The parts of a numpy array's `__array_interface__` needed to adopt it.
pub(crate) struct ArrayParts {
    pub(crate) address: usize,
    pub(crate) readonly: bool,
    pub(crate) element: ElementType,
    pub(crate) count: usize,
    pub(crate) stride: isize,
}

impl ArrayParts {
    /// Read the array interface of a numpy array.
    ///
    /// Accepts one-dimensional arrays with any stride and C-contiguous
    /// arrays of any rank, which are flattened.
    pub(crate) fn of(array: &Bound<'_, PyUntypedArray>) -> PyResult<Self> {
        let iface = array.getattr("__array_interface__")?;
        let (address, readonly): (usize, bool) = iface.get_item("data")?.extract()?;
        let typestr: String = iface.get_item("typestr")?.extract()?;
        let strides: Option<Vec<isize>> = iface.get_item("strides")?.extract()?;
        let element = ElementType::from_typestr(&typestr)
            .map_err(|_| status_error(TetherStatus::UnsupportedElementType))?;
        let itemsize = element.itemsize() as isize;

        let stride = if array.is_c_contiguous() || strides.is_none() {
            itemsize
        } else if array.ndim() == 1 {
            strides.as_deref().and_then(|s| s.first().copied()).unwrap_or(itemsize)
        } else {
            return Err(status_error(TetherStatus::ShapeMismatch));
        };
        Ok(Self {
            address,
            readonly,
            element,
            count: array.len(),
            stride,
        })
    }

    /// A C descriptor over the array's memory, with no owning vector.
    pub(crate) fn descriptor(&self) -> TetherBufferDesc {
        TetherBufferDesc {
            data: self.address as *mut _,
            dtype: i32::from(self.element.code()),
            count: self.count,
            stride: self.stride,
            readonly: u8::from(self.readonly),
            owner: TETHER_NO_OWNER,
            generation: 0,
        }
    }
}

fn status_error(status: TetherStatus) -> PyErr {
    match check_status(status as i32) {
        Err(e) => e,
        Ok(()) => pyo3::exceptions::PyRuntimeError::new_err("unexpected success status"),
    }
}

/// A native, fixed-size view over a numpy array's memory.
///
/// Writes through the view are visible in the array and vice versa. The
/// view holds a reference to the array, so the memory stays alive for as
/// long as the view does.
#[pyclass(name = "RVec")]
pub(crate) struct RVec {
    array: Py<PyUntypedArray>,
    view: Option<u64>,
    parts: ArrayParts,
}

/// Adopt a numpy array as an `RVec` without copying.
///
/// Raises ValueError if the dtype is not one of the supported numeric
/// kinds in native byte order, or if a multi-dimensional array is not
/// C-contiguous.
#[pyfunction]
pub(crate) fn as_rvec(py: Python<'_>, array: &Bound<'_, PyUntypedArray>) -> PyResult<RVec> {
    let parts = ArrayParts::of(array)?;
    let desc = parts.descriptor();
    let desc_addr = &desc as *const TetherBufferDesc as usize;
    // Release GIL: tether_view_adopt locks the view table.
    let (status, view) = py.detach(|| {
        let mut view: u64 = 0;
        let s = tether_view_adopt(desc_addr as *const TetherBufferDesc, &mut view);
        (s, view)
    });
    check_status(status)?;
    Ok(RVec {
        array: array.clone().unbind(),
        view: Some(view),
        parts,
    })
}

#[pymethods]
impl RVec {
    fn __len__(&self) -> PyResult<usize> {
        let h = self.require_view()?;
        let mut out = 0;
        check_status(tether_view_len(h, &mut out))?;
        Ok(out)
    }

    /// Number of elements.
    fn size(&self) -> PyResult<usize> {
        self.__len__()
    }

    fn __getitem__(&self, index: isize) -> PyResult<f64> {
        let h = self.require_view()?;
        let i = resolve_index(index, self.parts.count)?;
        let mut out = 0.0;
        check_status(tether_view_get_f64(h, i, &mut out))?;
        Ok(out)
    }

    fn __setitem__(&self, index: isize, value: f64) -> PyResult<()> {
        let h = self.require_view()?;
        let i = resolve_index(index, self.parts.count)?;
        check_status(tether_view_set_f64(h, i, value))
    }

    /// numpy-style element type name.
    #[getter]
    fn dtype(&self) -> &'static str {
        self.parts.element.name()
    }

    /// Whether writes are rejected.
    #[getter]
    fn readonly(&self) -> bool {
        self.parts.readonly
    }

    /// Whether the source memory is known to have moved or been released.
    #[getter]
    fn stale(&self) -> PyResult<bool> {
        let h = self.require_view()?;
        let mut out = 0u8;
        check_status(tether_view_is_stale(h, &mut out))?;
        Ok(out != 0)
    }

    /// The adopted numpy array.
    #[getter]
    fn array<'py>(&self, py: Python<'py>) -> Bound<'py, PyUntypedArray> {
        self.array.bind(py).clone()
    }

    /// Copy the values out as a list.
    fn tolist(&self) -> PyResult<Vec<f64>> {
        (0..self.parts.count)
            .map(|i| self.__getitem__(i as isize))
            .collect()
    }

    /// Re-export the adopted memory, one-dimensional.
    #[getter]
    fn __array_interface__<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        self.require_view()?;
        let d = PyDict::new(py);
        d.set_item("data", (self.parts.address, self.parts.readonly))?;
        d.set_item("typestr", self.parts.element.typestr())?;
        d.set_item("shape", (self.parts.count,))?;
        if self.parts.stride == self.parts.element.itemsize() as isize {
            d.set_item("strides", py.None())?;
        } else {
            d.set_item("strides", (self.parts.stride,))?;
        }
        d.set_item("version", ARRAY_INTERFACE_VERSION)?;
        Ok(d)
    }

    fn __repr__(&self) -> String {
        format!(
            "RVec(dtype={}, size={}, readonly={})",
            self.parts.element.name(),
            self.parts.count,
            self.parts.readonly
        )
    }
}

impl RVec {
    fn require_view(&self) -> PyResult<u64> {
        self.view
            .ok_or_else(|| pyo3::exceptions::PyRuntimeError::new_err("RVec already released"))
    }

    /// A C descriptor over the adopted memory.
    pub(crate) fn descriptor(&self) -> TetherBufferDesc {
        self.parts.descriptor()
    }
}

impl Drop for RVec {
    fn drop(&mut self) {
        if let Some(h) = self.view.take() {
            tether_view_destroy(h);
        }
    }
}
