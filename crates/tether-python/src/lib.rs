//! Python bindings for the Tether buffer adoption protocol.
//!
//! This crate wraps the C FFI layer (`tether-ffi`). The native extension
//! is named `_tether`:
//!
//! - `Vector(dtype, values)` is a native growable vector exposing
//!   `__array_interface__`, so `numpy.asarray(vector)` shares its memory.
//! - `as_rvec(ndarray)` adopts a numpy array without copying and returns
//!   an `RVec` that keeps the array alive.
//! - `sum_buffer(obj)` runs a native kernel over a `Vector`, an `RVec` or
//!   a float64 numpy array.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![allow(unsafe_code)]

use pyo3::prelude::*;

mod buffer;
mod error;
mod rvec;
mod vector;

/// The native `_tether` extension module.
#[pymodule]
fn _tether(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<vector::Vector>()?;
    m.add_class::<rvec::RVec>()?;

    m.add_function(wrap_pyfunction!(rvec::as_rvec, m)?)?;
    m.add_function(wrap_pyfunction!(buffer::sum_buffer, m)?)?;
    m.add_function(wrap_pyfunction!(buffer::itemsize, m)?)?;

    Ok(())
}
