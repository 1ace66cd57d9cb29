//! TetherStatus -> Python exception mapping with recovery hints.

use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::PyResult;
use tether_ffi::TetherStatus;

/// Check an FFI status code. Returns `Ok(())` on success, raises a typed
/// Python exception with a recovery hint on error.
pub(crate) fn check_status(code: i32) -> PyResult<()> {
    if code == 0 {
        return Ok(());
    }
    let status = TetherStatus::from_code(code);
    let full = format!(
        "tether error {code}: {}\n  Hint: {}",
        status.describe(),
        hint(status)
    );
    match status {
        TetherStatus::InvalidArgument
        | TetherStatus::UnsupportedElementType
        | TetherStatus::ShapeMismatch
        | TetherStatus::ReadOnlyViolation => Err(PyValueError::new_err(full)),
        TetherStatus::IndexOutOfBounds => Err(PyIndexError::new_err(full)),
        _ => Err(PyRuntimeError::new_err(full)),
    }
}

fn hint(status: TetherStatus) -> &'static str {
    match status {
        TetherStatus::Ok => "no action needed.",
        TetherStatus::InvalidHandle => {
            "The Vector or RVec has been destroyed. Don't call .destroy() \
             and then continue using the object."
        }
        TetherStatus::InvalidArgument => {
            "An argument is out of range. Check lengths and that buffers are \
             not null."
        }
        TetherStatus::UnsupportedElementType => {
            "Only int8..int64, uint8..uint64, float32 and float64 in native \
             byte order can be shared. Convert with arr.astype(...) first \
             (this copies)."
        }
        TetherStatus::ShapeMismatch => {
            "The array must be one-dimensional or C-contiguous, with packed \
             elements for native kernels. Use numpy.ascontiguousarray(arr) \
             (this copies)."
        }
        TetherStatus::StaleBuffer => {
            "The source vector was resized or destroyed after this view was \
             created. Call push_back/resize before taking views, and re-adopt \
             (numpy.asarray(vector)) after any size change."
        }
        TetherStatus::ReadOnlyViolation => {
            "The buffer was shared read-only. Set arr.flags.writeable = True \
             on an array you own, or copy it."
        }
        TetherStatus::IndexOutOfBounds => "Index past the end of the buffer.",
        TetherStatus::InternalError => {
            "A previous operation panicked and left the handle table poisoned. \
             Restart the interpreter."
        }
        TetherStatus::Panicked => {
            "A Rust panic was caught at the FFI boundary. This is a bug; \
             please report it with a reproducer."
        }
    }
}
