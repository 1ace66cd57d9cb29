//! C FFI bindings for the Tether buffer adoption protocol.
//!
//! Native vectors and adopted views live in global slot+generation handle
//! tables; C code refers to them by `u64` handle. Descriptors cross the
//! boundary as [`TetherBufferDesc`], which carries the exporting vector's
//! handle and generation so that adoption on the other side still detects
//! resizes and destruction.
//!
//! Every entry point returns a [`TetherStatus`] code (as `i32`) and catches
//! panics.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, converting a panic into `TetherStatus::Panicked`.
macro_rules! ffi_guard {
    ($body:block) => {
        match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(status) => status,
            Err(_) => {
                ::tracing::error!("panic caught at the FFI boundary");
                $crate::status::TetherStatus::Panicked as i32
            }
        }
    };
}

/// Lock a handle table, returning `TetherStatus::InternalError` from the
/// enclosing FFI body if the mutex is poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::TetherStatus::InternalError as i32,
        }
    };
}

pub mod bridge;
mod handle;
pub mod status;
pub mod types;
pub mod vector;
pub mod view;

pub use bridge::{tether_bridge_scale_f64, tether_bridge_sum_f64, tether_dtype_itemsize};
pub use status::TetherStatus;
pub use types::{TetherBufferDesc, TetherDtype, TETHER_NO_OWNER};
pub use vector::{
    tether_vec_create, tether_vec_destroy, tether_vec_export, tether_vec_generation,
    tether_vec_get_f64, tether_vec_len, tether_vec_push_f64, tether_vec_resize,
    tether_vec_set_f64,
};
pub use view::{
    tether_view_adopt, tether_view_destroy, tether_view_get_f64, tether_view_is_stale,
    tether_view_len, tether_view_set_f64,
};
