//! Adopted view FFI: adopt a C descriptor, then read and write through it.
//!
//! A view never owns memory. If its descriptor names an owning vector, the
//! view checks that vector's generation on every access and reports
//! `StaleBuffer` once the vector is resized or destroyed.

use std::ptr::NonNull;
use std::sync::Mutex;

use tether_core::{AdoptError, BufferDescriptor, ElementLayout, Provenance};
use tether_foreign::{adopt_any, AnyView};

use crate::handle::HandleTable;
use crate::status::TetherStatus;
use crate::types::{element_type, TetherBufferDesc, TETHER_NO_OWNER};
use crate::vector::vectors;

/// An adopted view parked in the global table.
struct SendView(AnyView);

// SAFETY: the view holds a raw base pointer and a provenance. Every access
// goes through the table lock and checks the provenance first; keeping the
// memory alive and serializing access to it is the C caller's obligation,
// as for any pointer it passes in.
#[allow(unsafe_code)]
unsafe impl Send for SendView {}

static VIEWS: Mutex<HandleTable<SendView>> = Mutex::new(HandleTable::new());

/// Rebuild a Rust descriptor from its C form.
///
/// # Safety
///
/// If `owner` is [`TETHER_NO_OWNER`], `data .. data + stride * count` must
/// be valid memory of `dtype` for as long as the result is used.
#[allow(unsafe_code)]
pub(crate) unsafe fn descriptor_from_c(desc: &TetherBufferDesc) -> Result<BufferDescriptor, TetherStatus> {
    let element = element_type(desc.dtype).ok_or(TetherStatus::UnsupportedElementType)?;
    let layout = ElementLayout::Scalar(element);
    let readonly = desc.readonly != 0;

    let provenance = if desc.owner == TETHER_NO_OWNER {
        None
    } else {
        let table = vectors().lock().map_err(|_| TetherStatus::InternalError)?;
        match table.get(desc.owner) {
            Some(owner) if owner.element_type() != element => {
                return Err(TetherStatus::UnsupportedElementType);
            }
            Some(owner) => Some(Provenance::at_generation(&owner.epoch(), desc.generation)),
            None => {
                tracing::warn!(owner = desc.owner, "descriptor owner was destroyed");
                return Err(TetherStatus::StaleBuffer);
            }
        }
    };

    let built = if desc.count == 0 {
        let empty = BufferDescriptor::empty(layout);
        Ok(if readonly { empty.into_readonly() } else { empty })
    } else {
        let base = NonNull::new(desc.data.cast::<u8>()).ok_or(TetherStatus::InvalidArgument)?;
        // SAFETY: validity of the region is the caller's contract; a
        // vector-owned region is additionally guarded by the provenance.
        unsafe { BufferDescriptor::from_raw_parts(base, layout, desc.count, desc.stride, readonly) }
    };
    let built = built.map_err(|e| TetherStatus::from(&e))?;
    Ok(match provenance {
        Some(p) => built.with_provenance(p),
        None => built,
    })
}

fn invalid_handle(handle: u64) -> i32 {
    tracing::warn!(handle, "unknown or destroyed view handle");
    TetherStatus::InvalidHandle as i32
}

fn status(result: Result<(), AdoptError>) -> i32 {
    match result {
        Ok(()) => TetherStatus::Ok as i32,
        Err(e) => TetherStatus::from(&e) as i32,
    }
}

/// Adopt `desc` without copying and write the view handle to `out_view`.
///
/// Fails with `StaleBuffer` if the owning vector was resized or destroyed
/// since export.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_view_adopt(desc: *const TetherBufferDesc, out_view: *mut u64) -> i32 {
    ffi_guard!({
        if desc.is_null() || out_view.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        // SAFETY: desc is non-null and points to a valid descriptor per
        // caller contract.
        let desc = unsafe { *desc };
        // SAFETY: region validity is the caller's contract.
        let built = match unsafe { descriptor_from_c(&desc) } {
            Ok(d) => d,
            Err(status) => return status as i32,
        };
        let view = match adopt_any(&built) {
            Ok(v) => v,
            Err(e) => return TetherStatus::from(&e) as i32,
        };
        let handle = ffi_lock!(VIEWS).insert(SendView(view));
        // SAFETY: out_view is non-null and valid for writes per caller contract.
        unsafe { *out_view = handle };
        TetherStatus::Ok as i32
    })
}

/// Destroy a view. The memory it referenced is untouched.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_view_destroy(view: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(VIEWS).remove(view) {
            Some(_) => TetherStatus::Ok as i32,
            None => invalid_handle(view),
        }
    })
}

/// Write the view's element count to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_view_len(view: u64, out: *mut usize) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let len = match ffi_lock!(VIEWS).get(view) {
            Some(v) => v.0.len(),
            None => return invalid_handle(view),
        };
        // SAFETY: out is non-null and valid for writes per caller contract.
        unsafe { *out = len };
        TetherStatus::Ok as i32
    })
}

/// Write 1 to `out` if the view's source was resized or destroyed, else 0.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_view_is_stale(view: u64, out: *mut u8) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let stale = match ffi_lock!(VIEWS).get(view) {
            Some(v) => v.0.is_stale(),
            None => return invalid_handle(view),
        };
        // SAFETY: out is non-null and valid for writes per caller contract.
        unsafe { *out = u8::from(stale) };
        TetherStatus::Ok as i32
    })
}

/// Read element `index`, converted to `double`, into `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_view_get_f64(view: u64, index: usize, out: *mut f64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let value = match ffi_lock!(VIEWS).get(view) {
            Some(v) => v.0.get_f64(index),
            None => return invalid_handle(view),
        };
        status(value.map(|value| {
            // SAFETY: out is non-null and valid for writes per caller contract.
            unsafe { *out = value };
        }))
    })
}

/// Write `value`, converted to the view's element type, at `index`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_view_set_f64(view: u64, index: usize, value: f64) -> i32 {
    ffi_guard!({
        match ffi_lock!(VIEWS).get_mut(view) {
            Some(v) => status(v.0.set_f64(index, value)),
            None => invalid_handle(view),
        }
    })
}
