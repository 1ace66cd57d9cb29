//! Native vector lifecycle FFI: create, resize, element access, export.
//!
//! Vectors live in a global handle table; the table lock is held only for
//! the duration of one call. Exported descriptors point into the vector's
//! store and carry its handle and generation.

use std::sync::{Arc, Mutex};

use tether_core::{AdoptError, AllocationEpoch, BufferDescriptor, Element, ElementType, ExportBuffer, ExportBufferMut};
use tether_native::NativeVec;

use crate::handle::HandleTable;
use crate::status::TetherStatus;
use crate::types::{element_type, TetherBufferDesc};

/// A native vector of any element type.
pub(crate) enum DynVec {
    I8(NativeVec<i8>),
    I16(NativeVec<i16>),
    I32(NativeVec<i32>),
    I64(NativeVec<i64>),
    U8(NativeVec<u8>),
    U16(NativeVec<u16>),
    U32(NativeVec<u32>),
    U64(NativeVec<u64>),
    F32(NativeVec<f32>),
    F64(NativeVec<f64>),
}

macro_rules! each_vec {
    ($vec:expr, $v:ident => $body:expr) => {
        match $vec {
            DynVec::I8($v) => $body,
            DynVec::I16($v) => $body,
            DynVec::I32($v) => $body,
            DynVec::I64($v) => $body,
            DynVec::U8($v) => $body,
            DynVec::U16($v) => $body,
            DynVec::U32($v) => $body,
            DynVec::U64($v) => $body,
            DynVec::F32($v) => $body,
            DynVec::F64($v) => $body,
        }
    };
}

impl DynVec {
    fn zeros(element: ElementType, len: usize) -> Self {
        match element {
            ElementType::I8 => Self::I8(NativeVec::zeros(len)),
            ElementType::I16 => Self::I16(NativeVec::zeros(len)),
            ElementType::I32 => Self::I32(NativeVec::zeros(len)),
            ElementType::I64 => Self::I64(NativeVec::zeros(len)),
            ElementType::U8 => Self::U8(NativeVec::zeros(len)),
            ElementType::U16 => Self::U16(NativeVec::zeros(len)),
            ElementType::U32 => Self::U32(NativeVec::zeros(len)),
            ElementType::U64 => Self::U64(NativeVec::zeros(len)),
            ElementType::F32 => Self::F32(NativeVec::zeros(len)),
            ElementType::F64 => Self::F64(NativeVec::zeros(len)),
        }
    }

    pub(crate) fn element_type(&self) -> ElementType {
        fn kind<T: Element>(_: &NativeVec<T>) -> ElementType {
            T::TYPE
        }
        each_vec!(self, v => kind(v))
    }

    fn len(&self) -> usize {
        each_vec!(self, v => v.len())
    }

    fn generation(&self) -> u64 {
        each_vec!(self, v => v.generation())
    }

    pub(crate) fn epoch(&self) -> Arc<AllocationEpoch> {
        each_vec!(self, v => Arc::clone(v.epoch()))
    }

    fn resize(&mut self, len: usize) {
        each_vec!(self, v => v.resize(len, Default::default()))
    }

    fn push_f64(&mut self, value: f64) {
        each_vec!(self, v => v.push(Element::from_f64(value)))
    }

    fn get_f64(&self, index: usize) -> Result<f64, AdoptError> {
        each_vec!(self, v => v
            .get(index)
            .map(Element::to_f64)
            .ok_or(AdoptError::IndexOutOfBounds { index, len: v.len() }))
    }

    fn set_f64(&mut self, index: usize, value: f64) -> Result<(), AdoptError> {
        each_vec!(self, v => v.set(index, Element::from_f64(value)))
    }

    fn export(&mut self, readonly: bool) -> Result<BufferDescriptor, AdoptError> {
        if readonly {
            each_vec!(self, v => v.export_buffer())
        } else {
            each_vec!(self, v => v.export_buffer_mut())
        }
    }
}

static VECTORS: Mutex<HandleTable<DynVec>> = Mutex::new(HandleTable::new());

pub(crate) fn vectors() -> &'static Mutex<HandleTable<DynVec>> {
    &VECTORS
}

fn invalid_handle(handle: u64) -> i32 {
    tracing::warn!(handle, "unknown or destroyed vector handle");
    TetherStatus::InvalidHandle as i32
}

/// Create a zero-filled vector of `len` elements of `dtype`.
///
/// On success writes the new handle to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_create(dtype: i32, len: usize, out: *mut u64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let Some(element) = element_type(dtype) else {
            return TetherStatus::UnsupportedElementType as i32;
        };
        if len.checked_mul(element.itemsize()).is_none_or(|bytes| bytes > isize::MAX as usize) {
            return TetherStatus::InvalidArgument as i32;
        }
        let handle = ffi_lock!(VECTORS).insert(DynVec::zeros(element, len));
        tracing::debug!(handle, element = %element, len, "vector created");
        // SAFETY: out is non-null and valid for writes per caller contract.
        unsafe { *out = handle };
        TetherStatus::Ok as i32
    })
}

/// Destroy a vector. Descriptors and views derived from it go stale.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_destroy(handle: u64) -> i32 {
    ffi_guard!({
        let mut table = ffi_lock!(VECTORS);
        match table.remove(handle) {
            Some(_) => {
                tracing::debug!(handle, live = table.len(), "vector destroyed");
                TetherStatus::Ok as i32
            }
            None => invalid_handle(handle),
        }
    })
}

/// Write the vector's element count to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_len(handle: u64, out: *mut usize) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let len = match ffi_lock!(VECTORS).get(handle) {
            Some(v) => v.len(),
            None => return invalid_handle(handle),
        };
        // SAFETY: out is non-null and valid for writes per caller contract.
        unsafe { *out = len };
        TetherStatus::Ok as i32
    })
}

/// Write the vector's current generation to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_generation(handle: u64, out: *mut u64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let generation = match ffi_lock!(VECTORS).get(handle) {
            Some(v) => v.generation(),
            None => return invalid_handle(handle),
        };
        // SAFETY: out is non-null and valid for writes per caller contract.
        unsafe { *out = generation };
        TetherStatus::Ok as i32
    })
}

/// Resize to `len` elements, zero-filling new ones.
///
/// Invalidates every descriptor and view exported before the call.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_resize(handle: u64, len: usize) -> i32 {
    ffi_guard!({
        match ffi_lock!(VECTORS).get_mut(handle) {
            Some(v) => {
                if len.checked_mul(v.element_type().itemsize()).is_none_or(|b| b > isize::MAX as usize) {
                    return TetherStatus::InvalidArgument as i32;
                }
                v.resize(len);
                TetherStatus::Ok as i32
            }
            None => invalid_handle(handle),
        }
    })
}

/// Append `value`, converted to the vector's element type.
///
/// Invalidates every descriptor and view exported before the call.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_push_f64(handle: u64, value: f64) -> i32 {
    ffi_guard!({
        match ffi_lock!(VECTORS).get_mut(handle) {
            Some(v) => {
                v.push_f64(value);
                TetherStatus::Ok as i32
            }
            None => invalid_handle(handle),
        }
    })
}

/// Read element `index`, converted to `double`, into `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_get_f64(handle: u64, index: usize, out: *mut f64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let value = match ffi_lock!(VECTORS).get(handle) {
            Some(v) => v.get_f64(index),
            None => return invalid_handle(handle),
        };
        match value {
            Ok(value) => {
                // SAFETY: out is non-null and valid for writes per caller contract.
                unsafe { *out = value };
                TetherStatus::Ok as i32
            }
            Err(e) => TetherStatus::from(&e) as i32,
        }
    })
}

/// Write `value`, converted to the vector's element type, at `index`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_set_f64(handle: u64, index: usize, value: f64) -> i32 {
    ffi_guard!({
        match ffi_lock!(VECTORS).get_mut(handle) {
            Some(v) => match v.set_f64(index, value) {
                Ok(()) => TetherStatus::Ok as i32,
                Err(e) => TetherStatus::from(&e) as i32,
            },
            None => invalid_handle(handle),
        }
    })
}

/// Describe the vector's store without copying.
///
/// The descriptor stays valid until the vector is resized or destroyed;
/// adopting it afterwards fails with `StaleBuffer`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tether_vec_export(handle: u64, readonly: u8, out_desc: *mut TetherBufferDesc) -> i32 {
    ffi_guard!({
        if out_desc.is_null() {
            return TetherStatus::InvalidArgument as i32;
        }
        let desc = match ffi_lock!(VECTORS).get_mut(handle) {
            Some(v) => v
                .export(readonly != 0)
                .map(|d| TetherBufferDesc::from_descriptor(&d, v.element_type(), handle)),
            None => return invalid_handle(handle),
        };
        match desc {
            Ok(desc) => {
                // SAFETY: out_desc is non-null and valid for writes per caller contract.
                unsafe { *out_desc = desc };
                TetherStatus::Ok as i32
            }
            Err(e) => TetherStatus::from(&e) as i32,
        }
    })
}
