//! Dynamically typed element loads and stores.

#![allow(unsafe_code)]

use tether_core::{Element, ElementType};

macro_rules! with_rust_type {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            ElementType::I8 => {
                type $t = i8;
                $body
            }
            ElementType::I16 => {
                type $t = i16;
                $body
            }
            ElementType::I32 => {
                type $t = i32;
                $body
            }
            ElementType::I64 => {
                type $t = i64;
                $body
            }
            ElementType::U8 => {
                type $t = u8;
                $body
            }
            ElementType::U16 => {
                type $t = u16;
                $body
            }
            ElementType::U32 => {
                type $t = u32;
                $body
            }
            ElementType::U64 => {
                type $t = u64;
                $body
            }
            ElementType::F32 => {
                type $t = f32;
                $body
            }
            ElementType::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}

/// Load one element of `kind` at `ptr` as `f64`.
///
/// # Safety
///
/// `ptr .. ptr + kind.itemsize()` must be valid for reads.
pub(crate) unsafe fn load_f64(kind: ElementType, ptr: *const u8) -> f64 {
    with_rust_type!(kind, T => ptr.cast::<T>().read_unaligned().to_f64())
}

/// Store `value` (converted with `as` semantics) as one element of `kind`.
///
/// # Safety
///
/// `ptr .. ptr + kind.itemsize()` must be valid for writes.
pub(crate) unsafe fn store_f64(kind: ElementType, ptr: *mut u8, value: f64) {
    with_rust_type!(kind, T => ptr.cast::<T>().write_unaligned(T::from_f64(value)))
}

/// Load one element of `kind` at `ptr` as `i64`.
///
/// # Safety
///
/// `ptr .. ptr + kind.itemsize()` must be valid for reads.
pub(crate) unsafe fn load_i64(kind: ElementType, ptr: *const u8) -> i64 {
    with_rust_type!(kind, T => ptr.cast::<T>().read_unaligned().to_i64())
}
