//! C-compatible element codes and buffer descriptors.

use std::ffi::c_void;
use std::ptr;

use tether_core::{BufferDescriptor, ElementType};

/// Element type code. Numerically equal to `ElementType::code`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TetherDtype {
    /// `int8_t`.
    I8 = 0,
    /// `int16_t`.
    I16 = 1,
    /// `int32_t`.
    I32 = 2,
    /// `int64_t`.
    I64 = 3,
    /// `uint8_t`.
    U8 = 4,
    /// `uint16_t`.
    U16 = 5,
    /// `uint32_t`.
    U32 = 6,
    /// `uint64_t`.
    U64 = 7,
    /// `float`.
    F32 = 8,
    /// `double`.
    F64 = 9,
}

impl From<ElementType> for TetherDtype {
    fn from(t: ElementType) -> Self {
        match t {
            ElementType::I8 => Self::I8,
            ElementType::I16 => Self::I16,
            ElementType::I32 => Self::I32,
            ElementType::I64 => Self::I64,
            ElementType::U8 => Self::U8,
            ElementType::U16 => Self::U16,
            ElementType::U32 => Self::U32,
            ElementType::U64 => Self::U64,
            ElementType::F32 => Self::F32,
            ElementType::F64 => Self::F64,
        }
    }
}

/// Decode a raw `i32` dtype code.
pub(crate) fn element_type(code: i32) -> Option<ElementType> {
    u8::try_from(code).ok().and_then(ElementType::from_code)
}

/// `owner` value for descriptors not exported by a Tether vector.
pub const TETHER_NO_OWNER: u64 = u64::MAX;

/// A buffer descriptor as seen from C.
///
/// `owner` is the handle of the exporting vector and `generation` its
/// generation at export time; adoption compares both against the live
/// vector and fails with `StaleBuffer` if it was resized or destroyed
/// since. Set `owner` to [`TETHER_NO_OWNER`] for caller-owned memory,
/// whose lifetime is then the caller's responsibility.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct TetherBufferDesc {
    /// Address of element 0. May be null only when `count == 0`.
    pub data: *mut c_void,
    /// A [`TetherDtype`] code.
    pub dtype: i32,
    /// Number of elements.
    pub count: usize,
    /// Byte distance between consecutive elements.
    pub stride: isize,
    /// Nonzero if writes are forbidden.
    pub readonly: u8,
    /// Handle of the exporting vector, or [`TETHER_NO_OWNER`].
    pub owner: u64,
    /// Generation of `owner` at export time.
    pub generation: u64,
}

impl Default for TetherBufferDesc {
    fn default() -> Self {
        Self {
            data: ptr::null_mut(),
            dtype: TetherDtype::F64 as i32,
            count: 0,
            stride: 0,
            readonly: 0,
            owner: TETHER_NO_OWNER,
            generation: 0,
        }
    }
}

impl TetherBufferDesc {
    /// Flatten a scalar descriptor exported by vector `owner`.
    pub(crate) fn from_descriptor(desc: &BufferDescriptor, element: ElementType, owner: u64) -> Self {
        Self {
            data: desc.base().as_ptr().cast(),
            dtype: TetherDtype::from(element) as i32,
            count: desc.count(),
            stride: desc.stride(),
            readonly: u8::from(desc.is_readonly()),
            owner,
            generation: desc.provenance().map_or(0, |p| p.generation()),
        }
    }
}
