//! Element-type-erased views.

use tether_core::{AdoptError, BufferDescriptor, Element, ElementType, ExportBuffer, ExportBufferMut};

use crate::view::ArrayView;

/// An adopted view whose element type is only known at run time.
///
/// One variant per scalar kind. Produced by
/// [`adopt_any`](crate::adopt_any) and by column materialization, where the
/// column kinds come from data rather than from the type system.
#[derive(Clone, Debug)]
pub enum AnyView {
    /// `i8` elements.
    I8(ArrayView<i8>),
    /// `i16` elements.
    I16(ArrayView<i16>),
    /// `i32` elements.
    I32(ArrayView<i32>),
    /// `i64` elements.
    I64(ArrayView<i64>),
    /// `u8` elements.
    U8(ArrayView<u8>),
    /// `u16` elements.
    U16(ArrayView<u16>),
    /// `u32` elements.
    U32(ArrayView<u32>),
    /// `u64` elements.
    U64(ArrayView<u64>),
    /// `f32` elements.
    F32(ArrayView<f32>),
    /// `f64` elements.
    F64(ArrayView<f64>),
}

macro_rules! each_view {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            AnyView::I8($v) => $body,
            AnyView::I16($v) => $body,
            AnyView::I32($v) => $body,
            AnyView::I64($v) => $body,
            AnyView::U8($v) => $body,
            AnyView::U16($v) => $body,
            AnyView::U32($v) => $body,
            AnyView::U64($v) => $body,
            AnyView::F32($v) => $body,
            AnyView::F64($v) => $body,
        }
    };
}

macro_rules! impl_from_view {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<ArrayView<$t>> for AnyView {
                fn from(view: ArrayView<$t>) -> Self {
                    AnyView::$variant(view)
                }
            }
        )*
    };
}

impl_from_view!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
);

impl AnyView {
    /// Wrap a scalar descriptor in the variant matching its kind.
    pub(crate) fn from_scalar(kind: ElementType, desc: BufferDescriptor) -> Self {
        match kind {
            ElementType::I8 => Self::I8(ArrayView::from_checked(desc)),
            ElementType::I16 => Self::I16(ArrayView::from_checked(desc)),
            ElementType::I32 => Self::I32(ArrayView::from_checked(desc)),
            ElementType::I64 => Self::I64(ArrayView::from_checked(desc)),
            ElementType::U8 => Self::U8(ArrayView::from_checked(desc)),
            ElementType::U16 => Self::U16(ArrayView::from_checked(desc)),
            ElementType::U32 => Self::U32(ArrayView::from_checked(desc)),
            ElementType::U64 => Self::U64(ArrayView::from_checked(desc)),
            ElementType::F32 => Self::F32(ArrayView::from_checked(desc)),
            ElementType::F64 => Self::F64(ArrayView::from_checked(desc)),
        }
    }

    /// The element kind.
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::I8(_) => ElementType::I8,
            Self::I16(_) => ElementType::I16,
            Self::I32(_) => ElementType::I32,
            Self::I64(_) => ElementType::I64,
            Self::U8(_) => ElementType::U8,
            Self::U16(_) => ElementType::U16,
            Self::U32(_) => ElementType::U32,
            Self::U64(_) => ElementType::U64,
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        each_view!(self, v => v.len())
    }

    /// Whether the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether writes are refused.
    pub fn is_readonly(&self) -> bool {
        each_view!(self, v => v.is_readonly())
    }

    /// Whether the originating allocation has moved or been released.
    pub fn is_stale(&self) -> bool {
        each_view!(self, v => v.is_stale())
    }

    /// The adopted descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        each_view!(self, v => v.descriptor())
    }

    /// Read element `index` converted to `f64`.
    pub fn get_f64(&self, index: usize) -> Result<f64, AdoptError> {
        each_view!(self, v => v.get(index).map(Element::to_f64))
    }

    /// Read element `index` converted to `i64`.
    pub fn get_i64(&self, index: usize) -> Result<i64, AdoptError> {
        each_view!(self, v => v.get(index).map(Element::to_i64))
    }

    /// Write `value`, converted to the element kind, at `index`.
    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<(), AdoptError> {
        each_view!(self, v => v.set(index, Element::from_f64(value)))
    }

    /// Copy the elements out, converted to `f64`.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>, AdoptError> {
        each_view!(self, v => v.iter().map(|r| r.map(Element::to_f64)).collect())
    }

    /// Recover the typed view, failing if `T` is not the element kind.
    pub fn typed<T: Element>(&self) -> Result<ArrayView<T>, AdoptError> {
        let desc = self.descriptor();
        desc.require_scalar(T::TYPE)?;
        Ok(ArrayView::from_checked(desc.clone()))
    }
}

impl ExportBuffer for AnyView {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        each_view!(self, v => v.export_buffer())
    }
}

impl ExportBufferMut for AnyView {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        each_view!(self, v => v.export_buffer_mut())
    }
}
