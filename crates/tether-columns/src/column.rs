//! Named, typed, contiguous columns.
//!
//! A column either owns its values in a [`NativeVec`] or adopts memory that
//! belongs to someone else (a foreign array) as an [`ExternalSlice`]. Both
//! export descriptors, so materialized and adopted columns alike can be
//! handed to views and kernels without copying.

use std::fmt;

use tether_core::{
    AdoptError, BufferDescriptor, Element, ElementType, ExportBuffer, ExportBufferMut,
};
use tether_native::{ExternalSlice, NativeVec};

/// Storage behind one column of element type `T`.
#[derive(Clone, Debug)]
pub enum ColumnBuf<T: Element> {
    /// Values owned by the column.
    Owned(NativeVec<T>),
    /// Values owned elsewhere, adopted without copying.
    Adopted(ExternalSlice<T>),
}

impl<T: Element> ColumnBuf<T> {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Owned(v) => v.len(),
            Self::Adopted(s) => s.len(),
        }
    }

    /// Whether the column has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the values live in adopted memory.
    pub fn is_adopted(&self) -> bool {
        matches!(self, Self::Adopted(_))
    }

    /// Read value `index`.
    pub fn get(&self, index: usize) -> Result<T, AdoptError> {
        match self {
            Self::Owned(v) => v.get(index).ok_or(AdoptError::IndexOutOfBounds {
                index,
                len: v.len(),
            }),
            Self::Adopted(s) => s.get(index),
        }
    }

    /// Overwrite value `index` in place.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), AdoptError> {
        match self {
            Self::Owned(v) => v.set(index, value),
            Self::Adopted(s) => s.set(index, value),
        }
    }

    /// Copy the values out.
    pub fn to_vec(&self) -> Result<Vec<T>, AdoptError> {
        match self {
            Self::Owned(v) => Ok(v.to_vec()),
            Self::Adopted(s) => s.to_vec(),
        }
    }

    /// Copy the values at `rows`, in order, into a new owned vector.
    pub fn gather(&self, rows: &[usize]) -> Result<NativeVec<T>, AdoptError> {
        rows.iter().map(|&r| self.get(r)).collect::<Result<Vec<T>, _>>().map(NativeVec::from_vec)
    }
}

impl<T: Element> ExportBuffer for ColumnBuf<T> {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        match self {
            Self::Owned(v) => v.export_buffer(),
            Self::Adopted(s) => s.export_buffer(),
        }
    }
}

impl<T: Element> ExportBufferMut for ColumnBuf<T> {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        match self {
            Self::Owned(v) => v.export_buffer_mut(),
            Self::Adopted(s) => s.export_buffer_mut(),
        }
    }
}

/// The values of one column, one variant per scalar kind.
#[derive(Clone, Debug)]
pub enum ColumnData {
    /// `i8` values.
    I8(ColumnBuf<i8>),
    /// `i16` values.
    I16(ColumnBuf<i16>),
    /// `i32` values.
    I32(ColumnBuf<i32>),
    /// `i64` values.
    I64(ColumnBuf<i64>),
    /// `u8` values.
    U8(ColumnBuf<u8>),
    /// `u16` values.
    U16(ColumnBuf<u16>),
    /// `u32` values.
    U32(ColumnBuf<u32>),
    /// `u64` values.
    U64(ColumnBuf<u64>),
    /// `f32` values.
    F32(ColumnBuf<f32>),
    /// `f64` values.
    F64(ColumnBuf<f64>),
}

/// An [`Element`] that can be stored in a [`ColumnData`].
pub trait ColumnElement: Element {
    /// Wrap a typed buffer in its `ColumnData` variant.
    fn wrap(buf: ColumnBuf<Self>) -> ColumnData;

    /// The typed buffer, if `data` holds this element type.
    fn unwrap_ref(data: &ColumnData) -> Option<&ColumnBuf<Self>>;

    /// The typed buffer, mutably, if `data` holds this element type.
    fn unwrap_mut(data: &mut ColumnData) -> Option<&mut ColumnBuf<Self>>;
}

macro_rules! impl_column_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl ColumnElement for $t {
                fn wrap(buf: ColumnBuf<Self>) -> ColumnData {
                    ColumnData::$variant(buf)
                }

                fn unwrap_ref(data: &ColumnData) -> Option<&ColumnBuf<Self>> {
                    match data {
                        ColumnData::$variant(buf) => Some(buf),
                        _ => None,
                    }
                }

                fn unwrap_mut(data: &mut ColumnData) -> Option<&mut ColumnBuf<Self>> {
                    match data {
                        ColumnData::$variant(buf) => Some(buf),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_column_element!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
);

impl ColumnData {
    /// An empty owned column of `kind`.
    pub fn empty(kind: ElementType) -> Self {
        for_kind!(kind, T => T::wrap(ColumnBuf::Owned(NativeVec::new())))
    }

    /// An owned column of `kind` holding `values` converted with `as`
    /// semantics.
    pub fn from_f64s(kind: ElementType, values: &[f64]) -> Self {
        for_kind!(kind, T => {
            let converted: NativeVec<T> = values.iter().map(|&v| T::from_f64(v)).collect();
            T::wrap(ColumnBuf::Owned(converted))
        })
    }

    /// Adopt a contiguous scalar descriptor without copying.
    pub fn adopt(desc: &BufferDescriptor) -> Result<Self, AdoptError> {
        let kind = desc
            .element_type()
            .ok_or_else(|| AdoptError::unsupported(desc.layout().typestr()))?;
        for_kind!(kind, T => Ok(T::wrap(ColumnBuf::Adopted(ExternalSlice::<T>::adopt(desc)?))))
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

    /// Number of values.
    pub fn len(&self) -> usize {
        each_column!(self, buf => buf.len())
    }

    /// Whether the column has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the values live in adopted memory.
    pub fn is_adopted(&self) -> bool {
        each_column!(self, buf => buf.is_adopted())
    }

    /// Read value `index` converted to `f64`.
    pub fn get_f64(&self, index: usize) -> Result<f64, AdoptError> {
        each_column!(self, buf => buf.get(index).map(Element::to_f64))
    }

    /// Read value `index` converted to `i64`.
    pub fn get_i64(&self, index: usize) -> Result<i64, AdoptError> {
        each_column!(self, buf => buf.get(index).map(Element::to_i64))
    }

    /// Overwrite value `index` with `value` converted with `as` semantics.
    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<(), AdoptError> {
        each_column!(self, buf => buf.set(index, Element::from_f64(value)))
    }

    /// Copy the values at `rows` into a new owned column of the same kind.
    pub fn gather(&self, rows: &[usize]) -> Result<Self, AdoptError> {
        each_column!(self, buf => buf.gather(rows).map(|v| ColumnElement::wrap(ColumnBuf::Owned(v))))
    }

    /// The typed buffer, if the column holds `T`.
    pub fn typed<T: ColumnElement>(&self) -> Option<&ColumnBuf<T>> {
        T::unwrap_ref(self)
    }
}

impl<T: ColumnElement> From<NativeVec<T>> for ColumnData {
    fn from(values: NativeVec<T>) -> Self {
        T::wrap(ColumnBuf::Owned(values))
    }
}

impl<T: ColumnElement> From<Vec<T>> for ColumnData {
    fn from(values: Vec<T>) -> Self {
        T::wrap(ColumnBuf::Owned(NativeVec::from_vec(values)))
    }
}

impl<T: ColumnElement> From<ExternalSlice<T>> for ColumnData {
    fn from(values: ExternalSlice<T>) -> Self {
        T::wrap(ColumnBuf::Adopted(values))
    }
}

impl ExportBuffer for ColumnData {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        each_column!(self, buf => buf.export_buffer())
    }
}

impl ExportBufferMut for ColumnData {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        each_column!(self, buf => buf.export_buffer_mut())
    }
}

/// A named column.
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Name `data`.
    pub fn new(name: impl Into<String>, data: impl Into<ColumnData>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The values.
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Overwrite value `index` in place. The length never changes.
    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<(), AdoptError> {
        self.data.set_f64(index, value)
    }

    /// The element kind.
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the column has no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the values.
    pub fn into_data(self) -> ColumnData {
        self.data
    }
}

impl ExportBuffer for Column {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        self.data.export_buffer()
    }
}

impl ExportBufferMut for Column {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        self.data.export_buffer_mut()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}[{}]", self.name, self.element_type(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_foreign::ForeignArray;

    #[test]
    fn from_f64s_converts_per_kind() {
        let c = ColumnData::from_f64s(ElementType::I32, &[1.9, -2.5]);
        assert_eq!(c.element_type(), ElementType::I32);
        assert_eq!(c.typed::<i32>().unwrap().to_vec().unwrap(), vec![1, -2]);
        assert!(c.typed::<f64>().is_none());
    }

    #[test]
    fn gather_copies_selected_rows() {
        let c = ColumnData::from(vec![10u16, 20, 30, 40]);
        let g = c.gather(&[3, 1]).unwrap();
        assert_eq!(g.get_i64(0).unwrap(), 40);
        assert_eq!(g.get_f64(1).unwrap(), 20.0);
        assert!(!g.is_adopted());
        assert!(c.gather(&[4]).is_err());
    }

    #[test]
    fn adopted_column_shares_foreign_memory() {
        let mut a = ForeignArray::from_vec(vec![1.0f64, 2.0]);
        let mut c = ColumnData::adopt(&a.export_buffer_mut().unwrap()).unwrap();
        assert!(c.is_adopted());
        a.set(&[1], 5.0f64).unwrap();
        assert_eq!(c.get_f64(1).unwrap(), 5.0);
        let desc = c.export_buffer_mut().unwrap();
        assert_eq!(desc.base(), a.export_buffer().unwrap().base());
    }

    #[test]
    fn set_f64_writes_in_place() {
        let mut c = Column::new("x", vec![1u8, 2, 3]);
        c.set_f64(1, 200.0).unwrap();
        assert_eq!(c.data().get_i64(1).unwrap(), 200);
        assert_eq!(c.len(), 3);
        assert!(matches!(
            c.set_f64(3, 0.0),
            Err(AdoptError::IndexOutOfBounds { index: 3, len: 3 })
        ));

        let a = ForeignArray::from_vec(vec![1.0f32]);
        let mut adopted = Column::new("a", ColumnData::adopt(&a.export_buffer().unwrap()).unwrap());
        assert_eq!(adopted.set_f64(0, 2.0), Err(AdoptError::ReadOnlyViolation));
    }

    #[test]
    fn column_display() {
        let c = Column::new("y", vec![4i64, 5, 6]);
        assert_eq!(c.to_string(), "y: int64[3]");
    }
}
