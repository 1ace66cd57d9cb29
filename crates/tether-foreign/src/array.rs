//! A numpy-like owned n-dimensional array.
//!
//! [`ForeignArray`] stands in for the foreign side of the protocol: it owns
//! its own allocation, describes itself with a shape, C-order byte strides
//! and a type string, and exports descriptors the native side can adopt.
//! Storage is a `Vec<u64>`, so the base is always 8-byte aligned and every
//! scalar kind can be read in place.
//!
//! The array never changes size after construction. `reshape` reinterprets
//! the same bytes, so its epoch only changes when it is dropped.

#![allow(unsafe_code)]

use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};
use tether_core::{
    AdoptError, AllocationEpoch, ArrayInterface, BufferDescriptor, Element, ElementLayout,
    ElementType, ExportBuffer, ExportBufferMut, Provenance, RecordLayout,
};

use crate::scalar;

const WORD: usize = mem::size_of::<u64>();

/// Dimension sizes.
pub type Shape = SmallVec<[usize; 4]>;

/// Owned, C-contiguous, n-dimensional array of scalars or records.
pub struct ForeignArray {
    storage: Vec<u64>,
    layout: ElementLayout,
    shape: Shape,
    strides: SmallVec<[isize; 4]>,
    readonly: bool,
    epoch: Arc<AllocationEpoch>,
}

fn c_strides(shape: &[usize], itemsize: usize) -> SmallVec<[isize; 4]> {
    let mut strides: SmallVec<[isize; 4]> = smallvec![0; shape.len()];
    let mut step = itemsize as isize;
    for axis in (0..shape.len()).rev() {
        strides[axis] = step;
        step *= shape[axis].max(1) as isize;
    }
    strides
}

fn checked_len(shape: &[usize], itemsize: usize) -> Result<usize, AdoptError> {
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| AdoptError::shape("array shape overflows usize"))?;
    count
        .checked_mul(itemsize)
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .ok_or_else(|| AdoptError::shape("array size overflows isize"))?;
    Ok(count)
}

impl ForeignArray {
    fn from_storage(storage: Vec<u64>, layout: ElementLayout, shape: Shape) -> Self {
        let strides = c_strides(&shape, layout.itemsize());
        Self {
            storage,
            layout,
            shape,
            strides,
            readonly: false,
            epoch: AllocationEpoch::new(),
        }
    }

    fn zeroed_storage(bytes: usize) -> Vec<u64> {
        vec![0u64; bytes.div_ceil(WORD)]
    }

    /// A one-dimensional array holding a copy of `values`.
    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        let bytes = mem::size_of_val(values);
        let mut storage = Self::zeroed_storage(bytes);
        // SAFETY: storage holds at least `bytes` bytes and does not overlap
        // `values`; every Element is plain old data.
        unsafe {
            ptr::copy_nonoverlapping(
                values.as_ptr().cast::<u8>(),
                storage.as_mut_ptr().cast::<u8>(),
                bytes,
            );
        }
        Self::from_storage(storage, ElementLayout::Scalar(T::TYPE), smallvec![values.len()])
    }

    /// A one-dimensional array holding the contents of `values`.
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        Self::from_slice(&values)
    }

    /// A zero-filled array of `element` with the given shape.
    ///
    /// An empty `shape` produces a zero-dimensional array of one element.
    pub fn zeros(element: ElementType, shape: &[usize]) -> Result<Self, AdoptError> {
        let count = checked_len(shape, element.itemsize())?;
        Ok(Self::from_storage(
            Self::zeroed_storage(count * element.itemsize()),
            ElementLayout::Scalar(element),
            Shape::from_slice(shape),
        ))
    }

    /// A one-dimensional record array, one record per row.
    ///
    /// Each row supplies one value per field, in field order, converted to
    /// the field's kind with `as` semantics. Bytes not covered by a field
    /// are zero.
    pub fn from_records<I, R>(layout: RecordLayout, rows: I) -> Result<Self, AdoptError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let rows: Vec<R> = rows.into_iter().collect();
        let itemsize = layout.itemsize();
        let count = checked_len(&[rows.len()], itemsize)?;
        let mut storage = Self::zeroed_storage(count * itemsize);
        let base = storage.as_mut_ptr().cast::<u8>();
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != layout.fields().len() {
                return Err(AdoptError::shape(format!(
                    "row {i} has {} values, record has {} fields",
                    row.len(),
                    layout.fields().len()
                )));
            }
            for (field, &value) in layout.fields().iter().zip(row) {
                // SAFETY: i < count and the layout keeps every field inside
                // its record, so the target lies inside `storage`.
                unsafe { scalar::store_f64(field.element, base.add(i * itemsize + field.offset), value) };
            }
        }
        Ok(Self::from_storage(storage, ElementLayout::Record(layout), smallvec![count]))
    }

    /// Give the same elements a new shape with the same element count.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<(), AdoptError> {
        let count = checked_len(shape, self.layout.itemsize())?;
        if count != self.len() {
            return Err(AdoptError::shape(format!(
                "cannot reshape {} elements into {:?}",
                self.len(),
                shape
            )));
        }
        self.shape = Shape::from_slice(shape);
        self.strides = c_strides(shape, self.layout.itemsize());
        Ok(())
    }

    /// Set or clear the read-only flag.
    ///
    /// Affects descriptors exported afterwards, not ones already handed out.
    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    /// Whether the array refuses writes.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Dimension sizes, outermost first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Byte strides per dimension (C order).
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element layout.
    pub fn layout(&self) -> &ElementLayout {
        &self.layout
    }

    /// Scalar kind, if the array is not a record array.
    pub fn element_type(&self) -> Option<ElementType> {
        self.layout.as_scalar()
    }

    /// Generation of the array's allocation epoch.
    pub fn generation(&self) -> u64 {
        self.epoch.current()
    }

    fn byte_offset(&self, index: &[usize]) -> Result<usize, AdoptError> {
        if index.len() != self.shape.len() {
            return Err(AdoptError::shape(format!(
                "index has {} dimensions, array has {}",
                index.len(),
                self.shape.len()
            )));
        }
        let mut offset = 0usize;
        for ((&i, &dim), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            if i >= dim {
                return Err(AdoptError::IndexOutOfBounds { index: i, len: dim });
            }
            offset += i * stride as usize;
        }
        Ok(offset)
    }

    fn scalar_type(&self) -> Result<ElementType, AdoptError> {
        self.layout
            .as_scalar()
            .ok_or_else(|| AdoptError::unsupported(self.layout.typestr()))
    }

    fn require<T: Element>(&self) -> Result<(), AdoptError> {
        if self.layout.as_scalar() == Some(T::TYPE) {
            Ok(())
        } else {
            Err(AdoptError::unsupported(format!(
                "{} (expected {})",
                self.layout.typestr(),
                T::TYPE.typestr()
            )))
        }
    }

    /// Read the element at a multi-index.
    pub fn get<T: Element>(&self, index: &[usize]) -> Result<T, AdoptError> {
        self.require::<T>()?;
        let offset = self.byte_offset(index)?;
        // SAFETY: the offset addresses an element inside `storage`.
        Ok(unsafe { self.storage.as_ptr().cast::<u8>().add(offset).cast::<T>().read() })
    }

    /// Write the element at a multi-index.
    pub fn set<T: Element>(&mut self, index: &[usize], value: T) -> Result<(), AdoptError> {
        if self.readonly {
            return Err(AdoptError::ReadOnlyViolation);
        }
        self.require::<T>()?;
        let offset = self.byte_offset(index)?;
        // SAFETY: as `get`; as_mut_ptr keeps pointers held by views valid.
        unsafe {
            self.storage
                .as_mut_ptr()
                .cast::<u8>()
                .add(offset)
                .cast::<T>()
                .write(value)
        };
        Ok(())
    }

    /// Read the element at a multi-index, converted to `f64`.
    pub fn get_f64(&self, index: &[usize]) -> Result<f64, AdoptError> {
        let kind = self.scalar_type()?;
        let offset = self.byte_offset(index)?;
        // SAFETY: the offset addresses an element of `kind` inside `storage`.
        Ok(unsafe { scalar::load_f64(kind, self.storage.as_ptr().cast::<u8>().add(offset)) })
    }

    /// Copy the elements out in C order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, AdoptError> {
        self.require::<T>()?;
        let base = self.storage.as_ptr().cast::<T>();
        // SAFETY: storage holds len() packed, aligned T values.
        Ok((0..self.len()).map(|i| unsafe { base.add(i).read() }).collect())
    }

    /// Every `step`-th element of the flattened array as a strided
    /// descriptor. Negative steps walk backwards from the last element.
    ///
    /// The descriptor is writable unless the array is read-only.
    pub fn slice_step(&mut self, step: isize) -> Result<BufferDescriptor, AdoptError> {
        let desc = if self.readonly {
            self.export_buffer()?
        } else {
            self.export_buffer_mut()?
        };
        desc.with_step(step)
    }

    /// The full n-dimensional interface with writable data. Fails if the
    /// array is read-only.
    pub fn array_interface_mut(&mut self) -> Result<ArrayInterface, AdoptError> {
        let desc = self.export_buffer_mut()?;
        Ok(self.nd_interface(&desc))
    }

    fn nd_interface(&self, desc: &BufferDescriptor) -> ArrayInterface {
        let mut iface = ArrayInterface::from_descriptor(desc);
        iface.shape = self.shape.clone();
        iface.strides = None;
        iface
    }

    /// Describe the storage at `base`, which must be the storage's own base
    /// pointer. Writable descriptors take it from `as_mut_ptr`.
    fn describe(&self, base: *mut u8, readonly: bool) -> Result<BufferDescriptor, AdoptError> {
        let provenance = Provenance::capture(&self.epoch);
        let len = self.len();
        if len == 0 {
            let empty = BufferDescriptor::empty(self.layout.clone());
            let empty = if readonly { empty.into_readonly() } else { empty };
            return Ok(empty.with_provenance(provenance));
        }
        let base = NonNull::new(base).ok_or_else(|| AdoptError::shape("array data pointer is null"))?;
        // SAFETY: the array is C-contiguous, so `len` packed elements starting
        // at the base lie inside `storage`. The provenance reports its release.
        let desc = unsafe {
            BufferDescriptor::from_raw_parts(
                base,
                self.layout.clone(),
                len,
                self.layout.itemsize() as isize,
                readonly,
            )?
        };
        Ok(desc.with_provenance(provenance))
    }
}

impl ExportBuffer for ForeignArray {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        // Read-only descriptors never write through this pointer.
        self.describe(self.storage.as_ptr().cast::<u8>().cast_mut(), true)
    }

    /// The full n-dimensional interface (shape kept, strides omitted since
    /// the array is C-contiguous). Always read-only; see
    /// [`ForeignArray::array_interface_mut`].
    fn array_interface(&self) -> Result<ArrayInterface, AdoptError> {
        let desc = self.export_buffer()?;
        Ok(self.nd_interface(&desc))
    }
}

impl ExportBufferMut for ForeignArray {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        if self.readonly {
            return Err(AdoptError::ReadOnlyViolation);
        }
        let base = self.storage.as_mut_ptr().cast::<u8>();
        self.describe(base, false)
    }
}

impl Drop for ForeignArray {
    fn drop(&mut self) {
        self.epoch.release();
    }
}

impl Clone for ForeignArray {
    /// Deep copy with a fresh allocation epoch. The copy is writable.
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            layout: self.layout.clone(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            readonly: false,
            epoch: AllocationEpoch::new(),
        }
    }
}

impl fmt::Debug for ForeignArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignArray")
            .field("typestr", &self.layout.typestr())
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("readonly", &self.readonly)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_strides_for_matrix() {
        let a = ForeignArray::zeros(ElementType::F32, &[2, 3]).unwrap();
        assert_eq!(a.strides(), &[12, 4]);
        assert_eq!(a.len(), 6);
        assert_eq!(a.ndim(), 2);
    }

    #[test]
    fn multi_index_access() {
        let mut a = ForeignArray::zeros(ElementType::I32, &[2, 2]).unwrap();
        a.set(&[1, 0], 7i32).unwrap();
        assert_eq!(a.get::<i32>(&[1, 0]).unwrap(), 7);
        assert_eq!(a.to_vec::<i32>().unwrap(), vec![0, 0, 7, 0]);
        assert_eq!(a.get_f64(&[1, 0]).unwrap(), 7.0);
        assert!(matches!(
            a.get::<i32>(&[2, 0]),
            Err(AdoptError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(matches!(a.get::<i32>(&[0]), Err(AdoptError::ShapeMismatch { .. })));
        assert!(matches!(
            a.get::<f32>(&[0, 0]),
            Err(AdoptError::UnsupportedElementType { .. })
        ));
    }

    #[test]
    fn zero_dimensional_array_has_one_element() {
        let a = ForeignArray::zeros(ElementType::U8, &[]).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a.get::<u8>(&[]).unwrap(), 0);
    }

    #[test]
    fn reshape_keeps_bytes() {
        let mut a = ForeignArray::from_vec(vec![1i64, 2, 3, 4, 5, 6]);
        a.reshape(&[3, 2]).unwrap();
        assert_eq!(a.get::<i64>(&[2, 1]).unwrap(), 6);
        assert!(a.reshape(&[4, 2]).is_err());
        assert_eq!(a.generation(), 0);
    }

    #[test]
    fn readonly_array_refuses_writes() {
        let mut a = ForeignArray::from_vec(vec![1.0f64]);
        a.set_readonly(true);
        assert_eq!(a.set(&[0], 2.0f64), Err(AdoptError::ReadOnlyViolation));
        assert_eq!(a.export_buffer_mut().unwrap_err(), AdoptError::ReadOnlyViolation);
        assert!(a.export_buffer().unwrap().is_readonly());
        assert!(a.slice_step(1).unwrap().is_readonly());
    }

    #[test]
    fn nd_interface_keeps_shape() {
        let a = ForeignArray::zeros(ElementType::F64, &[2, 3]).unwrap();
        let iface = a.array_interface().unwrap();
        assert_eq!(iface.shape.as_slice(), &[2, 3]);
        assert_eq!(iface.strides, None);
        assert_eq!(iface.typestr, ElementType::F64.typestr());
        let desc = a.export_buffer().unwrap();
        assert_eq!(desc.count(), 6);
    }

    #[test]
    fn shared_interface_is_readonly() {
        let mut a = ForeignArray::zeros(ElementType::I32, &[2, 2]).unwrap();
        assert!(a.array_interface().unwrap().readonly);

        let iface = a.array_interface_mut().unwrap();
        assert!(!iface.readonly);
        assert_eq!(iface.shape.as_slice(), &[2, 2]);
        assert_eq!(iface.data, a.array_interface().unwrap().data);

        a.set_readonly(true);
        assert_eq!(a.array_interface_mut().unwrap_err(), AdoptError::ReadOnlyViolation);
        assert!(a.array_interface().unwrap().readonly);
    }

    #[test]
    fn writable_export_addresses_live_storage() {
        let mut a = ForeignArray::from_vec(vec![1u16, 2, 3]);
        let desc = a.export_buffer_mut().unwrap();
        assert!(!desc.is_readonly());
        assert_eq!(desc.base(), a.export_buffer().unwrap().base());
        let mut view = crate::adopt::<u16>(&desc).unwrap();
        view.set(2, 30).unwrap();
        assert_eq!(a.get::<u16>(&[2]).unwrap(), 30);
    }

    #[test]
    fn records_from_rows() {
        let layout = RecordLayout::packed(&[("id", ElementType::U16), ("w", ElementType::F64)]).unwrap();
        let a = ForeignArray::from_records(layout.clone(), [[1.0, 0.5], [2.0, 1.5]]).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.element_type(), None);
        assert_eq!(a.export_buffer().unwrap().stride(), 10);
        assert!(ForeignArray::from_records(layout, [vec![1.0]]).is_err());
    }

    #[test]
    fn drop_releases_exports() {
        let desc = ForeignArray::from_vec(vec![1u32]).export_buffer().unwrap();
        assert!(desc.check_fresh().unwrap_err().is_stale());
    }

    #[test]
    fn empty_array_exports_sentinel() {
        let a = ForeignArray::from_vec(Vec::<f32>::new());
        let desc = a.export_buffer().unwrap();
        assert!(desc.is_empty());
        assert!(desc.check_fresh().is_ok());
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        assert!(ForeignArray::zeros(ElementType::F64, &[usize::MAX, 2]).is_err());
        assert!(ForeignArray::zeros(ElementType::F64, &[usize::MAX / 8]).is_err());
    }
}
