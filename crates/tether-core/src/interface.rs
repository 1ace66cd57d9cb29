//! The array-interface record: the in-process wire contract.
//!
//! [`ArrayInterface`] mirrors the fields of numpy's `__array_interface__`
//! (version 3): data address and read-only flag, type string, optional
//! record description, shape, optional strides. Anything that can render
//! one can be adopted by anything that can consume one.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use smallvec::{smallvec, SmallVec};

use crate::descriptor::BufferDescriptor;
use crate::dtype::ElementType;
use crate::error::AdoptError;
use crate::layout::{ElementLayout, RecordField, RecordLayout};

/// The only array-interface version this crate produces or accepts.
pub const ARRAY_INTERFACE_VERSION: u32 = 3;

/// Kind of one entry in a record description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescrKind {
    /// A scalar (or, for unnamed padding entries, a `|V<n>` void) type string.
    Typestr(String),
    /// A nested record.
    Nested(Vec<DescrField>),
}

/// One named entry in a record description (`descr`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescrField {
    /// Field name; empty for padding.
    pub name: String,
    /// Field type.
    pub kind: DescrKind,
}

/// Structural description of an n-dimensional strided array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayInterface {
    /// Address of the first element.
    pub data: usize,
    /// Whether the memory must not be written.
    pub readonly: bool,
    /// Element type string, e.g. `"<f8"` or `"|V12"`.
    pub typestr: String,
    /// Record description, present for record (`V`) element types.
    pub descr: Option<Vec<DescrField>>,
    /// Dimension sizes, outermost first.
    pub shape: SmallVec<[usize; 4]>,
    /// Byte strides per dimension; `None` means C-contiguous.
    pub strides: Option<SmallVec<[isize; 4]>>,
    /// Protocol version; always [`ARRAY_INTERFACE_VERSION`].
    pub version: u32,
}

impl ArrayInterface {
    /// Render a one-dimensional interface for a descriptor.
    pub fn from_descriptor(desc: &BufferDescriptor) -> Self {
        let descr = desc.layout().as_record().map(describe_record);
        let strides = if desc.is_contiguous() {
            None
        } else {
            Some(smallvec![desc.stride()])
        };
        Self {
            data: desc.base().as_ptr() as usize,
            readonly: desc.is_readonly(),
            typestr: desc.layout().typestr(),
            descr,
            shape: smallvec![desc.count()],
            strides,
            version: ARRAY_INTERFACE_VERSION,
        }
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements (1 for zero-dimensional arrays).
    ///
    /// Saturates at `usize::MAX` when the shape overflows; see
    /// [`ArrayInterface::checked_len`].
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    /// Total number of elements, or `ShapeMismatch` if the product of the
    /// dimensions overflows.
    pub fn checked_len(&self) -> Result<usize, AdoptError> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| AdoptError::shape(format!("shape {:?} overflows", self.shape.as_slice())))
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the element layout from `typestr` and `descr`.
    pub fn layout(&self) -> Result<ElementLayout, AdoptError> {
        if self.typestr.get(1..2) != Some("V") {
            return ElementType::from_typestr(&self.typestr).map(ElementLayout::Scalar);
        }
        let declared = void_size(&self.typestr)?;
        let descr = self
            .descr
            .as_ref()
            .ok_or_else(|| AdoptError::unsupported(self.typestr.clone()))?;
        let mut fields = Vec::new();
        flatten_descr(descr, 0, "", &mut fields)?;
        RecordLayout::new(fields, declared).map(ElementLayout::Record)
    }

    /// Whether the strides describe a C-order packed array.
    ///
    /// Dimensions of extent 1 may carry any stride.
    pub fn is_c_contiguous(&self) -> bool {
        let Some(strides) = &self.strides else {
            return true;
        };
        let Ok(layout) = self.layout() else {
            return false;
        };
        if strides.len() != self.shape.len() {
            return false;
        }
        let mut expected = layout.itemsize() as isize;
        for (&dim, &stride) in self.shape.iter().zip(strides.iter()).rev() {
            if dim != 1 && stride != expected {
                return false;
            }
            expected = expected.saturating_mul(dim as isize);
        }
        true
    }

    /// Convert to a flat one-dimensional descriptor.
    ///
    /// Zero-dimensional arrays become a single element; one-dimensional
    /// arrays keep their stride (which may be negative); higher ranks must
    /// be C-contiguous and are flattened. The result has no provenance;
    /// callers that know the owning allocation attach one.
    ///
    /// # Safety
    ///
    /// `data` must address memory that is valid, as described by `shape`
    /// and `strides`, for as long as the descriptor or anything adopted
    /// from it is used.
    pub unsafe fn to_descriptor(&self) -> Result<BufferDescriptor, AdoptError> {
        if self.version != ARRAY_INTERFACE_VERSION {
            return Err(AdoptError::shape(format!(
                "array interface version {} (expected {ARRAY_INTERFACE_VERSION})",
                self.version
            )));
        }
        let layout = self.layout()?;
        let itemsize = layout.itemsize() as isize;
        if let Some(strides) = &self.strides {
            if strides.len() != self.shape.len() {
                return Err(AdoptError::shape(format!(
                    "{} strides for {} dimensions",
                    strides.len(),
                    self.shape.len()
                )));
            }
        }
        let count = self.checked_len()?;
        if count == 0 {
            let empty = BufferDescriptor::empty(layout);
            return Ok(if self.readonly { empty.into_readonly() } else { empty });
        }
        let base = NonNull::new(self.data as *mut u8)
            .ok_or_else(|| AdoptError::shape("null data pointer for a non-empty array"))?;
        let stride = match (self.ndim(), &self.strides) {
            (0, _) | (_, None) => itemsize,
            (1, Some(s)) => s[0],
            (_, Some(_)) if self.is_c_contiguous() => itemsize,
            (ndim, Some(s)) => {
                return Err(AdoptError::shape(format!(
                    "{ndim}-dimensional array with strides {:?} is not C-contiguous",
                    s.as_slice()
                )))
            }
        };
        // SAFETY: forwarded from this function's contract.
        unsafe { BufferDescriptor::from_raw_parts(base, layout, count, stride, self.readonly) }
    }
}

fn void_size(typestr: &str) -> Result<usize, AdoptError> {
    typestr
        .get(2..)
        .filter(|_| typestr.get(1..2) == Some("V"))
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| AdoptError::unsupported(typestr))
}

fn flatten_descr(
    fields: &[DescrField],
    base: usize,
    prefix: &str,
    out: &mut Vec<RecordField>,
) -> Result<usize, AdoptError> {
    let mut offset = base;
    for field in fields {
        let name = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match &field.kind {
            DescrKind::Typestr(ts) if field.name.is_empty() => {
                offset = advance(offset, void_size(ts)?)?;
            }
            DescrKind::Typestr(ts) => {
                let element = ElementType::from_typestr(ts)?;
                out.push(RecordField {
                    name,
                    offset,
                    element,
                });
                offset = advance(offset, element.itemsize())?;
            }
            DescrKind::Nested(inner) => {
                offset = flatten_descr(inner, offset, &name, out)?;
            }
        }
    }
    Ok(offset)
}

fn advance(offset: usize, bytes: usize) -> Result<usize, AdoptError> {
    offset
        .checked_add(bytes)
        .ok_or_else(|| AdoptError::shape(format!("record offset {offset} + {bytes} overflows")))
}

fn describe_record(record: &RecordLayout) -> Vec<DescrField> {
    let mut out = Vec::with_capacity(record.fields().len());
    let mut cursor = 0usize;
    for field in record.fields() {
        if field.offset > cursor {
            out.push(padding(field.offset - cursor));
        }
        out.push(DescrField {
            name: field.name.clone(),
            kind: DescrKind::Typestr(field.element.typestr()),
        });
        cursor = cursor.max(field.offset + field.element.itemsize());
    }
    if record.itemsize() > cursor {
        out.push(padding(record.itemsize() - cursor));
    }
    out
}

fn padding(bytes: usize) -> DescrField {
    DescrField {
        name: String::new(),
        kind: DescrKind::Typestr(format!("|V{bytes}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(typestr: &str, shape: &[usize], strides: Option<&[isize]>) -> ArrayInterface {
        ArrayInterface {
            data: 0x1000,
            readonly: false,
            typestr: typestr.into(),
            descr: None,
            shape: shape.iter().copied().collect(),
            strides: strides.map(|s| s.iter().copied().collect()),
            version: ARRAY_INTERFACE_VERSION,
        }
    }

    #[test]
    fn descriptor_round_trip_keeps_fields() {
        let mut data = [1i32, 2, 3];
        let ptr = NonNull::new(data.as_mut_ptr()).unwrap();
        let desc = unsafe { BufferDescriptor::from_slice_parts(ptr, 3, true) };
        let ai = ArrayInterface::from_descriptor(&desc);
        assert_eq!(ai.typestr, ElementType::I32.typestr());
        assert_eq!(ai.shape.as_slice(), &[3]);
        assert!(ai.strides.is_none());
        assert!(ai.readonly);
        assert_eq!(ai.version, 3);

        let back = unsafe { ai.to_descriptor() }.unwrap();
        assert_eq!(back.base(), desc.base());
        assert_eq!(back.count(), 3);
        assert_eq!(back.stride(), 4);
        assert!(back.is_readonly());
    }

    #[test]
    fn strided_descriptor_exports_strides() {
        let mut data = [0.0f64; 6];
        let ptr = NonNull::new(data.as_mut_ptr()).unwrap();
        let desc = unsafe { BufferDescriptor::from_slice_parts(ptr, 6, false) }
            .with_step(2)
            .unwrap();
        let ai = ArrayInterface::from_descriptor(&desc);
        assert_eq!(ai.strides.as_deref(), Some(&[16isize][..]));
        let back = unsafe { ai.to_descriptor() }.unwrap();
        assert_eq!(back.stride(), 16);
        assert_eq!(back.count(), 3);
    }

    #[test]
    fn c_contiguous_matrix_flattens() {
        let ai = interface("<f4", &[2, 3], Some(&[12, 4]));
        assert!(ai.is_c_contiguous());
        let d = unsafe { ai.to_descriptor() }.unwrap();
        assert_eq!(d.count(), 6);
        assert_eq!(d.stride(), 4);
    }

    #[test]
    fn fortran_order_matrix_is_rejected() {
        let ai = interface("<f4", &[2, 3], Some(&[4, 8]));
        assert!(!ai.is_c_contiguous());
        assert!(matches!(
            unsafe { ai.to_descriptor() },
            Err(AdoptError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn zero_dimensional_is_one_element() {
        let ai = interface("<i8", &[], None);
        assert_eq!(ai.len(), 1);
        let d = unsafe { ai.to_descriptor() }.unwrap();
        assert_eq!(d.count(), 1);
    }

    #[test]
    fn empty_array_with_null_data_is_allowed() {
        let mut ai = interface("<f8", &[0], None);
        ai.data = 0;
        let d = unsafe { ai.to_descriptor() }.unwrap();
        assert!(d.is_empty());
        assert!(!d.base().as_ptr().is_null());
    }

    #[test]
    fn null_data_with_elements_is_rejected() {
        let mut ai = interface("<f8", &[2], None);
        ai.data = 0;
        assert!(matches!(
            unsafe { ai.to_descriptor() },
            Err(AdoptError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let ai = interface("<f8", &[usize::MAX, 2], None);
        assert!(matches!(ai.checked_len(), Err(AdoptError::ShapeMismatch { .. })));
        assert_eq!(ai.len(), usize::MAX);
        assert!(matches!(
            unsafe { ai.to_descriptor() },
            Err(AdoptError::ShapeMismatch { .. })
        ));
        assert_eq!(interface("<f8", &[3, 0, usize::MAX], None).checked_len().unwrap(), 0);
    }

    #[test]
    fn overflowing_record_offset_is_rejected() {
        let mut ai = interface(&format!("|V{}", usize::MAX), &[1], None);
        ai.descr = Some(vec![
            DescrField {
                name: String::new(),
                kind: DescrKind::Typestr(format!("|V{}", usize::MAX)),
            },
            DescrField {
                name: "x".into(),
                kind: DescrKind::Typestr("<f8".into()),
            },
        ]);
        assert!(matches!(ai.layout(), Err(AdoptError::ShapeMismatch { .. })));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut ai = interface("<f8", &[2], None);
        ai.version = 2;
        assert!(matches!(
            unsafe { ai.to_descriptor() },
            Err(AdoptError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn object_dtype_is_unsupported() {
        let ai = interface("|O", &[2], None);
        assert!(matches!(
            unsafe { ai.to_descriptor() },
            Err(AdoptError::UnsupportedElementType { .. })
        ));
    }

    #[test]
    fn record_descr_with_padding_and_nesting() {
        let mut ai = interface("|V24", &[4], None);
        ai.descr = Some(vec![
            DescrField {
                name: "x".into(),
                kind: DescrKind::Typestr("<f8".into()),
            },
            DescrField {
                name: "pos".into(),
                kind: DescrKind::Nested(vec![
                    DescrField {
                        name: "i".into(),
                        kind: DescrKind::Typestr("<i4".into()),
                    },
                    DescrField {
                        name: "j".into(),
                        kind: DescrKind::Typestr("<i4".into()),
                    },
                ]),
            },
            DescrField {
                name: String::new(),
                kind: DescrKind::Typestr("|V8".into()),
            },
        ]);
        let layout = ai.layout().unwrap();
        let record = layout.as_record().unwrap();
        assert_eq!(record.itemsize(), 24);
        assert_eq!(record.field("pos.j").unwrap().offset, 12);

        let rendered = describe_record(record);
        assert_eq!(rendered.len(), 4);
        assert_eq!(rendered[3].kind, DescrKind::Typestr("|V8".into()));
    }

    #[test]
    fn record_with_object_field_is_unsupported() {
        let mut ai = interface("|V16", &[1], None);
        ai.descr = Some(vec![
            DescrField {
                name: "x".into(),
                kind: DescrKind::Typestr("<f8".into()),
            },
            DescrField {
                name: "label".into(),
                kind: DescrKind::Typestr("|O".into()),
            },
        ]);
        assert!(matches!(
            ai.layout(),
            Err(AdoptError::UnsupportedElementType { .. })
        ));
    }

    #[test]
    fn void_without_descr_is_unsupported() {
        let ai = interface("|V8", &[1], None);
        assert!(matches!(
            ai.layout(),
            Err(AdoptError::UnsupportedElementType { .. })
        ));
    }

    #[test]
    fn mismatched_strides_rank_is_rejected() {
        let ai = interface("<f8", &[2, 2], Some(&[8]));
        assert!(matches!(
            unsafe { ai.to_descriptor() },
            Err(AdoptError::ShapeMismatch { .. })
        ));
    }
}
