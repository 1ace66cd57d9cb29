//! Element layouts: a scalar kind, or a record of scalar kinds.

use crate::dtype::ElementType;
use crate::error::AdoptError;

/// One scalar field inside a record element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordField {
    /// Field name (nested records are flattened as `outer.inner`).
    pub name: String,
    /// Byte offset of the field within one record.
    pub offset: usize,
    /// Scalar kind of the field.
    pub element: ElementType,
}

/// Layout of a record element whose fields are all scalar kinds.
///
/// Fields are kept in declaration order. Construction validates that every
/// field lies inside the record and that names are unique; it does not
/// require fields to be non-overlapping or gap-free.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLayout {
    fields: Vec<RecordField>,
    itemsize: usize,
}

impl RecordLayout {
    /// Build a record layout from explicit fields and a total item size.
    pub fn new(fields: Vec<RecordField>, itemsize: usize) -> Result<Self, AdoptError> {
        if fields.is_empty() {
            return Err(AdoptError::unsupported(format!("|V{itemsize}")));
        }
        for (i, field) in fields.iter().enumerate() {
            let end = field
                .offset
                .checked_add(field.element.itemsize())
                .ok_or_else(|| AdoptError::shape("record field offset overflows"))?;
            if end > itemsize {
                return Err(AdoptError::shape(format!(
                    "record field '{}' ends at byte {end}, record is {itemsize} bytes",
                    field.name
                )));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(AdoptError::shape(format!(
                    "duplicate record field '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields, itemsize })
    }

    /// Build a packed (no padding) record from `(name, kind)` pairs.
    pub fn packed(fields: &[(&str, ElementType)]) -> Result<Self, AdoptError> {
        let mut offset = 0usize;
        let mut out = Vec::with_capacity(fields.len());
        for (name, element) in fields {
            out.push(RecordField {
                name: (*name).to_string(),
                offset,
                element: *element,
            });
            offset += element.itemsize();
        }
        Self::new(out, offset)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Size of one record in bytes.
    pub fn itemsize(&self) -> usize {
        self.itemsize
    }
}

/// What one element of a buffer is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementLayout {
    /// A single scalar of the given kind.
    Scalar(ElementType),
    /// A record whose every field is a scalar kind.
    Record(RecordLayout),
}

impl ElementLayout {
    /// Size of one element in bytes.
    pub fn itemsize(&self) -> usize {
        match self {
            Self::Scalar(t) => t.itemsize(),
            Self::Record(r) => r.itemsize(),
        }
    }

    /// The scalar kind, if this is a scalar layout.
    pub fn as_scalar(&self) -> Option<ElementType> {
        match self {
            Self::Scalar(t) => Some(*t),
            Self::Record(_) => None,
        }
    }

    /// The record layout, if this is a record layout.
    pub fn as_record(&self) -> Option<&RecordLayout> {
        match self {
            Self::Scalar(_) => None,
            Self::Record(r) => Some(r),
        }
    }

    /// Array-interface type string (`|V<n>` for records).
    pub fn typestr(&self) -> String {
        match self {
            Self::Scalar(t) => t.typestr(),
            Self::Record(r) => format!("|V{}", r.itemsize()),
        }
    }
}

impl From<ElementType> for ElementLayout {
    fn from(t: ElementType) -> Self {
        Self::Scalar(t)
    }
}
