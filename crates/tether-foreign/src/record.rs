//! Views over record (structured) buffers.

use tether_core::{
    AdoptError, BufferDescriptor, Element, ExportBuffer, ExportBufferMut, RecordField, RecordLayout,
};

use crate::any::AnyView;
use crate::view::ArrayView;

/// An adopted buffer of records whose fields are all scalar kinds.
///
/// Individual fields are reached as strided scalar views
/// (stride = record size) over the same memory.
#[derive(Clone, Debug)]
pub struct RecordView {
    desc: BufferDescriptor,
    layout: RecordLayout,
}

impl RecordView {
    pub(crate) fn from_checked(desc: BufferDescriptor, layout: RecordLayout) -> Self {
        Self { desc, layout }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.desc.count()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.desc.is_empty()
    }

    /// The record layout.
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.layout.fields().iter().map(|f| f.name.as_str())
    }

    /// Whether writes are refused.
    pub fn is_readonly(&self) -> bool {
        self.desc.is_readonly()
    }

    /// Whether the originating allocation has moved or been released.
    pub fn is_stale(&self) -> bool {
        self.desc.is_stale()
    }

    /// The adopted descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.desc
    }

    fn project(&self, name: &str) -> Result<(&RecordField, BufferDescriptor), AdoptError> {
        self.desc.check_fresh()?;
        let field = self
            .layout
            .field(name)
            .ok_or_else(|| AdoptError::shape(format!("record has no field '{name}'")))?;
        Ok((field, self.desc.field(name)?))
    }

    /// A typed view of one field.
    pub fn field<T: Element>(&self, name: &str) -> Result<ArrayView<T>, AdoptError> {
        let (_, desc) = self.project(name)?;
        desc.require_scalar(T::TYPE)?;
        Ok(ArrayView::from_checked(desc))
    }

    /// A view of one field, typed at run time.
    pub fn field_any(&self, name: &str) -> Result<AnyView, AdoptError> {
        let (field, desc) = self.project(name)?;
        Ok(AnyView::from_scalar(field.element, desc))
    }
}

impl ExportBuffer for RecordView {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        self.desc.check_fresh()?;
        Ok(self.desc.clone().into_readonly())
    }
}

impl ExportBufferMut for RecordView {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        if self.desc.is_readonly() {
            return Err(AdoptError::ReadOnlyViolation);
        }
        self.desc.check_fresh()?;
        Ok(self.desc.clone())
    }
}
