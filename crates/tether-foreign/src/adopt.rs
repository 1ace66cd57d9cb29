//! Adoption entry points.
//!
//! Adoption is atomic: every check runs before a view is built, so a
//! failed adoption leaves nothing aliasing the buffer.

#![allow(unsafe_code)]

use tether_core::{AdoptError, ArrayInterface, BufferDescriptor, Element, ElementLayout, ExportBuffer};

use crate::any::AnyView;
use crate::record::RecordView;
use crate::view::ArrayView;

fn check_fresh(desc: &BufferDescriptor) -> Result<(), AdoptError> {
    desc.check_fresh().inspect_err(|err| {
        tracing::warn!(
            typestr = %desc.layout().typestr(),
            count = desc.count(),
            error = %err,
            "refusing to adopt stale buffer"
        );
    })
}

/// Adopt a scalar descriptor of `T` without copying.
///
/// Fails with [`AdoptError::UnsupportedElementType`] unless the layout is
/// exactly `Scalar(T::TYPE)`, and with [`AdoptError::StaleBuffer`] if the
/// owner has already moved or been dropped.
pub fn adopt<T: Element>(desc: &BufferDescriptor) -> Result<ArrayView<T>, AdoptError> {
    desc.require_scalar(T::TYPE)?;
    check_fresh(desc)?;
    Ok(ArrayView::from_checked(desc.clone()))
}

/// Adopt a scalar descriptor of any kind.
///
/// Record layouts are rejected with [`AdoptError::UnsupportedElementType`];
/// use [`adopt_records`] for those.
pub fn adopt_any(desc: &BufferDescriptor) -> Result<AnyView, AdoptError> {
    let kind = desc
        .element_type()
        .ok_or_else(|| AdoptError::unsupported(desc.layout().typestr()))?;
    check_fresh(desc)?;
    Ok(AnyView::from_scalar(kind, desc.clone()))
}

/// Adopt a record descriptor.
pub fn adopt_records(desc: &BufferDescriptor) -> Result<RecordView, AdoptError> {
    let ElementLayout::Record(layout) = desc.layout() else {
        return Err(AdoptError::shape(format!(
            "'{}' is not a record type",
            desc.layout().typestr()
        )));
    };
    check_fresh(desc)?;
    Ok(RecordView::from_checked(desc.clone(), layout.clone()))
}

/// Export from `source` and adopt the result as `T`, read-only.
pub fn adopt_source<T: Element, S: ExportBuffer + ?Sized>(source: &S) -> Result<ArrayView<T>, AdoptError> {
    adopt(&source.export_buffer()?)
}

/// Adopt the memory an array-interface record points at.
///
/// # Safety
///
/// The record must describe live memory: `data` must address `shape`
/// elements of `typestr` at the given strides, readable (and writable
/// unless `readonly`) for as long as the view is used. No provenance is
/// attached, so moves of that memory are not detected.
pub unsafe fn adopt_interface(iface: &ArrayInterface) -> Result<AnyView, AdoptError> {
    let desc = iface.to_descriptor()?;
    adopt_any(&desc)
}
