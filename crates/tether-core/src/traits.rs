//! Capability traits for buffer export.
//!
//! These replace runtime probing for "anything exposing an array
//! interface": a type either can produce a [`BufferDescriptor`] for its
//! memory or it cannot, and the compiler knows which.

use crate::descriptor::BufferDescriptor;
use crate::error::AdoptError;
use crate::interface::ArrayInterface;

/// Produce a read-only descriptor for the current backing store.
///
/// Implemented by owning containers, non-owning slices, foreign arrays,
/// and adopted views alike. The descriptor must not be retained across a
/// size-changing mutation of the source; implementations attach a
/// provenance so that doing so is reported as
/// [`AdoptError::StaleBuffer`].
pub trait ExportBuffer {
    /// Describe the backing store without copying.
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError>;

    /// Render the backing store as an array-interface record.
    fn array_interface(&self) -> Result<ArrayInterface, AdoptError> {
        self.export_buffer()
            .map(|desc| ArrayInterface::from_descriptor(&desc))
    }
}

/// Produce a writable descriptor for the current backing store.
///
/// Taking `&mut self` proves no Rust borrow of the contents is live at
/// export time. Writes through views adopted from the result are visible
/// to the source and vice versa.
pub trait ExportBufferMut: ExportBuffer {
    /// Describe the backing store, writable, without copying.
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError>;
}

impl<T: ExportBuffer + ?Sized> ExportBuffer for &T {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        (**self).export_buffer()
    }
}

impl<T: ExportBuffer + ?Sized> ExportBuffer for &mut T {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        (**self).export_buffer()
    }
}

impl<T: ExportBufferMut + ?Sized> ExportBufferMut for &mut T {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        (**self).export_buffer_mut()
    }
}
