//! Owning, growable contiguous container with generation tracking.
//!
//! [`NativeVec`] is the `std::vector` analogue of the protocol. It hands out
//! descriptors of its backing store and advances its allocation epoch on
//! every size-changing mutation. Growth may relocate the store; shrinking
//! leaves elements that views could still address but that no longer
//! belong to the container. Both are treated the same way: every
//! outstanding view goes stale.
//!
//! The container never lends out references into its store. Element
//! access copies through `Vec::as_ptr`/`Vec::as_mut_ptr`, which do not
//! materialize a reference to the whole store, so a writable view can stay
//! alive alongside reads and writes made through the container.

#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use tether_core::{
    AdoptError, AllocationEpoch, BufferDescriptor, Element, ElementLayout, ExportBuffer,
    ExportBufferMut, Provenance,
};

use crate::config::{GrowthPolicy, NativeConfig, NativeConfigError};

/// An owning contiguous container of `T` that exports zero-copy descriptors.
///
/// # Examples
///
/// ```
/// use tether_core::{AdoptError, ExportBufferMut};
/// use tether_native::NativeVec;
///
/// let mut v = NativeVec::from_vec(vec![1.0f64, 2.0, 3.0]);
/// let desc = v.export_buffer_mut().unwrap();
/// assert_eq!(desc.count(), 3);
///
/// // Growing invalidates the descriptor.
/// v.push(4.0);
/// assert!(matches!(desc.check_fresh(), Err(AdoptError::StaleBuffer { .. })));
/// ```
pub struct NativeVec<T: Element> {
    data: Vec<T>,
    epoch: Arc<AllocationEpoch>,
    growth: GrowthPolicy,
}

impl<T: Element> NativeVec<T> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create an empty container with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    /// Create an empty container from a validated configuration.
    pub fn with_config(config: &NativeConfig) -> Result<Self, NativeConfigError> {
        config.validate(T::TYPE)?;
        let mut v = Self::with_capacity(config.initial_capacity);
        v.growth = config.growth;
        Ok(v)
    }

    /// Adopt an existing `Vec` as the backing store (no copy).
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            data,
            epoch: AllocationEpoch::new(),
            growth: GrowthPolicy::default(),
        }
    }

    /// A container of `len` default (zero) elements.
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::default(); len])
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements the current allocation can hold without moving.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Growth strategy in effect.
    pub fn growth(&self) -> GrowthPolicy {
        self.growth
    }

    /// Current allocation generation.
    pub fn generation(&self) -> u64 {
        self.epoch.current()
    }

    /// The allocation epoch shared with every exported descriptor.
    pub fn epoch(&self) -> &Arc<AllocationEpoch> {
        &self.epoch
    }

    /// Read element `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.data.len() {
            return None;
        }
        // SAFETY: index < len, and as_ptr does not create a reference that
        // would invalidate pointers held by adopted views.
        Some(unsafe { self.data.as_ptr().add(index).read() })
    }

    /// Overwrite element `index` in place. Never changes the generation.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), AdoptError> {
        let len = self.data.len();
        if index >= len {
            return Err(AdoptError::IndexOutOfBounds { index, len });
        }
        // SAFETY: index < len; see `get`.
        unsafe { self.data.as_mut_ptr().add(index).write(value) };
        Ok(())
    }

    /// Append one element.
    pub fn push(&mut self, value: T) {
        if self.growth == GrowthPolicy::Exact && self.data.len() == self.data.capacity() {
            self.data.reserve_exact(1);
        }
        self.data.push(value);
        self.invalidate("push");
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        let value = self.data.pop()?;
        self.invalidate("pop");
        Some(value)
    }

    /// Append every element of `values`.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        if values.is_empty() {
            return;
        }
        if self.growth == GrowthPolicy::Exact {
            self.data.reserve_exact(values.len());
        }
        self.data.extend_from_slice(values);
        self.invalidate("extend");
    }

    /// Resize to `len`, filling new slots with `value`.
    pub fn resize(&mut self, len: usize, value: T) {
        if len == self.data.len() {
            return;
        }
        if self.growth == GrowthPolicy::Exact && len > self.data.len() {
            self.data.reserve_exact(len - self.data.len());
        }
        self.data.resize(len, value);
        self.invalidate("resize");
    }

    /// Shorten to `len` elements. No-op if already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.data.len() {
            return;
        }
        self.data.truncate(len);
        self.invalidate("truncate");
    }

    /// Remove every element, keeping the allocation.
    pub fn clear(&mut self) {
        if self.data.is_empty() {
            return;
        }
        self.data.clear();
        self.invalidate("clear");
    }

    /// Reserve room for `additional` more elements.
    ///
    /// Invalidates outstanding views only if the allocation moved.
    pub fn reserve(&mut self, additional: usize) {
        let before = self.data.as_ptr();
        self.data.reserve(additional);
        if self.data.as_ptr() != before {
            self.invalidate("reserve");
        }
    }

    /// Release unused capacity.
    ///
    /// Invalidates outstanding views only if the allocation moved.
    pub fn shrink_to_fit(&mut self) {
        let before = self.data.as_ptr();
        self.data.shrink_to_fit();
        if self.data.as_ptr() != before {
            self.invalidate("shrink_to_fit");
        }
    }

    /// Iterate over copies of the contents.
    ///
    /// Each element is read when the iterator reaches it, so writes made
    /// through an adopted view in between are observed.
    pub fn iter(&self) -> NativeVecIter<'_, T> {
        NativeVecIter { vec: self, index: 0 }
    }

    /// Copy the contents out.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Take the backing store. Outstanding views go stale.
    pub fn into_vec(mut self) -> Vec<T> {
        std::mem::take(&mut self.data)
    }

    fn invalidate(&self, reason: &'static str) {
        let generation = self.epoch.advance();
        tracing::debug!(
            element = %T::TYPE,
            len = self.data.len(),
            capacity = self.data.capacity(),
            generation,
            reason,
            "native container resized; outstanding views invalidated"
        );
    }

    /// Describe the store at `ptr`, which must be the store's own base
    /// pointer. Writable descriptors take it from `as_mut_ptr`.
    fn describe(&self, ptr: *mut T, readonly: bool) -> Result<BufferDescriptor, AdoptError> {
        let provenance = Provenance::capture(&self.epoch);
        if self.data.is_empty() {
            let empty = BufferDescriptor::empty(ElementLayout::Scalar(T::TYPE));
            let empty = if readonly { empty.into_readonly() } else { empty };
            return Ok(empty.with_provenance(provenance));
        }
        let ptr = NonNull::new(ptr).ok_or_else(|| AdoptError::shape("vector data pointer is null"))?;
        // SAFETY: ptr..ptr+len is the live, initialized part of the store.
        // The provenance reports any later move or release.
        let desc = unsafe { BufferDescriptor::from_slice_parts(ptr, self.data.len(), readonly) };
        Ok(desc.with_provenance(provenance))
    }
}

impl<T: Element> ExportBuffer for NativeVec<T> {
    fn export_buffer(&self) -> Result<BufferDescriptor, AdoptError> {
        // Read-only descriptors never write through this pointer.
        self.describe(self.data.as_ptr().cast_mut(), true)
    }
}

impl<T: Element> ExportBufferMut for NativeVec<T> {
    fn export_buffer_mut(&mut self) -> Result<BufferDescriptor, AdoptError> {
        let ptr = self.data.as_mut_ptr();
        self.describe(ptr, false)
    }
}

impl<T: Element> Drop for NativeVec<T> {
    fn drop(&mut self) {
        self.epoch.release();
    }
}

impl<T: Element> Default for NativeVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Clone for NativeVec<T> {
    /// Deep copy with a fresh allocation epoch.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            epoch: AllocationEpoch::new(),
            growth: self.growth,
        }
    }
}

impl<T: Element> PartialEq for NativeVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T: Element> fmt::Debug for NativeVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeVec")
            .field("element", &T::TYPE)
            .field("len", &self.data.len())
            .field("generation", &self.epoch.current())
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Element> From<Vec<T>> for NativeVec<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T: Element> From<&[T]> for NativeVec<T> {
    fn from(data: &[T]) -> Self {
        Self::from_vec(data.to_vec())
    }
}

impl<T: Element> FromIterator<T> for NativeVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, T: Element> IntoIterator for &'a NativeVec<T> {
    type Item = T;
    type IntoIter = NativeVecIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Copying iterator over a [`NativeVec`]. See [`NativeVec::iter`].
#[derive(Debug)]
pub struct NativeVecIter<'a, T: Element> {
    vec: &'a NativeVec<T>,
    index: usize,
}

impl<T: Element> Iterator for NativeVecIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = self.vec.get(self.index)?;
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vec.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<T: Element> ExactSizeIterator for NativeVecIter<'_, T> {}
