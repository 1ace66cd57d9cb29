//! The buffer descriptor: a copyable description of a shared region.
//!
//! A [`BufferDescriptor`] never owns the bytes it describes. It records the
//! base address, element layout, element count, byte stride, mutability,
//! and (optionally) the [`Provenance`] of the allocation it was captured
//! from. The span invariant (every addressed element lies inside one
//! allocation) is established by whoever constructs the descriptor, which
//! is why the raw constructors are `unsafe`.

#![allow(unsafe_code)]

use std::mem;
use std::ptr::NonNull;

use crate::dtype::{Element, ElementType};
use crate::epoch::Provenance;
use crate::error::AdoptError;
use crate::layout::ElementLayout;

/// Address, layout, count, stride, and mutability of a shared region.
#[derive(Clone, Debug)]
pub struct BufferDescriptor {
    base: NonNull<u8>,
    layout: ElementLayout,
    count: usize,
    stride: isize,
    readonly: bool,
    provenance: Option<Provenance>,
}

impl BufferDescriptor {
    /// Describe a strided region.
    ///
    /// Validates that the span `(count - 1) * |stride| + itemsize` fits in
    /// `isize`, and that a writable buffer does not alias its own elements
    /// (`|stride| >= itemsize`). Zero and overlapping strides are accepted
    /// for read-only buffers.
    ///
    /// # Safety
    ///
    /// For every `i < count`, the bytes `base + stride * i .. + itemsize`
    /// must lie inside a single live allocation for as long as the
    /// descriptor, or anything adopted from it, is used. If `readonly` is
    /// false the memory must also be writable. Attach a [`Provenance`] with
    /// [`BufferDescriptor::with_provenance`] to have moves and releases of
    /// that allocation detected instead of assumed away.
    pub unsafe fn from_raw_parts(
        base: NonNull<u8>,
        layout: ElementLayout,
        count: usize,
        stride: isize,
        readonly: bool,
    ) -> Result<Self, AdoptError> {
        let itemsize = layout.itemsize();
        if itemsize == 0 {
            return Err(AdoptError::shape("zero-sized element"));
        }
        if count > 1 {
            let step = stride.unsigned_abs();
            if step < itemsize && !readonly {
                return Err(AdoptError::shape(format!(
                    "stride {stride} overlaps {itemsize}-byte elements in a writable buffer"
                )));
            }
            (count - 1)
                .checked_mul(step)
                .and_then(|reach| reach.checked_add(itemsize))
                .filter(|&span| span <= isize::MAX as usize)
                .ok_or_else(|| AdoptError::shape("buffer span overflows isize"))?;
        }
        Ok(Self {
            base,
            layout,
            count,
            stride,
            readonly,
            provenance: None,
        })
    }

    /// Describe a contiguous run of `len` elements of `T`.
    ///
    /// # Safety
    ///
    /// `ptr .. ptr + len` must be valid for reads (and writes, unless
    /// `readonly`) for as long as the descriptor or anything adopted from
    /// it is used.
    pub unsafe fn from_slice_parts<T: Element>(ptr: NonNull<T>, len: usize, readonly: bool) -> Self {
        Self {
            base: ptr.cast(),
            layout: ElementLayout::Scalar(T::TYPE),
            count: len,
            stride: mem::size_of::<T>() as isize,
            readonly,
            provenance: None,
        }
    }

    /// A zero-length descriptor.
    ///
    /// The base is a well-aligned dangling sentinel; it is never null and
    /// never dereferenced.
    pub fn empty(layout: ElementLayout) -> Self {
        let stride = layout.itemsize() as isize;
        Self {
            base: NonNull::<u64>::dangling().cast(),
            layout,
            count: 0,
            stride,
            readonly: false,
            provenance: None,
        }
    }

    /// Attach the provenance of the allocation this descriptor points into.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Downgrade to a read-only descriptor. Upgrading is not possible.
    pub fn into_readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Base address (address of element 0).
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Element layout.
    pub fn layout(&self) -> &ElementLayout {
        &self.layout
    }

    /// Scalar kind, if the layout is scalar.
    pub fn element_type(&self) -> Option<ElementType> {
        self.layout.as_scalar()
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether the descriptor addresses no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Byte distance between consecutive elements (may be negative).
    pub fn stride(&self) -> isize {
        self.stride
    }

    /// Size of one element in bytes.
    pub fn itemsize(&self) -> usize {
        self.layout.itemsize()
    }

    /// Whether writes are forbidden.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Provenance of the originating allocation, if tracked.
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Number of bytes between the lowest and highest addressed byte.
    pub fn span_bytes(&self) -> usize {
        if self.count == 0 {
            return 0;
        }
        (self.count - 1) * self.stride.unsigned_abs() + self.itemsize()
    }

    /// Whether elements are packed back to back in ascending order.
    pub fn is_contiguous(&self) -> bool {
        self.count <= 1 || self.stride == self.itemsize() as isize
    }

    /// Fail with [`AdoptError::StaleBuffer`] if the originating allocation
    /// has moved or been released. Untracked descriptors always pass.
    pub fn check_fresh(&self) -> Result<(), AdoptError> {
        match &self.provenance {
            Some(p) => p.check(),
            None => Ok(()),
        }
    }

    /// Whether the originating allocation is known to have moved or been
    /// released.
    pub fn is_stale(&self) -> bool {
        self.provenance.as_ref().is_some_and(Provenance::is_stale)
    }

    /// Require a scalar layout of the given kind.
    pub fn require_scalar(&self, expected: ElementType) -> Result<(), AdoptError> {
        match self.layout.as_scalar() {
            Some(t) if t == expected => Ok(()),
            _ => Err(AdoptError::unsupported(format!(
                "{} (expected {})",
                self.layout.typestr(),
                expected.typestr()
            ))),
        }
    }

    /// Require packed ascending elements.
    pub fn require_contiguous(&self) -> Result<(), AdoptError> {
        if self.is_contiguous() {
            Ok(())
        } else {
            Err(AdoptError::shape(format!(
                "stride {} is not contiguous for {}-byte elements",
                self.stride,
                self.itemsize()
            )))
        }
    }

    /// Address of element `index`, bounds-checked against `count`.
    ///
    /// Does not check freshness; callers pair it with
    /// [`BufferDescriptor::check_fresh`].
    pub fn element_ptr(&self, index: usize) -> Result<*mut u8, AdoptError> {
        if index >= self.count {
            return Err(AdoptError::IndexOutOfBounds {
                index,
                len: self.count,
            });
        }
        // SAFETY: index < count and the span was validated to fit in isize
        // at construction, so the offset stays inside the described region.
        Ok(unsafe { self.base.as_ptr().offset(index as isize * self.stride) })
    }

    /// Project one field of a record buffer as a strided scalar buffer.
    ///
    /// The result shares provenance and mutability with `self`.
    pub fn field(&self, name: &str) -> Result<BufferDescriptor, AdoptError> {
        let record = self
            .layout
            .as_record()
            .ok_or_else(|| AdoptError::shape(format!("'{}' is not a record", self.layout.typestr())))?;
        let field = record
            .field(name)
            .ok_or_else(|| AdoptError::shape(format!("record has no field '{name}'")))?;
        let layout = ElementLayout::Scalar(field.element);
        if self.count == 0 {
            let mut empty = Self::empty(layout);
            empty.readonly = self.readonly;
            empty.provenance = self.provenance.clone();
            return Ok(empty);
        }
        // SAFETY: the record layout guarantees offset + field size <= record
        // size, so the field of every record lies inside that record.
        let base = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(field.offset)) };
        Ok(Self {
            base,
            layout,
            count: self.count,
            stride: self.stride,
            readonly: self.readonly,
            provenance: self.provenance.clone(),
        })
    }

    /// Every `step`-th element, starting from the first (positive step) or
    /// the last (negative step). Equivalent to `a[::step]`.
    pub fn with_step(&self, step: isize) -> Result<BufferDescriptor, AdoptError> {
        if step == 0 {
            return Err(AdoptError::shape("slice step cannot be zero"));
        }
        let mut out = self.clone();
        if self.count == 0 {
            return Ok(out);
        }
        let magnitude = step.unsigned_abs();
        out.count = self.count.div_ceil(magnitude);
        out.stride = self
            .stride
            .checked_mul(step)
            .ok_or_else(|| AdoptError::shape("slice stride overflows isize"))?;
        if step < 0 {
            let last = self.element_ptr(self.count - 1)?;
            // SAFETY: element_ptr returns an in-bounds, non-null address.
            out.base = unsafe { NonNull::new_unchecked(last) };
        }
        Ok(out)
    }
}
