//! Typed byte-offset descriptors into an encoded image.
//!
//! A location is nothing but a byte offset; the three concrete kinds exist
//! so call sites can state *what* lives at that offset and have the
//! compiler check it. All of them are `#[repr(transparent)]` over a single
//! `usize` and therefore encodable like any other plain value (the header
//! and the fixup/root tables store them directly).

use std::fmt;
use std::marker::PhantomData;
use std::mem;

use crate::raw::Blit;

/// Common accessor for anything that names a byte offset inside an image.
pub trait Location: Copy {
    /// The byte offset into the image, relative to the buffer base.
    fn byte_offset(&self) -> usize;
}

/// An untyped byte offset.
///
/// This is the form stored in the fixup and root tables, and the form the
/// [`ByteImage`](crate::image::ByteImage) hands back before a call site
/// reinterprets it as an element or array location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawLocation {
    byte_offset: usize,
}

impl RawLocation {
    /// Creates a raw location at the given byte offset.
    pub const fn new(byte_offset: usize) -> Self {
        Self { byte_offset }
    }

    /// Erases the type tag of any location.
    pub fn of(location: impl Location) -> Self {
        Self::new(location.byte_offset())
    }
}

impl Location for RawLocation {
    fn byte_offset(&self) -> usize {
        self.byte_offset
    }
}

/// The offset of a single encoded value of type `T`.
///
/// The type parameter is a zero-size tag; the runtime representation is
/// one `usize`.
#[repr(transparent)]
pub struct ElementLocation<T> {
    byte_offset: usize,
    _tag: PhantomData<fn() -> T>,
}

impl<T> ElementLocation<T> {
    /// Creates an element location at the given byte offset.
    pub const fn new(byte_offset: usize) -> Self {
        Self {
            byte_offset,
            _tag: PhantomData,
        }
    }

    /// Tags any location as an element of type `T`.
    ///
    /// Used when a dedup-map hit or a raw reservation is known by the call
    /// site to hold a `T`.
    pub fn of(location: impl Location) -> Self {
        Self::new(location.byte_offset())
    }

    /// The location of a member of `T` at `member_offset` bytes into the
    /// element, typed as `V`.
    ///
    /// `member_offset` is expected to come from `core::mem::offset_of!`,
    /// which ties it to the field's actual `#[repr(C)]` layout.
    pub fn member<V>(&self, member_offset: usize) -> ElementLocation<V> {
        debug_assert!(member_offset + mem::size_of::<V>() <= mem::size_of::<T>());
        ElementLocation::new(self.byte_offset + member_offset)
    }
}

impl<T> Location for ElementLocation<T> {
    fn byte_offset(&self) -> usize {
        self.byte_offset
    }
}

/// The offset of a contiguous encoded sequence of `T`.
#[repr(transparent)]
pub struct ArrayLocation<T> {
    byte_offset: usize,
    _tag: PhantomData<fn() -> T>,
}

impl<T> ArrayLocation<T> {
    /// Creates an array location at the given byte offset.
    pub const fn new(byte_offset: usize) -> Self {
        Self {
            byte_offset,
            _tag: PhantomData,
        }
    }

    /// Tags any location as an array of `T`.
    pub fn of(location: impl Location) -> Self {
        Self::new(location.byte_offset())
    }

    /// The location of the `index`-th element.
    ///
    /// The stride is `size_of::<T>()`, which for `#[repr(C)]` types equals
    /// the array stride.
    pub fn element(&self, index: usize) -> ElementLocation<T> {
        ElementLocation::new(self.byte_offset + index * mem::size_of::<T>())
    }
}

impl<T> Location for ArrayLocation<T> {
    fn byte_offset(&self) -> usize {
        self.byte_offset
    }
}

// Locations are stored inside the image (header fields, fixup and root
// tables), so they are themselves encodable words.
unsafe impl Blit for RawLocation {}
unsafe impl<T> Blit for ElementLocation<T> {}
unsafe impl<T> Blit for ArrayLocation<T> {}

// Manual impls: deriving would bound them on `T`, but the tag is phantom.

impl<T> Clone for ElementLocation<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for ElementLocation<T> {}

impl<T> fmt::Debug for ElementLocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementLocation").field(&self.byte_offset).finish()
    }
}

impl<T> PartialEq for ElementLocation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.byte_offset == other.byte_offset
    }
}
impl<T> Eq for ElementLocation<T> {}

impl<T> Clone for ArrayLocation<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for ArrayLocation<T> {}

impl<T> fmt::Debug for ArrayLocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArrayLocation").field(&self.byte_offset).finish()
    }
}

impl<T> PartialEq for ArrayLocation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.byte_offset == other.byte_offset
    }
}
impl<T> Eq for ArrayLocation<T> {}
