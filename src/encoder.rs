//! The write-side engine: a single pass over the source graph that
//! produces a finished, relocatable image.
//!
//! The encoder owns the [`ByteImage`] plus three pieces of working state:
//! the fixup list (every pointer slot that needs rebasing at load), the
//! root list (the graph's entry points), and the identity dedup map
//! (source address → assigned location). The dedup map is what makes
//! shared substructures encode once and cyclic structures terminate: the
//! entry is recorded *before* recursing into the pointee's members, so a
//! cycle reached mid-recursion resolves against the in-progress location
//! instead of re-entering.
//!
//! Encoding is single-threaded and not reentrant; the encoder is a
//! move-only resource consumed by [`finish`](Encoder::finish).

use std::collections::HashMap;
use std::mem;

use crate::composite::CompositeElement;
use crate::format::{Header, FORMAT_VERSION};
use crate::image::ByteImage;
use crate::location::{ArrayLocation, ElementLocation, Location, RawLocation};
use crate::raw::{self, Blit, RawSlice};

/// The encoding engine. See the [module docs](self) for the model.
#[derive(Debug)]
pub struct Encoder {
    image: ByteImage,
    fixups: Vec<RawLocation>,
    roots: Vec<RawLocation>,
    dedup: HashMap<usize, RawLocation>,
    header_location: ElementLocation<Header>,
}

impl Encoder {
    /// Creates an encoder with an empty image. The header slot is
    /// reserved immediately, so offset 0 is always the header.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an encoder whose image starts with room for roughly
    /// `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut image = ByteImage::with_capacity(capacity);
        let header_location =
            ElementLocation::of(image.reserve(mem::size_of::<Header>(), mem::align_of::<Header>()));
        Self {
            image,
            fixups: Vec::new(),
            roots: Vec::new(),
            dedup: HashMap::new(),
            header_location,
        }
    }

    /// Current length of the image in bytes.
    pub fn len(&self) -> usize {
        self.image.len()
    }

    /// Always false: the header slot is reserved at construction.
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    // --- plain elements and arrays ---------------------------------------

    /// Appends the raw representation of `value` at its natural alignment.
    pub fn encode_element<T: Blit>(&mut self, value: &T) -> ElementLocation<T> {
        self.encode_value(value, None)
    }

    /// Overwrites a previously reserved slot with `value`.
    pub fn encode_element_at<T: Blit>(
        &mut self,
        value: &T,
        location: ElementLocation<T>,
    ) -> ElementLocation<T> {
        self.encode_value(value, Some(RawLocation::of(location)))
    }

    /// Appends `value`, then invokes `on_written` with the new location so
    /// the caller can immediately encode the value's own nested members.
    pub fn encode_element_with<T: Blit>(
        &mut self,
        value: &T,
        on_written: impl FnOnce(&mut Self, &T, ElementLocation<T>),
    ) -> ElementLocation<T> {
        let location = self.encode_value(value, None);
        on_written(self, value, location);
        location
    }

    /// Reserves a zero-filled slot sized and aligned for a `T`, to be
    /// filled in later with [`encode_element_at`](Self::encode_element_at).
    pub fn reserve_element<T: Blit>(&mut self) -> ElementLocation<T> {
        ElementLocation::of(
            self.image
                .reserve(mem::size_of::<T>(), mem::align_of::<T>()),
        )
    }

    /// Appends a contiguous sequence at the element type's natural
    /// alignment.
    pub fn encode_array<T: Blit>(&mut self, values: &[T]) -> ArrayLocation<T> {
        // A slice pointer is always valid for its own length.
        unsafe { self.encode_values(values.as_ptr(), values.len(), None) }
    }

    /// Overwrites a previously reserved array slot with `values`.
    ///
    /// `values` must have the element count the slot was reserved with.
    pub fn encode_array_at<T: Blit>(
        &mut self,
        values: &[T],
        location: ArrayLocation<T>,
    ) -> ArrayLocation<T> {
        // A slice pointer is always valid for its own length.
        unsafe { self.encode_values(values.as_ptr(), values.len(), Some(RawLocation::of(location))) }
    }

    /// Reserves a zero-filled slot for `count` elements of `T`, to be
    /// filled in later with [`encode_array_at`](Self::encode_array_at).
    pub fn reserve_array<T: Blit>(&mut self, count: usize) -> ArrayLocation<T> {
        ArrayLocation::of(
            self.image
                .reserve(count * mem::size_of::<T>(), mem::align_of::<T>()),
        )
    }

    /// Appends a sequence, invoking `on_element` once per element with
    /// that element's own location (array start + index * stride).
    pub fn encode_array_with<T: Blit>(
        &mut self,
        values: &[T],
        mut on_element: impl FnMut(&mut Self, &T, ElementLocation<T>),
    ) -> ArrayLocation<T> {
        let location = self.encode_array(values);
        for (index, value) in values.iter().enumerate() {
            on_element(self, value, location.element(index));
        }
        location
    }

    // --- deduplicating pointer encodes -----------------------------------

    /// Encodes the element `ptr` points at, deduplicated by pointer
    /// identity. Returns `None` for a null pointer, with no side effect.
    ///
    /// A repeated identity returns the cached location without
    /// re-encoding, which is what preserves aliasing in the decoded graph.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point at a live, properly aligned `T` for
    /// the duration of the call.
    pub unsafe fn encode_element_ptr<T: Blit>(
        &mut self,
        ptr: *const T,
    ) -> Option<ElementLocation<T>> {
        self.encode_element_ptr_with(ptr, |_, _, _| {})
    }

    /// Like [`encode_element_ptr`](Self::encode_element_ptr), invoking
    /// `on_written` after a fresh encode (never for a dedup hit).
    ///
    /// # Safety
    ///
    /// Same contract as [`encode_element_ptr`](Self::encode_element_ptr).
    pub unsafe fn encode_element_ptr_with<T: Blit>(
        &mut self,
        ptr: *const T,
        on_written: impl FnOnce(&mut Self, &T, ElementLocation<T>),
    ) -> Option<ElementLocation<T>> {
        if ptr.is_null() {
            return None;
        }
        if let Some(&cached) = self.dedup.get(&(ptr as usize)) {
            return Some(ElementLocation::of(cached));
        }

        let location = self.encode_value(&*ptr, None);
        // Cache before descending, or a cycle would recurse forever.
        self.dedup.insert(ptr as usize, RawLocation::of(location));
        on_written(self, &*ptr, location);

        Some(location)
    }

    /// Encodes `count` contiguous elements starting at `start`,
    /// deduplicated by the start pointer's identity. Returns `None` for a
    /// null start pointer.
    ///
    /// # Safety
    ///
    /// `start` must be null or point at `count` live, properly aligned
    /// elements for the duration of the call.
    pub unsafe fn encode_array_ptr<T: Blit>(
        &mut self,
        start: *const T,
        count: usize,
    ) -> Option<ArrayLocation<T>> {
        self.encode_array_ptr_with(start, count, |_, _, _| {})
    }

    /// Like [`encode_array_ptr`](Self::encode_array_ptr), invoking
    /// `on_element` once per element after a fresh encode.
    ///
    /// # Safety
    ///
    /// Same contract as [`encode_array_ptr`](Self::encode_array_ptr).
    pub unsafe fn encode_array_ptr_with<T: Blit>(
        &mut self,
        start: *const T,
        count: usize,
        mut on_element: impl FnMut(&mut Self, &T, ElementLocation<T>),
    ) -> Option<ArrayLocation<T>> {
        if start.is_null() {
            return None;
        }
        if let Some(&cached) = self.dedup.get(&(start as usize)) {
            return Some(ArrayLocation::of(cached));
        }

        let location = self.encode_values(start, count, None);
        // Cache before descending, or a cycle would recurse forever.
        self.dedup.insert(start as usize, RawLocation::of(location));
        for index in 0..count {
            on_element(self, &*start.add(index), location.element(index));
        }

        Some(location)
    }

    /// Convenience over [`encode_array_ptr`](Self::encode_array_ptr) for a
    /// [`RawSlice`] member.
    ///
    /// # Safety
    ///
    /// `slice` must be null or describe live, properly aligned elements.
    pub unsafe fn encode_slice_ptr<T: Blit>(
        &mut self,
        slice: RawSlice<T>,
    ) -> Option<ArrayLocation<T>> {
        self.encode_array_ptr(slice.as_ptr(), slice.len())
    }

    /// Convenience over [`encode_array_ptr_with`](Self::encode_array_ptr_with)
    /// for a [`RawSlice`] member.
    ///
    /// # Safety
    ///
    /// `slice` must be null or describe live, properly aligned elements.
    pub unsafe fn encode_slice_ptr_with<T: Blit>(
        &mut self,
        slice: RawSlice<T>,
        on_element: impl FnMut(&mut Self, &T, ElementLocation<T>),
    ) -> Option<ArrayLocation<T>> {
        self.encode_array_ptr_with(slice.as_ptr(), slice.len(), on_element)
    }

    // --- composites -------------------------------------------------------

    /// Encodes a composite node: its own fixed-size bytes first, then its
    /// pointer/array members through
    /// [`CompositeElement::encode_members`].
    pub fn encode_composite<T: CompositeElement>(&mut self, value: &T) -> ElementLocation<T> {
        let location = self.encode_value(value, None);
        value.encode_members(location, self);
        location
    }

    /// Deduplicating pointer variant of
    /// [`encode_composite`](Self::encode_composite). Returns `None` for a
    /// null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point at a live, properly aligned `T` for
    /// the duration of the call.
    pub unsafe fn encode_composite_ptr<T: CompositeElement>(
        &mut self,
        ptr: *const T,
    ) -> Option<ElementLocation<T>> {
        if ptr.is_null() {
            return None;
        }
        if let Some(&cached) = self.dedup.get(&(ptr as usize)) {
            return Some(ElementLocation::of(cached));
        }

        let location = self.encode_value(&*ptr, None);
        // Cache before descending, or a cycle would recurse forever.
        self.dedup.insert(ptr as usize, RawLocation::of(location));
        (*ptr).encode_members(location, self);

        Some(location)
    }

    /// Runs a composite's member encoding against an already encoded
    /// element, for members reached through an enclosing element rather
    /// than a fresh encode.
    pub fn encode_members<T: CompositeElement>(
        &mut self,
        value: &T,
        location: ElementLocation<T>,
    ) {
        value.encode_members(location, self);
    }

    // --- pointer resolution and roots ------------------------------------

    /// Resolves a pointer-sized slot against its pointee.
    ///
    /// With `Some(pointee)`, writes the pointee's byte offset into the
    /// slot and records the slot in the fixup table; relocation later
    /// turns the offset into a real address. With `None`, the slot keeps
    /// its captured bytes (null for an absent source pointer) and no
    /// fixup is recorded.
    pub fn resolve_pointer(&mut self, slot: impl Location, pointee: Option<impl Location>) {
        let Some(pointee) = pointee else { return };
        let slot = RawLocation::of(slot);
        self.encode_value(&pointee.byte_offset(), Some(slot));
        self.fixups.push(slot);
    }

    /// Resolves the pointer word of a member at `member_offset` bytes into
    /// the element at `owner`.
    ///
    /// `member_offset` is expected to come from `core::mem::offset_of!`.
    /// For a [`RawSlice`] member this is the member's own offset: the
    /// pointer word sits first and the length word is left as captured.
    pub fn resolve_pointer_member<T>(
        &mut self,
        owner: ElementLocation<T>,
        member_offset: usize,
        pointee: Option<impl Location>,
    ) {
        self.resolve_pointer(owner.member::<usize>(member_offset), pointee);
    }

    /// Appends an entry point to the root table. Roots are retrieved
    /// after decode by their append index.
    pub fn append_root(&mut self, location: impl Location) {
        self.roots.push(RawLocation::of(location));
    }

    // --- finalization -----------------------------------------------------

    /// Finishes the encoding: writes the fixup and root tables, commits
    /// the header into its reserved slot at offset 0, and returns the
    /// image bytes. Consumes the encoder.
    pub fn finish(mut self) -> Vec<u8> {
        let fixups = mem::take(&mut self.fixups);
        let fixup_table = self.encode_array(&fixups);
        let roots = mem::take(&mut self.roots);
        let root_table = self.encode_array(&roots);

        let header = Header {
            version: FORMAT_VERSION,
            fixup_count: fixups.len(),
            fixup_table,
            root_count: roots.len(),
            root_table,
        };
        let header_location = self.header_location;
        self.encode_element_at(&header, header_location);

        self.image.into_bytes()
    }

    // --- internals --------------------------------------------------------

    fn encode_value<T: Blit>(&mut self, value: &T, at: Option<RawLocation>) -> ElementLocation<T> {
        ElementLocation::of(self.encode_bytes(raw::bytes_of(value), mem::align_of::<T>(), at))
    }

    /// # Safety
    ///
    /// `start` must point at `count` live elements when `count > 0`.
    unsafe fn encode_values<T: Blit>(
        &mut self,
        start: *const T,
        count: usize,
        at: Option<RawLocation>,
    ) -> ArrayLocation<T> {
        let bytes = raw::bytes_of_raw(start, count);
        ArrayLocation::of(self.encode_bytes(bytes, mem::align_of::<T>(), at))
    }

    fn encode_bytes(&mut self, bytes: &[u8], alignment: usize, at: Option<RawLocation>) -> RawLocation {
        match at {
            Some(location) => {
                self.image.overwrite(location, bytes);
                location
            }
            None => self.image.append(bytes, alignment),
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
