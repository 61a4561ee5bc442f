//! The growable byte buffer an encoding is assembled into.
//!
//! The image only ever grows by appension; the single exception is
//! [`overwrite`](ByteImage::overwrite), which replaces bytes inside a
//! region that was previously appended or reserved. That pair is the
//! general forward-reference mechanism: reserve a zero-filled slot now,
//! fill it in once its content is known (the header record is the
//! canonical user).

use crate::format::MAX_ALIGN;
use crate::location::{Location, RawLocation};

/// An owned, exclusively mutable, contiguous byte region with a logical
/// length.
#[derive(Debug, Default)]
pub struct ByteImage {
    data: Vec<u8>,
}

impl ByteImage {
    /// Creates an empty image.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Creates an empty image with room for `capacity` bytes before the
    /// first reallocation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Current logical length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pads the end of the image with zero bytes up to `alignment`, then
    /// appends `bytes`, returning where they start.
    ///
    /// Returned offsets are monotonically non-decreasing across calls.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two in `1..=MAX_ALIGN`.
    pub fn append(&mut self, bytes: &[u8], alignment: usize) -> RawLocation {
        self.pad(alignment);
        let byte_offset = self.data.len();
        self.data.extend_from_slice(bytes);
        RawLocation::new(byte_offset)
    }

    /// Appends `size` zero bytes at `alignment`, returning the slot's
    /// location so it can be filled in later with [`overwrite`].
    ///
    /// [`overwrite`]: ByteImage::overwrite
    pub fn reserve(&mut self, size: usize, alignment: usize) -> RawLocation {
        self.pad(alignment);
        let byte_offset = self.data.len();
        self.data.resize(byte_offset + size, 0);
        RawLocation::new(byte_offset)
    }

    /// Replaces exactly `bytes.len()` bytes starting at `location`.
    ///
    /// # Panics
    ///
    /// Panics if the target region does not lie entirely within the
    /// image. That means the location was not previously appended or
    /// reserved at this size, which is a caller bug.
    pub fn overwrite(&mut self, location: impl Location, bytes: &[u8]) {
        let start = location.byte_offset();
        let end = start
            .checked_add(bytes.len())
            .expect("ByteImage invariant violated: overwrite range overflows");
        assert!(
            end <= self.data.len(),
            "ByteImage invariant violated: overwrite of {}..{} exceeds image length {}",
            start,
            end,
            self.data.len()
        );
        self.data[start..end].copy_from_slice(bytes);
    }

    /// Consumes the image, handing the finished bytes to the caller.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn pad(&mut self, alignment: usize) {
        assert!(
            alignment.is_power_of_two() && alignment <= MAX_ALIGN,
            "unsupported alignment {alignment} (must be a power of two <= {MAX_ALIGN})"
        );
        let padding = (alignment - self.data.len() % alignment) % alignment;
        self.data.resize(self.data.len() + padding, 0);
    }
}
