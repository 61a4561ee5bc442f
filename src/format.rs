//! The physical layout of an encoded image.
//!
//! # Layout
//!
//! ```text
//! [ Header ] [ element/array/composite regions ... ] [ Fixup Table ] [ Root Table ]
//! ```
//!
//! The header always sits at offset 0. It is reserved (zero-filled) as the
//! very first act of encoding and overwritten as the last, once the two
//! tables have been written and their locations are known. All header
//! fields are one native word; the format is native-endian and
//! single-platform by design.
//!
//! The fixup table is `fixup_count` consecutive [`RawLocation`]s, each the
//! offset of one pointer-sized slot that holds a relative byte offset
//! until relocation. The root table is `root_count` consecutive
//! [`RawLocation`]s, each the offset of one externally reachable entry
//! point.

use std::mem;

use crate::location::{ArrayLocation, RawLocation};
use crate::raw::Blit;

/// The format version written into every header. Decoding asserts exact
/// equality; there is no cross-version compatibility.
pub const FORMAT_VERSION: usize = 1;

/// The strictest alignment the image guarantees for its base address.
///
/// [`append`](crate::image::ByteImage::append) rejects alignments above
/// this, and every decoder buffer (owned or mapped) is based at an address
/// aligned to it. Together the two bounds make in-image offsets inherit
/// the natural alignment of what they point at.
pub const MAX_ALIGN: usize = 16;

/// Size of the header record in bytes.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// The fixed metadata record at offset 0.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// Format version, always [`FORMAT_VERSION`] for images this crate
    /// produces.
    pub version: usize,
    /// Number of entries in the fixup table.
    pub fixup_count: usize,
    /// Where the fixup table lives inside the image.
    pub fixup_table: ArrayLocation<RawLocation>,
    /// Number of entries in the root table.
    pub root_count: usize,
    /// Where the root table lives inside the image.
    pub root_table: ArrayLocation<RawLocation>,
}

unsafe impl Blit for Header {}
