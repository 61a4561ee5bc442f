//! # Relocode
//!
//! A zero-copy binary encoder/decoder for in-memory object graphs,
//! including graphs with shared substructures and reference cycles.
//!
//! ## Overview
//!
//! Relocode serializes a graph reachable from a set of root values into
//! one contiguous, relocatable byte image. Loading the image at any base
//! address requires no deserialization pass and no per-field parsing,
//! only a single relocation sweep over explicitly recorded pointer slots,
//! after which the graph is traversed through ordinary pointer
//! dereferencing. The engine is a miniature linker/loader: it builds a
//! relocatable image of a pointer-based data structure and re-bases every
//! captured pointer exactly once.
//!
//! ### Key properties
//!
//! *   **Zero-copy decode:** decode cost is O(number of pointer fixups),
//!     never O(graph size). Payload bytes are read in place.
//! *   **Sharing preservation:** two members pointing at the same source
//!     object decode to pointers at the same target address; mutations
//!     through one alias are visible through the other.
//! *   **Cycle safety:** self- and mutually-referential structures encode
//!     without non-termination, by the same identity-dedup mechanism that
//!     preserves sharing.
//! *   **Base-address independence:** the image stores relative offsets;
//!     the bytes can be persisted, transmitted, or copied anywhere before
//!     decoding.
//!
//! ## Architecture
//!
//! Encoding appends each visited value to a growable [`ByteImage`],
//! tracking three tables: pointer fixups (slots that hold relative
//! offsets until load), roots (the graph's entry points), and an
//! encode-only dedup map from source address to assigned location. The
//! fixed [`Header`](format::Header) is reserved at offset 0 first and
//! committed last, once both tables are written.
//!
//! Node types describe their own pointer/array members by implementing
//! [`CompositeElement`], a statically dispatched visitor rather than a closed
//! hierarchy. Decoding validates the header, performs the relocation
//! sweep, and exposes typed root pointers.
//!
//! ## Usage
//!
//! ```rust
//! use std::mem::offset_of;
//! use relocode::{Blit, CompositeElement, Decoder, ElementLocation, Encoder, Pool, RawSlice};
//!
//! #[repr(C)]
//! #[derive(Clone, Copy)]
//! struct Node {
//!     children: RawSlice<Node>,
//!     value: i64,
//! }
//! unsafe impl Blit for Node {}
//!
//! impl CompositeElement for Node {
//!     fn encode_members(&self, location: ElementLocation<Self>, encoder: &mut Encoder) {
//!         let children = unsafe {
//!             encoder.encode_slice_ptr_with(self.children, |encoder, child, child_location| {
//!                 encoder.encode_members(child, child_location);
//!             })
//!         };
//!         encoder.resolve_pointer_member(location, offset_of!(Node, children), children);
//!     }
//! }
//!
//! let pool = Pool::new();
//! let leaves = pool.array(vec![
//!     Node { children: RawSlice::null(), value: 2 },
//!     Node { children: RawSlice::null(), value: 3 },
//! ]);
//! let root = Node { children: leaves, value: 1 };
//!
//! let mut encoder = Encoder::new();
//! let root_location = encoder.encode_composite(&root);
//! encoder.append_root(root_location);
//! let bytes = encoder.finish();
//!
//! let decoder = Decoder::new(bytes)?;
//! let loaded: &Node = unsafe { decoder.root_ref(0) };
//! assert_eq!(loaded.value, 1);
//! assert_eq!(unsafe { loaded.children.get(1) }.value, 3);
//! # Ok::<(), relocode::RelocodeError>(())
//! ```
//!
//! ## Safety and error handling
//!
//! Encoding walks caller-supplied raw pointers and decoding reinterprets
//! raw bytes, so `unsafe` is inherent to the crate's job. It is confined
//! to the pointer-walking encoder entry points (which are `unsafe fn`
//! with documented contracts), the relocation pass, and the [`raw`] byte
//! views; everything else is safe code over those seams.
//!
//! Structural format errors surface as [`RelocodeError`] results at
//! decoder construction: a decoder either fully relocates or is never
//! created. Contract violations (overwriting outside the image, indexing
//! a missing root) fail fast with assertions.

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod composite;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod image;
pub mod location;
pub mod pool;
pub mod raw;

pub use composite::CompositeElement;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{RelocodeError, Result};
pub use format::{FORMAT_VERSION, MAX_ALIGN};
pub use image::ByteImage;
pub use location::{ArrayLocation, ElementLocation, Location, RawLocation};
pub use pool::Pool;
pub use raw::{Blit, RawSlice};
