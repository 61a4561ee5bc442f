//! Centralized error handling for Relocode.
//!
//! Structural problems with an encoded image (truncation, wrong format
//! version) are recoverable and surface as [`RelocodeError`] values at
//! [`Decoder`](crate::Decoder) construction. Programmer-misuse conditions
//! (overwriting outside the image, indexing a root that does not exist)
//! indicate a caller bug rather than a data problem and fail fast with an
//! assertion instead of returning an error.
//!
//! [`RelocodeError`] is `Clone`; the wrapped I/O error is stored in an
//! `Arc` to keep cloning cheap.

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Relocode operations.
pub type Result<T> = std::result::Result<T, RelocodeError>;

/// All failure conditions reported by this crate.
#[derive(Debug, Clone)]
pub enum RelocodeError {
    /// Low-level I/O failure while opening or mapping an image file.
    ///
    /// The underlying `io::Error` is wrapped in an `Arc` so the error
    /// stays `Clone`.
    Io(Arc<io::Error>),

    /// The buffer handed to the decoder is shorter than the fixed header
    /// record, so it cannot possibly hold a valid image.
    BufferTooSmall {
        /// Actual length of the supplied buffer in bytes.
        len: usize,
        /// Minimum length a valid image can have.
        required: usize,
    },

    /// The header's format version does not match the version this build
    /// supports. The format carries no cross-version compatibility; decode
    /// requires exact equality.
    VersionMismatch {
        /// Version found in the image header.
        found: usize,
        /// Version this crate encodes and decodes.
        expected: usize,
    },
}

impl fmt::Display for RelocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::BufferTooSmall { len, required } => write!(
                f,
                "Format Error: buffer of {len} bytes is smaller than the {required}-byte header"
            ),
            Self::VersionMismatch { found, expected } => write!(
                f,
                "Format Error: image version {found} does not match supported version {expected}"
            ),
        }
    }
}

impl std::error::Error for RelocodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RelocodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
