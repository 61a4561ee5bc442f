//! The read-side engine: header validation, the one-shot relocation pass,
//! and typed root access.
//!
//! Construction consumes a finished image, either as an in-memory byte
//! buffer ([`Decoder::new`]) or as a copy-on-write memory-mapped file
//! ([`Decoder::open`]). Both paths validate the header, then walk the
//! fixup table exactly once, rewriting every recorded pointer slot from a
//! relative byte offset to a real address. Cost is O(number of fixups),
//! never O(graph size); after construction the graph is reached through
//! ordinary pointer dereferencing.
//!
//! Pointers handed out by [`root_ptr`](Decoder::root_ptr) borrow the
//! decoder's buffer and are only valid while the decoder is alive.
//! Dereferencing one after the decoder is dropped is a use-after-free the
//! caller must avoid.

use std::alloc::{self, Layout};
use std::fs::File;
use std::path::Path;
use std::ptr::{self, NonNull};

use memmap2::{MmapMut, MmapOptions};

use crate::error::{RelocodeError, Result};
use crate::format::{Header, FORMAT_VERSION, HEADER_SIZE, MAX_ALIGN};
use crate::location::{Location, RawLocation};

/// The decoding engine. Exclusively owns its backing buffer for its
/// lifetime and releases it on drop.
#[derive(Debug)]
pub struct Decoder {
    storage: Storage,
    header: Header,
}

/// Where the decoded image lives.
#[derive(Debug)]
enum Storage {
    /// A heap allocation aligned to [`MAX_ALIGN`], copied from the
    /// caller's bytes. The allocation address is stable under moves of
    /// the decoder.
    Owned(AlignedBuf),
    /// A private copy-on-write file mapping. Relocation dirties private
    /// pages; the file on disk is never modified. Page alignment
    /// satisfies [`MAX_ALIGN`].
    Mapped(MmapMut),
}

impl Storage {
    fn base(&self) -> *mut u8 {
        match self {
            Self::Owned(buf) => buf.as_mut_ptr(),
            Self::Mapped(mmap) => mmap.as_ptr().cast_mut(),
        }
    }
}

impl Decoder {
    /// Decodes an in-memory image, consuming the bytes.
    ///
    /// The bytes are copied into an allocation aligned to [`MAX_ALIGN`],
    /// so the caller's buffer alignment does not matter and relocation is
    /// independent of any address captured at encode time.
    ///
    /// # Errors
    ///
    /// [`RelocodeError::BufferTooSmall`] if the buffer cannot hold a
    /// header; [`RelocodeError::VersionMismatch`] if the header's version
    /// is not [`FORMAT_VERSION`]. No partially valid decoder is ever
    /// produced.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(RelocodeError::BufferTooSmall {
                len: bytes.len(),
                required: HEADER_SIZE,
            });
        }
        Self::from_storage(Storage::Owned(AlignedBuf::copy_from(&bytes)))
    }

    /// Decodes an image file through a private copy-on-write mapping.
    ///
    /// The relocation pass writes only to private pages; reopening the
    /// file later observes the original encoded bytes.
    ///
    /// # Errors
    ///
    /// [`RelocodeError::Io`] for open/map failures, plus the structural
    /// errors of [`Decoder::new`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < HEADER_SIZE as u64 {
            return Err(RelocodeError::BufferTooSmall {
                len: file_len as usize,
                required: HEADER_SIZE,
            });
        }

        // Safety: mapping a file is unsound if another process truncates
        // it mid-read; the mapping is private (copy-on-write), so the
        // usual mmap caveat is accepted and our writes never reach disk.
        let mmap = unsafe { MmapOptions::new().map_copy(&file)? };
        Self::from_storage(Storage::Mapped(mmap))
    }

    fn from_storage(storage: Storage) -> Result<Self> {
        let base = storage.base();

        // Offset 0 is the header; base alignment >= MAX_ALIGN covers its
        // natural alignment.
        let header = unsafe { ptr::read(base.cast::<Header>()) };
        if header.version != FORMAT_VERSION {
            return Err(RelocodeError::VersionMismatch {
                found: header.version,
                expected: FORMAT_VERSION,
            });
        }

        // Relocation: every fixup slot currently holds a relative byte
        // offset; adding the base address turns it into a real pointer.
        // Runs exactly once, before any pointer is handed out.
        unsafe {
            let table = base.add(header.fixup_table.byte_offset()).cast::<RawLocation>();
            for index in 0..header.fixup_count {
                let entry = ptr::read(table.add(index));
                let slot = base.add(entry.byte_offset()).cast::<usize>();
                *slot += base as usize;
            }
        }

        Ok(Self { storage, header })
    }

    /// Number of roots recorded at encode time.
    pub fn root_count(&self) -> usize {
        self.header.root_count
    }

    /// A typed pointer to the root at `index`, in append order.
    ///
    /// The pointer is dereferenceable (modulo the caller supplying the
    /// type the root was encoded as) and valid for the decoder's
    /// lifetime.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; asking for a root that was
    /// never appended is a caller bug.
    pub fn root_ptr<T>(&self, index: usize) -> *mut T {
        assert!(
            index < self.header.root_count,
            "root index {index} out of range (only {} roots encoded)",
            self.header.root_count
        );
        let base = self.storage.base();
        unsafe {
            let table = base.add(self.header.root_table.byte_offset()).cast::<RawLocation>();
            let entry = ptr::read(table.add(index));
            base.add(entry.byte_offset()).cast()
        }
    }

    /// A shared reference to the root at `index`.
    ///
    /// # Safety
    ///
    /// `T` must be the type the root was encoded as, and the caller must
    /// not hold a conflicting mutable borrow of the same graph memory.
    pub unsafe fn root_ref<T>(&self, index: usize) -> &T {
        &*self.root_ptr(index)
    }
}

/// A heap allocation with [`MAX_ALIGN`] base alignment.
struct AlignedBuf {
    ptr: NonNull<u8>,
    len: usize,
}

impl AlignedBuf {
    fn copy_from(bytes: &[u8]) -> Self {
        let layout =
            Layout::from_size_align(bytes.len(), MAX_ALIGN).expect("image length overflows Layout");
        // Callers check for a non-empty buffer before allocating.
        let ptr = unsafe { alloc::alloc(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(layout);
        };
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        }
        Self {
            ptr,
            len: bytes.len(),
        }
    }

    fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        // Layout reconstruction cannot fail: it succeeded at allocation.
        if let Ok(layout) = Layout::from_size_align(self.len, MAX_ALIGN) {
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

impl std::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}
