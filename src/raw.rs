//! The raw-value boundary: byte views of typed values and the encoded
//! pointer/slice member representations.
//!
//! Encoding is a straight memory capture, so every type that passes
//! through the encoder must be safe to snapshot and later reinterpret.
//! [`Blit`] is the marker for that contract. Pointer-valued members of
//! graph nodes are plain raw pointers; array-valued members are
//! [`RawSlice`], a `#[repr(C)]` pointer/length pair whose pointer word is
//! what relocation rewrites.

use std::fmt;
use std::mem;
use std::slice;

/// Marker for types whose values may be captured as raw bytes and
/// reinterpreted from a decoded image.
///
/// # Safety
///
/// Implementors guarantee that:
///
/// * the type is fixed-size with no destructor side effects that byte
///   duplication would violate;
/// * every byte of a value is initialized: the layout contains **no
///   padding**, neither between fields nor trailing. Capture reads the
///   value as a plain byte slice, and a padding byte would be an
///   uninitialized read. A `#[repr(C)]` aggregate whose field sizes do
///   not tile its layout must insert explicit filler fields (e.g. a
///   zeroed `u32`) until `size_of` equals the sum of the field sizes;
/// * any bit pattern produced by re-reading previously captured bytes is
///   a valid value.
///
/// In practice: primitives, raw pointers, and padding-free `#[repr(C)]`
/// aggregates built from them.
pub unsafe trait Blit: Copy {}

macro_rules! impl_blit {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Blit for $t {})*
    };
}

impl_blit!(u8, u16, u32, u64, u128, usize);
impl_blit!(i8, i16, i32, i64, i128, isize);
impl_blit!(f32, f64, bool, ());

unsafe impl<T> Blit for *const T {}
unsafe impl<T> Blit for *mut T {}
unsafe impl<T: Blit, const N: usize> Blit for [T; N] {}

/// The encoded representation of an array-valued member: a start pointer
/// and an element count.
///
/// Before encoding, `ptr` holds a real source address (or null). In the
/// image it holds a relative byte offset, and after relocation a real
/// address inside the decoded buffer. `len` is copied verbatim in all
/// three states. The pointer word sits at offset 0, which is the slot
/// [`resolve_pointer_member`](crate::Encoder::resolve_pointer_member)
/// rewrites.
#[repr(C)]
pub struct RawSlice<T> {
    ptr: *mut T,
    len: usize,
}

impl<T> RawSlice<T> {
    /// Creates a slice view over `count` elements starting at `start`.
    pub const fn new(start: *mut T, count: usize) -> Self {
        Self { ptr: start, len: count }
    }

    /// The null slice: no pointee, zero length.
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// True if the start pointer is null.
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// The element count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the slice holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The start pointer.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// A shared reference to the `index`-th element.
    ///
    /// # Safety
    ///
    /// The slice must point at `len` live elements (a source allocation or
    /// a decoded image region) and `index` must be in bounds.
    pub unsafe fn get(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        &*self.ptr.add(index)
    }

    /// A mutable reference to the `index`-th element.
    ///
    /// # Safety
    ///
    /// Same as [`get`](Self::get), and the caller must ensure no aliasing
    /// access overlaps the borrow.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        &mut *self.ptr.add(index)
    }

    /// A shared slice view of all elements.
    ///
    /// # Safety
    ///
    /// The slice must point at `len` live, properly aligned elements.
    pub unsafe fn as_slice(&self) -> &[T] {
        slice::from_raw_parts(self.ptr, self.len)
    }
}

impl<T> Clone for RawSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for RawSlice<T> {}

impl<T> fmt::Debug for RawSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSlice")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

unsafe impl<T> Blit for RawSlice<T> {}

/// The raw bytes of a single value.
pub(crate) fn bytes_of<T: Blit>(value: &T) -> &[u8] {
    // Blit forbids padding, so every one of these bytes is initialized.
    unsafe { slice::from_raw_parts((value as *const T).cast::<u8>(), mem::size_of::<T>()) }
}

/// The raw bytes of `count` contiguous values starting at `start`.
///
/// # Safety
///
/// `start` must point at `count` live elements of `T` (non-null and
/// aligned when `count > 0`).
pub(crate) unsafe fn bytes_of_raw<'a, T: Blit>(start: *const T, count: usize) -> &'a [u8] {
    if count == 0 {
        return &[];
    }
    slice::from_raw_parts(start.cast::<u8>(), count * mem::size_of::<T>())
}
