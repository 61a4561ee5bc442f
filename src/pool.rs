//! A caller-side arena that owns source graph nodes at stable addresses.
//!
//! The codec encodes graphs reached through raw pointers; the pool is the
//! simplest way to build such a graph. Allocations live until the pool is
//! dropped, so pointers handed out here stay valid across the whole
//! encoding pass. The pool is not part of the codec itself and never
//! appears in an encoded image.

use std::cell::RefCell;

use crate::raw::RawSlice;

type Cleanup = Box<dyn FnOnce()>;

/// An arena of individually allocated values and arrays, freed together
/// when the pool drops.
#[derive(Default)]
pub struct Pool {
    cleanups: RefCell<Vec<Cleanup>>,
}

impl Pool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `value` at a stable address owned by the pool.
    pub fn element<T: 'static>(&self, value: T) -> *mut T {
        let ptr = Box::into_raw(Box::new(value));
        self.cleanups
            .borrow_mut()
            .push(Box::new(move || unsafe { drop(Box::from_raw(ptr)) }));
        ptr
    }

    /// Moves `values` into a pool-owned contiguous allocation and returns
    /// a [`RawSlice`] over it.
    pub fn array<T: 'static>(&self, values: Vec<T>) -> RawSlice<T> {
        let boxed = values.into_boxed_slice();
        let len = boxed.len();
        let raw = Box::into_raw(boxed);
        let start = raw.cast::<T>();
        self.cleanups
            .borrow_mut()
            .push(Box::new(move || unsafe { drop(Box::from_raw(raw)) }));
        RawSlice::new(start, len)
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        for cleanup in self.cleanups.get_mut().drain(..) {
            cleanup();
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("allocations", &self.cleanups.borrow().len())
            .finish()
    }
}
