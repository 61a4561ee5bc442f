//! Aliasing, cycle, and null-pointer coverage: the identity dedup map is
//! what all three behaviors fall out of.

use std::mem::offset_of;
use std::ptr;

use relocode::{Blit, CompositeElement, Decoder, ElementLocation, Encoder, Pool, RawSlice};

#[repr(C)]
#[derive(Clone, Copy)]
struct SharedNode {
    child_a: *mut SharedNode,
    child_b: *mut SharedNode,
    value: i64,
}

unsafe impl Blit for SharedNode {}

impl SharedNode {
    fn new(value: i64) -> Self {
        Self {
            child_a: ptr::null_mut(),
            child_b: ptr::null_mut(),
            value,
        }
    }
}

impl CompositeElement for SharedNode {
    fn encode_members(&self, location: ElementLocation<Self>, encoder: &mut Encoder) {
        let child_a = unsafe { encoder.encode_composite_ptr(self.child_a) };
        encoder.resolve_pointer_member(location, offset_of!(SharedNode, child_a), child_a);
        let child_b = unsafe { encoder.encode_composite_ptr(self.child_b) };
        encoder.resolve_pointer_member(location, offset_of!(SharedNode, child_b), child_b);
    }
}

#[test]
fn shared_pointees_decode_to_one_object() {
    let pool = Pool::new();

    // Two children that share both grandchildren.
    let grand_a = pool.element(SharedNode::new(5));
    let grand_b = pool.element(SharedNode::new(6));
    let child_a = pool.element(SharedNode::new(3));
    let child_b = pool.element(SharedNode::new(4));
    unsafe {
        (*child_a).child_a = grand_a;
        (*child_a).child_b = grand_b;
        (*child_b).child_a = grand_a;
        (*child_b).child_b = grand_b;
    }
    let mut root = SharedNode::new(2);
    root.child_a = child_a;
    root.child_b = child_b;

    let mut encoder = Encoder::new();
    let location = encoder.encode_composite(&root);
    encoder.append_root(location);
    let bytes = encoder.finish();

    // Mutating the source after encoding must not leak into the image.
    unsafe {
        (*grand_a).value = 50;
        (*grand_b).value = 60;
    }

    let decoder = Decoder::new(bytes).expect("decode failed");
    let loaded: &SharedNode = unsafe { decoder.root_ref(0) };
    unsafe {
        assert_eq!(loaded.value, 2);
        assert_eq!((*loaded.child_a).value, 3);
        assert_eq!((*loaded.child_b).value, 4);

        // Identical identity: both views resolve to the same address.
        assert_eq!((*loaded.child_a).child_a, (*loaded.child_b).child_a);
        assert_eq!((*loaded.child_a).child_b, (*loaded.child_b).child_b);
        assert_eq!((*(*loaded.child_a).child_a).value, 5);
        assert_eq!((*(*loaded.child_a).child_b).value, 6);

        // A write through one alias is observed through the other.
        (*(*loaded.child_a).child_a).value += 1;
        (*(*loaded.child_a).child_b).value += 1;
        assert_eq!((*(*loaded.child_b).child_a).value, 6);
        assert_eq!((*(*loaded.child_b).child_b).value, 7);
        (*(*loaded.child_b).child_a).value += 1;
        assert_eq!((*(*loaded.child_a).child_a).value, 7);
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CycleNode {
    next: *mut CycleNode,
    value: i64,
}

unsafe impl Blit for CycleNode {}

impl CompositeElement for CycleNode {
    fn encode_members(&self, location: ElementLocation<Self>, encoder: &mut Encoder) {
        let next = unsafe { encoder.encode_composite_ptr(self.next) };
        encoder.resolve_pointer_member(location, offset_of!(CycleNode, next), next);
    }
}

#[test]
fn cyclic_references_terminate_and_close_the_loop() {
    let pool = Pool::new();

    let child = pool.element(CycleNode {
        next: ptr::null_mut(),
        value: 42,
    });
    // Self-cycle: the child points back at itself.
    unsafe { (*child).next = child };
    let root = CycleNode {
        next: child,
        value: 2,
    };

    let mut encoder = Encoder::new();
    let location = encoder.encode_composite(&root);
    encoder.append_root(location);
    let bytes = encoder.finish();

    let decoder = Decoder::new(bytes).expect("decode failed");
    let loaded: &CycleNode = unsafe { decoder.root_ref(0) };
    unsafe {
        assert_eq!(loaded.value, 2);
        let hop1 = loaded.next;
        let hop2 = (*hop1).next;
        let hop3 = (*hop2).next;
        // Following the cycle any number of hops lands on the same object.
        assert_eq!(hop1, hop2);
        assert_eq!(hop2, hop3);
        assert_eq!((*hop3).value, 42);

        (*hop1).value += 10;
        assert_eq!((*(*loaded.next).next).value, 52);
    }
}

#[test]
fn mutually_referential_nodes_encode_once_each() {
    let pool = Pool::new();

    let a = pool.element(CycleNode {
        next: ptr::null_mut(),
        value: 1,
    });
    let b = pool.element(CycleNode {
        next: ptr::null_mut(),
        value: 2,
    });
    unsafe {
        (*a).next = b;
        (*b).next = a;
    }

    let mut encoder = Encoder::new();
    let location = unsafe { encoder.encode_composite_ptr(a.cast_const()) }.expect("non-null");
    encoder.append_root(location);
    let bytes = encoder.finish();

    let decoder = Decoder::new(bytes).expect("decode failed");
    let loaded: &CycleNode = unsafe { decoder.root_ref(0) };
    unsafe {
        assert_eq!(loaded.value, 1);
        assert_eq!((*loaded.next).value, 2);
        // Period 2: two hops return to the entry node.
        let back = (*loaded.next).next;
        assert_eq!(back.cast_const(), loaded as *const CycleNode);
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct MiscNode {
    indirect: *mut *mut MiscNode,
    number_a: *mut i64,
    number_b: *mut i64,
    number_none: *mut i64,
    array_a: RawSlice<i64>,
    array_b: RawSlice<i64>,
    array_none: RawSlice<i64>,
    value: i64,
}

unsafe impl Blit for MiscNode {}

impl MiscNode {
    fn new(value: i64) -> Self {
        Self {
            indirect: ptr::null_mut(),
            number_a: ptr::null_mut(),
            number_b: ptr::null_mut(),
            number_none: ptr::null_mut(),
            array_a: RawSlice::null(),
            array_b: RawSlice::null(),
            array_none: RawSlice::null(),
            value,
        }
    }
}

impl CompositeElement for MiscNode {
    fn encode_members(&self, location: ElementLocation<Self>, encoder: &mut Encoder) {
        unsafe {
            // A pointer to a pointer: the outer element is itself a slot
            // to resolve once the inner pointee is encoded.
            if !self.indirect.is_null() && !(*self.indirect).is_null() {
                let outer = encoder.encode_element_ptr_with(
                    self.indirect.cast_const(),
                    |encoder, inner, inner_location| {
                        let pointee = unsafe { encoder.encode_composite_ptr(inner.cast_const()) };
                        encoder.resolve_pointer(inner_location, pointee);
                    },
                );
                encoder.resolve_pointer_member(location, offset_of!(MiscNode, indirect), outer);
            }

            let number_a = encoder.encode_element_ptr(self.number_a.cast_const());
            encoder.resolve_pointer_member(location, offset_of!(MiscNode, number_a), number_a);
            let number_b = encoder.encode_element_ptr(self.number_b.cast_const());
            encoder.resolve_pointer_member(location, offset_of!(MiscNode, number_b), number_b);
            let number_none = encoder.encode_element_ptr(self.number_none.cast_const());
            encoder.resolve_pointer_member(location, offset_of!(MiscNode, number_none), number_none);

            let array_a = encoder.encode_slice_ptr(self.array_a);
            encoder.resolve_pointer_member(location, offset_of!(MiscNode, array_a), array_a);
            let array_b = encoder.encode_slice_ptr(self.array_b);
            encoder.resolve_pointer_member(location, offset_of!(MiscNode, array_b), array_b);
            let array_none = encoder.encode_slice_ptr(self.array_none);
            encoder.resolve_pointer_member(location, offset_of!(MiscNode, array_none), array_none);
        }
    }
}

#[test]
fn indirection_aliasing_and_nulls_round_trip() {
    let pool = Pool::new();

    let mut root = MiscNode::new(2);
    let target = pool.element(MiscNode::new(3));
    root.indirect = pool.element(target);
    root.number_a = pool.element(4i64);
    root.number_b = root.number_a;
    root.array_a = pool.array(vec![5i64, 6, 7]);
    root.array_b = root.array_a;

    let mut encoder = Encoder::new();
    let location = encoder.encode_composite(&root);
    encoder.append_root(location);
    let bytes = encoder.finish();

    unsafe {
        (*root.number_a) = 10;
        *root.array_a.get_mut(0) = 11;
    }

    let decoder = Decoder::new(bytes).expect("decode failed");
    let loaded: &MiscNode = unsafe { decoder.root_ref(0) };
    unsafe {
        assert_eq!(loaded.value, 2);
        assert_eq!((**loaded.indirect).value, 3);

        // Aliased element pointers share one encoded object.
        assert_eq!(loaded.number_a, loaded.number_b);
        assert_eq!(*loaded.number_a, 4);

        // A member whose source pointer was null stays null.
        assert!(loaded.number_none.is_null());
        assert!(loaded.array_none.is_null());

        assert_eq!(loaded.array_a.as_slice(), &[5, 6, 7]);
        assert_eq!(loaded.array_a.as_ptr(), loaded.array_b.as_ptr());

        *loaded.number_a = 44;
        assert_eq!(*loaded.number_b, 44);
        *loaded.array_a.get_mut(1) = 66;
        assert_eq!(*loaded.array_b.get(1), 66);
    }
}
