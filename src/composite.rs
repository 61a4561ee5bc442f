//! The recursive-encoding contract for graph node types.

use crate::encoder::Encoder;
use crate::location::ElementLocation;
use crate::raw::Blit;

/// A node type that owns pointer- or array-valued members needing
/// recursive encoding.
///
/// The encoder first captures the node's own fixed-size bytes, then hands
/// the node its freshly assigned location so it can encode each pointee
/// and resolve the corresponding member slot. Dispatch is static; the
/// encoder never needs a closed hierarchy of node types.
///
/// A typical implementation encodes each member and resolves it against
/// the result:
///
/// ```rust,ignore
/// impl CompositeElement for Node {
///     fn encode_members(&self, location: ElementLocation<Self>, encoder: &mut Encoder) {
///         let child = unsafe { encoder.encode_composite_ptr(self.child) };
///         encoder.resolve_pointer_member(location, offset_of!(Node, child), child);
///     }
/// }
/// ```
pub trait CompositeElement: Blit {
    /// Encodes this node's pointer/array members, resolving each member
    /// slot inside the element at `location`.
    fn encode_members(&self, location: ElementLocation<Self>, encoder: &mut Encoder);
}
