use std::fmt;
use std::fmt::Write as _;

use crate::Core::alloc::RingRegistry;
use crate::MPMC::Buffer::sync::MemoryModel;
use crate::MPMC::Buffer::RingBuffer;
use crate::MPMC::Ring;

/// Debug function for RingRegistry
///
/// Shows the limit and the registered names, without touching any ring state.
pub fn debug_ring_registry<M: MemoryModel>(
    registry: &RingRegistry<M>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("RingRegistry")
        .field("limit", &registry.limit())
        .field("rings", &registry.names())
        .finish()
}

/// Debug function for Ring
pub fn debug_ring<M: MemoryModel>(ring: &Ring<M>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Ring")
        .field("buffer", ring.buffer())
        .field("backing", &ring.backing())
        .field("refs", &ring.ref_count())
        .finish()
}

/// Debug function for RingBuffer
///
/// Cursor values are a relaxed snapshot and may be mutually inconsistent while
/// other threads are active.
pub fn debug_ring_buffer<M: MemoryModel>(
    buffer: &RingBuffer<M>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("RingBuffer")
        .field("name", &buffer.name())
        .field("storage", &format_args!("0x{:x}", buffer.storage as usize))
        .field("size", &buffer.size())
        .field("capacity", &buffer.capacity())
        .field("esize", &buffer.element_size())
        .field("model", &M::NAME)
        .field("cursors", &buffer.cursors())
        .finish_non_exhaustive()
}

/// Multi-line state dump of a ring.
pub fn dump_ring<M: MemoryModel>(buffer: &RingBuffer<M>) -> String {
    let c = buffer.cursors();
    let mut out = String::new();
    let _ = writeln!(out, "ring <{}>@{:p}", buffer.name(), buffer.header);
    let _ = writeln!(out, "  flags=0x{:x}", buffer.flags());
    let _ = writeln!(out, "  size={}", buffer.size());
    let _ = writeln!(out, "  capacity={}", buffer.capacity());
    let _ = writeln!(out, "  esize={}", buffer.element_size());
    let _ = writeln!(out, "  model={}", M::NAME);
    let _ = writeln!(out, "  ct={}", c.cons_tail);
    let _ = writeln!(out, "  ch={}", c.cons_head);
    let _ = writeln!(out, "  pt={}", c.prod_tail);
    let _ = writeln!(out, "  ph={}", c.prod_head);
    let _ = writeln!(out, "  used={}", buffer.count());
    let _ = write!(out, "  avail={}", buffer.free_count());
    out
}
