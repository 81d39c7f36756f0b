// The lock-free ring itself: a view over a header and the element storage
// laid out directly after it.

use std::marker::PhantomData;

use super::layout::RingHeader;
use super::sync::{AcqRel, MemoryModel};

/// A lock-free, bounded ring of fixed-size elements.
///
/// This struct does NOT own its memory. It is a view holding pointers into a
/// memory zone that starts with a [`RingHeader`] and continues with
/// `size * esize` bytes of element storage.
///
/// ### Concurrency Design:
/// - **Reservation**: a producer (consumer) claims a contiguous range of slots by
///   advancing its role's `head`, either with a plain store (single mode) or a
///   compare-and-swap retry loop (multi mode). Ranges never overlap.
/// - **Transfer**: elements are copied in or out of the claimed range only.
/// - **Publish**: the role's `tail` is advanced to the reserved head. In multi mode
///   a thread first waits until `tail` equals the start of its own range, so tails
///   advance in reservation order and the opposing role never sees a gap.
///
/// The ordering of every cursor access is delegated to `M`.
pub struct RingBuffer<M: MemoryModel = AcqRel> {
    /// Pointer to the ring metadata at the start of the zone.
    pub(crate) header: *const RingHeader,

    /// Pointer to the first byte of element storage.
    pub(crate) storage: *mut u8,

    /// Storage size in elements (power of two).
    pub(crate) size: u32,

    /// `size - 1`.
    pub(crate) mask: u32,

    /// Usable capacity in elements.
    pub(crate) capacity: u32,

    /// Element width in bytes.
    pub(crate) esize: u32,

    pub(crate) _model: PhantomData<M>,
}

unsafe impl<M: MemoryModel> Send for RingBuffer<M> {}
unsafe impl<M: MemoryModel> Sync for RingBuffer<M> {}
