//! Memory-ordering strategies for the cursor protocol.
//!
//! Every cross-thread access the ring makes to a cursor goes through a
//! [`MemoryModel`]. Two interchangeable strategies are provided:
//!
//! - [`AcqRel`] attaches acquire/release semantics to the atomic operations
//!   themselves.
//! - [`Fenced`] keeps every atomic access `Relaxed` and brackets them with
//!   explicit [`fence`]s.
//!
//! Both give the same guarantees: a thread that observes a published tail also
//! observes every slot write (or read) that preceded the publish, including
//! writes made by earlier reservers whose tails were published first.

use crossbeam_utils::Backoff;
use std::sync::atomic::Ordering::{AcqRel as AR, Acquire, Relaxed, Release};
use std::sync::atomic::{fence, AtomicU32};

use super::layout::HeadTail;

/// Ordering strategy for loads, stores and CAS on the cursor pairs.
pub trait MemoryModel: Send + Sync + 'static {
    /// Strategy name, used in diagnostics.
    const NAME: &'static str;

    /// Read the role's own head. Later loads (the opposing tail) may not move above it.
    fn load_head(ht: &HeadTail) -> u32;

    /// Read the opposing role's tail. Slot accesses that follow may not move above it.
    fn load_tail(ht: &HeadTail) -> u32;

    /// Try to advance the head from `current` to `new`.
    fn cas_head(ht: &HeadTail, current: u32, new: u32) -> Result<u32, u32>;

    /// Advance the head of a single-thread role.
    fn store_head(ht: &HeadTail, new: u32);

    /// Spin until the tail reaches `expected`, i.e. every earlier reservation has published.
    fn wait_tail(ht: &HeadTail, expected: u32);

    /// Publish the tail. Slot accesses that precede it may not move below it.
    fn store_tail(ht: &HeadTail, new: u32);
}

#[inline]
fn spin_until(cell: &AtomicU32, expected: u32, order: std::sync::atomic::Ordering) {
    let backoff = Backoff::new();
    while cell.load(order) != expected {
        backoff.spin();
    }
}

/// Native acquire/release atomics.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcqRel;

impl MemoryModel for AcqRel {
    const NAME: &'static str = "acq-rel";

    #[inline(always)]
    fn load_head(ht: &HeadTail) -> u32 {
        ht.head.load(Acquire)
    }

    #[inline(always)]
    fn load_tail(ht: &HeadTail) -> u32 {
        ht.tail.load(Acquire)
    }

    #[inline(always)]
    fn cas_head(ht: &HeadTail, current: u32, new: u32) -> Result<u32, u32> {
        ht.head.compare_exchange_weak(current, new, AR, Acquire)
    }

    #[inline(always)]
    fn store_head(ht: &HeadTail, new: u32) {
        ht.head.store(new, Relaxed);
    }

    #[inline(always)]
    fn wait_tail(ht: &HeadTail, expected: u32) {
        // Acquire so our publish carries the earlier reserver's slot accesses with it
        spin_until(&ht.tail, expected, Acquire);
    }

    #[inline(always)]
    fn store_tail(ht: &HeadTail, new: u32) {
        ht.tail.store(new, Release);
    }
}

/// Relaxed atomics plus explicit fences.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fenced;

impl MemoryModel for Fenced {
    const NAME: &'static str = "fenced";

    #[inline(always)]
    fn load_head(ht: &HeadTail) -> u32 {
        let head = ht.head.load(Relaxed);
        fence(Acquire);
        head
    }

    #[inline(always)]
    fn load_tail(ht: &HeadTail) -> u32 {
        let tail = ht.tail.load(Relaxed);
        fence(Acquire);
        tail
    }

    #[inline(always)]
    fn cas_head(ht: &HeadTail, current: u32, new: u32) -> Result<u32, u32> {
        fence(Release);
        let res = ht.head.compare_exchange_weak(current, new, Relaxed, Relaxed);
        fence(Acquire);
        res
    }

    #[inline(always)]
    fn store_head(ht: &HeadTail, new: u32) {
        ht.head.store(new, Relaxed);
    }

    #[inline(always)]
    fn wait_tail(ht: &HeadTail, expected: u32) {
        spin_until(&ht.tail, expected, Relaxed);
        fence(Acquire);
    }

    #[inline(always)]
    fn store_tail(ht: &HeadTail, new: u32) {
        fence(Release);
        ht.tail.store(new, Relaxed);
    }
}
