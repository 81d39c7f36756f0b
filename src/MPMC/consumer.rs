// src/MPMC/consumer.rs

use bytemuck::Pod;
use std::mem::size_of;
use std::sync::Arc;

use super::ring::RingShared;
use super::Buffer::sync::{AcqRel, MemoryModel};
use crate::MPMC::Structs::Buffer_Structs::{Behavior, Transfer};

/// The dequeue side of a ring.
///
/// Obtained from [`Ring::consumer`](crate::Ring::consumer). Polling only: an
/// empty ring yields a zero count, never a wait.
pub struct Consumer<M: MemoryModel = AcqRel> {
    shared: Arc<RingShared<M>>,
    single: bool,
}

impl<M: MemoryModel> Consumer<M> {
    pub(crate) fn new(shared: Arc<RingShared<M>>, single: bool) -> Self {
        Self { shared, single }
    }

    #[inline(always)]
    fn dequeue(&mut self, out: &mut [u8], behavior: Behavior) -> Transfer {
        let buffer = &self.shared.buffer;
        let n = buffer.elems_in(out.len());
        // Safety: `out` covers `n` elements, and in single mode this handle is
        // the only consumer and is borrowed mutably.
        unsafe { buffer.do_dequeue(out.as_mut_ptr(), n, behavior, self.single) }
    }

    /// Fill all of `out`, or dequeue nothing if fewer entries are available.
    ///
    /// # Panics
    /// Panics if `out.len()` is not a multiple of the element size.
    pub fn dequeue_bulk(&mut self, out: &mut [u8]) -> Transfer {
        self.dequeue(out, Behavior::Fixed)
    }

    /// Dequeue as many entries as are available, up to `out.len() / element_size`.
    /// Only the first `count` elements of `out` are written.
    ///
    /// # Panics
    /// Panics if `out.len()` is not a multiple of the element size.
    pub fn dequeue_burst(&mut self, out: &mut [u8]) -> Transfer {
        self.dequeue(out, Behavior::Variable)
    }

    /// Typed [`Consumer::dequeue_bulk`].
    pub fn dequeue_bulk_as<T: Pod>(&mut self, out: &mut [T]) -> Transfer {
        self.check_width::<T>();
        self.dequeue(bytemuck::cast_slice_mut(out), Behavior::Fixed)
    }

    /// Typed [`Consumer::dequeue_burst`].
    pub fn dequeue_burst_as<T: Pod>(&mut self, out: &mut [T]) -> Transfer {
        self.check_width::<T>();
        self.dequeue(bytemuck::cast_slice_mut(out), Behavior::Variable)
    }

    /// Dequeue a single element.
    pub fn dequeue_as<T: Pod>(&mut self) -> Option<T> {
        self.check_width::<T>();
        let mut item = T::zeroed();
        let t = self.dequeue(bytemuck::bytes_of_mut(&mut item), Behavior::Fixed);
        (!t.is_empty()).then_some(item)
    }

    fn check_width<T>(&self) {
        let esize = self.shared.buffer.element_size() as usize;
        assert_eq!(
            size_of::<T>(),
            esize,
            "type is {} bytes wide but ring elements are {esize} bytes",
            size_of::<T>()
        );
    }

    /// Entries right now.
    pub fn count(&self) -> u32 {
        self.shared.buffer.count()
    }

    pub fn free_count(&self) -> u32 {
        self.shared.buffer.free_count()
    }

    pub fn capacity(&self) -> u32 {
        self.shared.buffer.capacity()
    }

    pub fn element_size(&self) -> u32 {
        self.shared.buffer.element_size()
    }

    pub fn size(&self) -> u32 {
        self.shared.buffer.size()
    }

    pub fn name(&self) -> &str {
        self.shared.buffer.name()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.shared.buffer.is_full()
    }

    /// Whether this handle uses the single-consumer path.
    pub fn is_single(&self) -> bool {
        self.single
    }
}

impl<M: MemoryModel> Drop for Consumer<M> {
    fn drop(&mut self) {
        if self.single {
            self.shared.release_consumer();
        }
    }
}
