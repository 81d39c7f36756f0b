// In src/MPMC/producer.rs
use bytemuck::Pod;
use std::mem::size_of;
use std::sync::Arc;

use super::ring::RingShared;
use super::Buffer::sync::{AcqRel, MemoryModel};
use crate::MPMC::Structs::Buffer_Structs::{Behavior, Transfer};

/// The enqueue side of a ring.
///
/// Obtained from [`Ring::producer`](crate::Ring::producer). On a multi-producer
/// ring, give each thread its own handle; on a single-producer ring only one
/// handle exists at a time and the role is released when it drops.
pub struct Producer<M: MemoryModel = AcqRel> {
    shared: Arc<RingShared<M>>,
    single: bool,
}

impl<M: MemoryModel> Producer<M> {
    pub(crate) fn new(shared: Arc<RingShared<M>>, single: bool) -> Self {
        Self { shared, single }
    }

    #[inline(always)]
    fn enqueue(&mut self, items: &[u8], behavior: Behavior) -> Transfer {
        let buffer = &self.shared.buffer;
        let n = buffer.elems_in(items.len());
        // Safety: `items` covers `n` elements, and in single mode this handle is
        // the only producer and is borrowed mutably.
        unsafe { buffer.do_enqueue(items.as_ptr(), n, behavior, self.single) }
    }

    /// Enqueue every element in `items`, or nothing if they do not all fit.
    ///
    /// `items` is a run of `element_size`-byte records.
    ///
    /// # Panics
    /// Panics if `items.len()` is not a multiple of the element size.
    pub fn enqueue_bulk(&mut self, items: &[u8]) -> Transfer {
        self.enqueue(items, Behavior::Fixed)
    }

    /// Enqueue as many elements of `items` as currently fit.
    ///
    /// # Panics
    /// Panics if `items.len()` is not a multiple of the element size.
    pub fn enqueue_burst(&mut self, items: &[u8]) -> Transfer {
        self.enqueue(items, Behavior::Variable)
    }

    /// Typed [`Producer::enqueue_bulk`]. `T` must be exactly one element wide.
    pub fn enqueue_bulk_as<T: Pod>(&mut self, items: &[T]) -> Transfer {
        self.check_width::<T>();
        self.enqueue(bytemuck::cast_slice(items), Behavior::Fixed)
    }

    /// Typed [`Producer::enqueue_burst`]. `T` must be exactly one element wide.
    pub fn enqueue_burst_as<T: Pod>(&mut self, items: &[T]) -> Transfer {
        self.check_width::<T>();
        self.enqueue(bytemuck::cast_slice(items), Behavior::Variable)
    }

    /// Enqueue a single element, handing it back if the ring is full.
    pub fn enqueue_as<T: Pod>(&mut self, item: T) -> Result<(), T> {
        self.check_width::<T>();
        if self.enqueue(bytemuck::bytes_of(&item), Behavior::Fixed).is_empty() {
            Err(item)
        } else {
            Ok(())
        }
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

    /// Free slots right now.
    pub fn free_count(&self) -> u32 {
        self.shared.buffer.free_count()
    }

    /// Entries right now.
    pub fn count(&self) -> u32 {
        self.shared.buffer.count()
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

    /// Whether this handle uses the single-producer path.
    pub fn is_single(&self) -> bool {
        self.single
    }
}

impl<M: MemoryModel> Drop for Producer<M> {
    fn drop(&mut self) {
        if self.single {
            self.shared.release_producer();
        }
    }
}
