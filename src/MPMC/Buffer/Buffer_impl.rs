use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::mem::align_of;
use std::ptr;
use std::sync::atomic::Ordering::Relaxed;

use super::layout::{memsize, storage_offset, HeadTail, RingHeader, RING_MAGIC};
use super::sync::MemoryModel;
use super::transfer::{transfer, Direction};
use super::Buffer::RingBuffer;
use crate::Core::error::RingError;
use crate::MPMC::Structs::Buffer_Structs::{
    check_geometry, Behavior, RingConfig, SyncMode, Transfer,
};

/// Result of a head reservation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeadMove {
    /// Head before the move; first cursor of the reserved range.
    pub old_head: u32,
    /// Head after the move; one past the reserved range.
    pub new_head: u32,
    /// Elements granted. With [`Behavior::Fixed`] this is 0 or the request.
    pub n: u32,
    /// Free slots (producer) or filled slots (consumer) seen before the move.
    pub entries: u32,
}

/// A snapshot of all four cursors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cursors {
    pub prod_head: u32,
    pub prod_tail: u32,
    pub cons_head: u32,
    pub cons_tail: u32,
}

impl Cursors {
    /// Check `cons.tail <= cons.head <= prod.tail <= prod.head` (mod 2^32) and
    /// `prod.head - cons.tail <= capacity`.
    ///
    /// Only meaningful on a snapshot taken while the ring is quiescent.
    pub fn is_consistent(&self, capacity: u32) -> bool {
        let span = self.prod_head.wrapping_sub(self.cons_tail);
        let consumed = self.cons_head.wrapping_sub(self.cons_tail);
        let filled = self.prod_tail.wrapping_sub(self.cons_tail);
        span <= capacity && consumed <= filled && filled <= span
    }
}

impl<M: MemoryModel> RingBuffer<M> {
    /// Create a ring buffer view over an already initialized header.
    ///
    /// # Safety
    /// `header` must point to a valid [`RingHeader`] followed by its element storage,
    /// and both must outlive the view.
    pub unsafe fn new(header: *const RingHeader) -> Self {
        let h = &*header;
        Self {
            header,
            storage: (header as *mut u8).add(storage_offset()),
            size: h.size,
            mask: h.mask,
            capacity: h.capacity,
            esize: h.esize,
            _model: PhantomData,
        }
    }

    /// Write a fresh header for `config` at `base` and return a view over it.
    ///
    /// # Safety
    /// `base` must be valid for writes of `zone_size` bytes for the lifetime of every
    /// view created over it, and no other view may be using the region.
    pub unsafe fn init(
        base: *mut u8,
        zone_size: usize,
        config: &RingConfig,
        name: &str,
    ) -> Result<Self, RingError> {
        check_geometry(config.capacity(), config.size(), config.element_size())?;
        let needed = memsize(config)?;
        if zone_size < needed {
            return Err(RingError::ZoneTooSmall {
                needed,
                have: zone_size,
            });
        }
        if (base as usize) % align_of::<RingHeader>() != 0 {
            return Err(RingError::Zone(io::Error::new(
                io::ErrorKind::InvalidData,
                "memory zone not properly aligned",
            )));
        }

        let header = base as *mut RingHeader;
        ptr::write(header, RingHeader::new(config, name)?);
        Ok(Self::new(header))
    }

    #[inline(always)]
    pub(crate) fn header(&self) -> &RingHeader {
        // Safety: the header outlives the view (contract of `new`/`init`)
        unsafe { &*self.header }
    }

    /// Whether the header carries the ring magic.
    pub fn is_initialized(&self) -> bool {
        !self.header.is_null() && self.header().magic == RING_MAGIC
    }

    /// Reserve up to `n` slots for one role.
    ///
    /// `d` is the role's own cursor pair, `s` the opposing one. `capacity` is the
    /// ring capacity for the producer and 0 for the consumer, which turns
    /// `capacity + s.tail - d.head` into "free slots" or "filled slots" respectively.
    #[inline(always)]
    fn move_head(
        d: &HeadTail,
        s: &HeadTail,
        capacity: u32,
        is_st: bool,
        n: u32,
        behavior: Behavior,
    ) -> HeadMove {
        let mut old_head = M::load_head(d);
        loop {
            let stail = M::load_tail(s);
            let entries = capacity.wrapping_add(stail).wrapping_sub(old_head);

            let n = if n <= entries {
                n
            } else {
                match behavior {
                    Behavior::Fixed => 0,
                    Behavior::Variable => entries,
                }
            };

            if n == 0 {
                return HeadMove {
                    old_head,
                    new_head: old_head,
                    n: 0,
                    entries,
                };
            }

            let new_head = old_head.wrapping_add(n);
            let claimed = if is_st {
                // Only this thread moves the head
                M::store_head(d, new_head);
                true
            } else {
                match M::cas_head(d, old_head, new_head) {
                    Ok(_) => true,
                    Err(current) => {
                        old_head = current;
                        false
                    }
                }
            };

            if claimed {
                return HeadMove {
                    old_head,
                    new_head,
                    n,
                    entries,
                };
            }
        }
    }

    /// Publish `[old, new)` on a role's tail, in reservation order.
    #[inline(always)]
    fn update_tail(ht: &HeadTail, old: u32, new: u32, is_st: bool) {
        if !is_st {
            // Earlier reservers publish first
            M::wait_tail(ht, old);
        }
        M::store_tail(ht, new);
    }

    /// Reserve producer slots without moving data.
    pub(crate) fn move_prod_head(&self, is_sp: bool, n: u32, behavior: Behavior) -> HeadMove {
        let h = self.header();
        Self::move_head(&h.prod, &h.cons, self.capacity, is_sp, n, behavior)
    }

    /// Reserve consumer slots without moving data.
    pub(crate) fn move_cons_head(&self, is_sc: bool, n: u32, behavior: Behavior) -> HeadMove {
        let h = self.header();
        Self::move_head(&h.cons, &h.prod, 0, is_sc, n, behavior)
    }

    /// Reserve, copy in, publish.
    ///
    /// # Safety
    /// - `obj` must be readable for `n * esize` bytes.
    /// - With `is_sp`, no other thread may be enqueueing on this ring concurrently.
    #[inline]
    pub unsafe fn do_enqueue(
        &self,
        obj: *const u8,
        n: u32,
        behavior: Behavior,
        is_sp: bool,
    ) -> Transfer {
        let mv = self.move_prod_head(is_sp, n, behavior);
        if mv.n != 0 {
            transfer(
                Direction::Enqueue,
                self.storage,
                obj as *mut u8,
                self.size,
                mv.old_head & self.mask,
                self.esize,
                mv.n,
            );
            Self::update_tail(&self.header().prod, mv.old_head, mv.new_head, is_sp);
        }
        Transfer {
            count: mv.n,
            remaining: mv.entries - mv.n,
        }
    }

    /// Reserve, copy out, publish.
    ///
    /// # Safety
    /// - `obj` must be writable for `n * esize` bytes.
    /// - With `is_sc`, no other thread may be dequeueing from this ring concurrently.
    #[inline]
    pub unsafe fn do_dequeue(
        &self,
        obj: *mut u8,
        n: u32,
        behavior: Behavior,
        is_sc: bool,
    ) -> Transfer {
        let mv = self.move_cons_head(is_sc, n, behavior);
        if mv.n != 0 {
            transfer(
                Direction::Dequeue,
                self.storage,
                obj,
                self.size,
                mv.old_head & self.mask,
                self.esize,
                mv.n,
            );
            Self::update_tail(&self.header().cons, mv.old_head, mv.new_head, is_sc);
        }
        Transfer {
            count: mv.n,
            remaining: mv.entries - mv.n,
        }
    }

    /// Number of whole elements in a byte buffer.
    ///
    /// # Panics
    /// Panics if `len` is not a multiple of the element size.
    #[inline]
    pub(crate) fn elems_in(&self, len: usize) -> u32 {
        let esize = self.esize as usize;
        assert!(
            len % esize == 0,
            "buffer length {len} is not a multiple of the {esize}-byte element size"
        );
        u32::try_from(len / esize).unwrap_or(u32::MAX)
    }

    /// Enqueue every element of `items` or none of them, using the ring's producer mode.
    ///
    /// # Safety
    /// In single-producer mode, the caller guarantees no concurrent enqueue.
    ///
    /// # Panics
    /// Panics if `items.len()` is not a multiple of the element size.
    pub unsafe fn enqueue_bulk(&self, items: &[u8]) -> Transfer {
        let n = self.elems_in(items.len());
        self.do_enqueue(items.as_ptr(), n, Behavior::Fixed, self.producer_mode().is_single())
    }

    /// Enqueue as many elements of `items` as fit, using the ring's producer mode.
    ///
    /// # Safety
    /// See [`RingBuffer::enqueue_bulk`].
    pub unsafe fn enqueue_burst(&self, items: &[u8]) -> Transfer {
        let n = self.elems_in(items.len());
        self.do_enqueue(items.as_ptr(), n, Behavior::Variable, self.producer_mode().is_single())
    }

    /// Fill all of `out` or dequeue nothing, using the ring's consumer mode.
    ///
    /// # Safety
    /// In single-consumer mode, the caller guarantees no concurrent dequeue.
    ///
    /// # Panics
    /// Panics if `out.len()` is not a multiple of the element size.
    pub unsafe fn dequeue_bulk(&self, out: &mut [u8]) -> Transfer {
        let n = self.elems_in(out.len());
        self.do_dequeue(out.as_mut_ptr(), n, Behavior::Fixed, self.consumer_mode().is_single())
    }

    /// Dequeue up to `out.len() / element_size` elements, using the ring's consumer mode.
    ///
    /// # Safety
    /// See [`RingBuffer::dequeue_bulk`].
    pub unsafe fn dequeue_burst(&self, out: &mut [u8]) -> Transfer {
        let n = self.elems_in(out.len());
        self.do_dequeue(out.as_mut_ptr(), n, Behavior::Variable, self.consumer_mode().is_single())
    }

    /// Number of published entries, clamped to capacity.
    #[inline]
    pub fn count(&self) -> u32 {
        let h = self.header();
        let prod_tail = h.prod.tail.load(Relaxed);
        let cons_tail = h.cons.tail.load(Relaxed);
        let count = prod_tail.wrapping_sub(cons_tail);
        count.min(self.capacity)
    }

    /// Free slots.
    #[inline]
    pub fn free_count(&self) -> u32 {
        self.capacity - self.count()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        let h = self.header();
        h.prod.tail.load(Relaxed) == h.cons.tail.load(Relaxed)
    }

    /// Usable capacity in elements.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Storage size in elements.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn element_size(&self) -> u32 {
        self.esize
    }

    pub fn name(&self) -> &str {
        self.header().name()
    }

    pub fn producer_mode(&self) -> SyncMode {
        sync_mode(self.header().prod.sync)
    }

    pub fn consumer_mode(&self) -> SyncMode {
        sync_mode(self.header().cons.sync)
    }

    pub fn flags(&self) -> u32 {
        self.header().flags
    }

    /// Snapshot of the four cursors. Not atomic as a whole.
    pub fn cursors(&self) -> Cursors {
        let h = self.header();
        Cursors {
            prod_head: h.prod.head.load(Relaxed),
            prod_tail: h.prod.tail.load(Relaxed),
            cons_head: h.cons.head.load(Relaxed),
            cons_tail: h.cons.tail.load(Relaxed),
        }
    }

    /// Drop every entry by rewinding all cursors to 0.
    ///
    /// # Safety
    /// No enqueue or dequeue may run concurrently.
    pub unsafe fn reset(&self) {
        self.reset_to(0);
    }

    /// Set all four cursors to `value`, leaving the ring empty.
    ///
    /// # Safety
    /// No enqueue or dequeue may run concurrently.
    pub(crate) unsafe fn reset_to(&self, value: u32) {
        let h = self.header();
        h.prod.head.store(value, Relaxed);
        h.prod.tail.store(value, Relaxed);
        h.cons.head.store(value, Relaxed);
        h.cons.tail.store(value, Relaxed);
    }
}

fn sync_mode(raw: u32) -> SyncMode {
    if raw == SyncMode::Single as u32 {
        SyncMode::Single
    } else {
        SyncMode::Multi
    }
}

impl<M: MemoryModel> fmt::Debug for RingBuffer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_ring_buffer(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Core::SharedMemory::{HeapZone, MemoryZone};
    use crate::MPMC::Buffer::sync::{AcqRel, Fenced};

    fn heap_ring<M: MemoryModel>(config: RingConfig) -> (HeapZone, RingBuffer<M>) {
        let zone = HeapZone::new(memsize(&config).unwrap()).unwrap();
        let rb = unsafe { RingBuffer::<M>::init(zone.as_ptr(), zone.size(), &config, "t") }.unwrap();
        (zone, rb)
    }

    fn cfg(count: u32, esize: u32, sp: SyncMode, sc: SyncMode) -> RingConfig {
        RingConfig::new(count, esize, sp, sc, false).unwrap()
    }

    #[test]
    fn fixed_reservation_is_all_or_nothing() {
        let (_zone, rb) = heap_ring::<AcqRel>(cfg(8, 4, SyncMode::Multi, SyncMode::Multi));

        let mv = rb.move_prod_head(false, 9, Behavior::Fixed);
        assert_eq!((mv.n, mv.entries, mv.old_head, mv.new_head), (0, 8, 0, 0));

        let mv = rb.move_prod_head(false, 5, Behavior::Fixed);
        assert_eq!((mv.n, mv.entries, mv.old_head, mv.new_head), (5, 8, 0, 5));

        // The reservation is not yet published, so consumers see nothing
        let mv = rb.move_cons_head(false, 1, Behavior::Variable);
        assert_eq!((mv.n, mv.entries), (0, 0));
    }

    #[test]
    fn variable_reservation_takes_what_is_left() {
        let (_zone, rb) = heap_ring::<Fenced>(cfg(8, 4, SyncMode::Single, SyncMode::Single));

        rb.move_prod_head(true, 6, Behavior::Fixed);
        let mv = rb.move_prod_head(true, 5, Behavior::Variable);
        assert_eq!((mv.n, mv.entries, mv.old_head, mv.new_head), (2, 2, 6, 8));
    }

    #[test]
    fn cursors_wrap_past_u32_max() {
        let (_zone, rb) = heap_ring::<AcqRel>(cfg(4, 4, SyncMode::Single, SyncMode::Single));
        unsafe { rb.reset_to(u32::MAX - 1) };

        let input: Vec<u8> = [1u32, 2, 3].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let t = unsafe { rb.enqueue_bulk(&input) };
        assert_eq!(t, Transfer { count: 3, remaining: 1 });
        assert_eq!(rb.count(), 3);
        assert_eq!(rb.cursors().prod_tail, 1);
        assert!(rb.cursors().is_consistent(rb.capacity()));

        let mut out = vec![0u8; 12];
        let t = unsafe { rb.dequeue_bulk(&mut out) };
        assert_eq!(t, Transfer { count: 3, remaining: 0 });
        assert_eq!(out, input);
        assert!(rb.is_empty());
    }

    fn words(values: impl IntoIterator<Item = u32>) -> Vec<u8> {
        values.into_iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn multi_cursors_wrap_past_u32_max<M: MemoryModel>() {
        let (_zone, rb) = heap_ring::<M>(cfg(8, 4, SyncMode::Multi, SyncMode::Multi));
        unsafe { rb.reset_to(u32::MAX - 2) };

        // The CAS path reserves straight across the wrap
        let mv = rb.move_prod_head(false, 5, Behavior::Fixed);
        assert_eq!((mv.old_head, mv.new_head, mv.n, mv.entries), (u32::MAX - 2, 2, 5, 8));
        unsafe { rb.reset_to(u32::MAX - 2) };

        let first = words(1..=6);
        let t = unsafe { rb.do_enqueue(first.as_ptr(), 6, Behavior::Fixed, false) };
        assert_eq!(t, Transfer { count: 6, remaining: 2 });
        let c = rb.cursors();
        assert_eq!((c.prod_head, c.prod_tail), (3, 3));
        assert!(c.is_consistent(rb.capacity()));

        let second = words(7..=10);
        let t = unsafe { rb.do_enqueue(second.as_ptr(), 4, Behavior::Variable, false) };
        assert_eq!(t, Transfer { count: 2, remaining: 0 });
        assert!(rb.is_full());

        let mut out = vec![0u8; 32];
        let t = unsafe { rb.do_dequeue(out.as_mut_ptr(), 8, Behavior::Fixed, false) };
        assert_eq!(t, Transfer { count: 8, remaining: 0 });
        assert_eq!(out, words(1..=8));
        let c = rb.cursors();
        assert_eq!((c.cons_head, c.cons_tail), (5, 5));
        assert!(rb.is_empty());
    }

    #[test]
    fn multi_cursors_wrap_past_u32_max_acq_rel() {
        multi_cursors_wrap_past_u32_max::<AcqRel>();
    }

    #[test]
    fn multi_cursors_wrap_past_u32_max_fenced() {
        multi_cursors_wrap_past_u32_max::<Fenced>();
    }

    #[test]
    fn contended_cursors_wrap_past_u32_max() {
        use std::sync::atomic::AtomicU64;

        const PER_PRODUCER: u32 = 5_000;
        let (_zone, rb) = heap_ring::<AcqRel>(cfg(16, 4, SyncMode::Multi, SyncMode::Multi));
        unsafe { rb.reset_to(u32::MAX - 1_000) };
        let received = AtomicU64::new(0);
        let sum = AtomicU64::new(0);

        std::thread::scope(|s| {
            for p in 0..2u32 {
                let rb = &rb;
                s.spawn(move || {
                    let mut v = p * PER_PRODUCER + 1;
                    let end = v + PER_PRODUCER;
                    while v < end {
                        let item = v.to_ne_bytes();
                        let t = unsafe { rb.do_enqueue(item.as_ptr(), 1, Behavior::Fixed, false) };
                        v += t.count;
                    }
                });
            }
            for _ in 0..2 {
                let (rb, received, sum) = (&rb, &received, &sum);
                s.spawn(move || {
                    let mut out = [0u8; 16];
                    while received.load(Relaxed) < 2 * PER_PRODUCER as u64 {
                        let t = unsafe {
                            rb.do_dequeue(out.as_mut_ptr(), 4, Behavior::Variable, false)
                        };
                        let got: u64 = out[..t.count as usize * 4]
                            .chunks_exact(4)
                            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]) as u64)
                            .sum();
                        sum.fetch_add(got, Relaxed);
                        received.fetch_add(t.count as u64, Relaxed);
                    }
                });
            }
        });

        let total = 2 * PER_PRODUCER as u64;
        assert_eq!(received.load(Relaxed), total);
        assert_eq!(sum.load(Relaxed), total * (total + 1) / 2);
        let c = rb.cursors();
        // Started 1000 short of the wrap, so every cursor ended on the far side of it
        assert_eq!(c.prod_tail, (total as u32).wrapping_add(u32::MAX - 1_000));
        assert!(c.prod_tail < 10_000);
        assert!(c.is_consistent(rb.capacity()) && rb.is_empty());
    }

    #[test]
    fn init_rejects_small_or_misaligned_zone() {
        let config = cfg(4, 8, SyncMode::Multi, SyncMode::Multi);
        let zone = HeapZone::new(memsize(&config).unwrap()).unwrap();

        let err = unsafe { RingBuffer::<AcqRel>::init(zone.as_ptr(), 16, &config, "x") }.unwrap_err();
        assert!(matches!(err, RingError::ZoneTooSmall { .. }));

        let err = unsafe {
            RingBuffer::<AcqRel>::init(zone.as_ptr().add(8), zone.size() - 8, &config, "x")
        };
        assert!(err.is_err());
    }

    #[test]
    #[should_panic(expected = "not a multiple")]
    fn partial_element_panics() {
        let (_zone, rb) = heap_ring::<AcqRel>(cfg(4, 8, SyncMode::Multi, SyncMode::Multi));
        unsafe { rb.enqueue_burst(&[0u8; 12]) };
    }
}
