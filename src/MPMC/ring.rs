// src/MPMC/ring.rs

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::Buffer::layout::memsize;
use super::Buffer::sync::{AcqRel, MemoryModel};
use super::Buffer::Buffer_impl::Cursors;
use super::Buffer::RingBuffer;
use super::{Consumer, Producer};
use crate::Core::error::RingError;
use crate::Core::SharedMemory::{create_heap_zone, create_shared_memory, MemoryZone};
use crate::MPMC::Structs::Buffer_Structs::{Backing, RingConfig, SyncMode};

static SHM_SEQ: AtomicU64 = AtomicU64::new(0);

/// State shared by a ring and every handle to it.
pub(crate) struct RingShared<M: MemoryModel> {
    pub(crate) buffer: RingBuffer<M>,
    pub(crate) config: RingConfig,
    pub(crate) backing: Backing,
    producer_claimed: AtomicBool,
    consumer_claimed: AtomicBool,
    // Declared last: the buffer points into it
    _zone: Box<dyn MemoryZone>,
}

impl<M: MemoryModel> Drop for RingShared<M> {
    fn drop(&mut self) {
        tracing::debug!(name = self.buffer.name(), "ring released");
    }
}

/// An owned ring: its memory zone plus the lock-free view over it.
///
/// `Ring` is a cheap, cloneable reference. Data moves through role handles:
/// [`Ring::producer`] and [`Ring::consumer`]. A single-producer (single-consumer)
/// ring hands out at most one live producer (consumer) at a time, which is what
/// makes the store-based head advance of single mode sound.
pub struct Ring<M: MemoryModel = AcqRel> {
    pub(crate) shared: Arc<RingShared<M>>,
}

impl<M: MemoryModel> Clone for Ring<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: MemoryModel> Ring<M> {
    /// Allocate a zone for `config` and lay a fresh ring out in it.
    pub fn with_config(config: RingConfig, name: &str, backing: Backing) -> Result<Self, RingError> {
        let bytes = memsize(&config)?;
        let zone = match backing {
            Backing::Heap => create_heap_zone(bytes)?,
            Backing::SharedMemory => {
                let file = format!(
                    "dmxp_ring.{}.{}.{}",
                    if name.is_empty() { "anon" } else { name },
                    std::process::id(),
                    SHM_SEQ.fetch_add(1, Ordering::Relaxed)
                );
                create_shared_memory(bytes, &file)?
            }
        };

        let buffer = unsafe { RingBuffer::<M>::init(zone.as_ptr(), zone.size(), &config, name)? };

        tracing::debug!(
            name,
            capacity = config.capacity(),
            size = config.size(),
            element_size = config.element_size(),
            producer = ?config.producer(),
            consumer = ?config.consumer(),
            ?backing,
            model = M::NAME,
            bytes,
            "ring created"
        );

        Ok(Self {
            shared: Arc::new(RingShared {
                buffer,
                config,
                backing,
                producer_claimed: AtomicBool::new(false),
                consumer_claimed: AtomicBool::new(false),
                _zone: zone,
            }),
        })
    }

    /// Obtain a producer handle.
    ///
    /// Fails with [`RingError::RoleClaimed`] if the ring is single-producer and
    /// another producer handle is still alive.
    pub fn producer(&self) -> Result<Producer<M>, RingError> {
        let single = self.shared.config.producer().is_single();
        if single && !claim(&self.shared.producer_claimed) {
            tracing::debug!(name = self.name(), "producer role already held");
            return Err(RingError::RoleClaimed("producer"));
        }
        Ok(Producer::new(Arc::clone(&self.shared), single))
    }

    /// Obtain a consumer handle. See [`Ring::producer`].
    pub fn consumer(&self) -> Result<Consumer<M>, RingError> {
        let single = self.shared.config.consumer().is_single();
        if single && !claim(&self.shared.consumer_claimed) {
            tracing::debug!(name = self.name(), "consumer role already held");
            return Err(RingError::RoleClaimed("consumer"));
        }
        Ok(Consumer::new(Arc::clone(&self.shared), single))
    }

    /// Empty the ring by rewinding every cursor to 0.
    ///
    /// Only possible while this is the sole reference to the ring: no other
    /// `Ring` clone, no role handle and no registry entry.
    pub fn reset(&mut self) -> Result<(), RingError> {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => {
                unsafe { shared.buffer.reset() };
                Ok(())
            }
            None => Err(RingError::InUse),
        }
    }

    /// The lock-free view, for callers that manage role exclusivity themselves.
    pub fn buffer(&self) -> &RingBuffer<M> {
        &self.shared.buffer
    }

    pub fn config(&self) -> &RingConfig {
        &self.shared.config
    }

    pub fn backing(&self) -> Backing {
        self.shared.backing
    }

    pub fn name(&self) -> &str {
        self.shared.buffer.name()
    }

    /// Entries currently published.
    pub fn count(&self) -> u32 {
        self.shared.buffer.count()
    }

    pub fn free_count(&self) -> u32 {
        self.shared.buffer.free_count()
    }

    pub fn capacity(&self) -> u32 {
        self.shared.buffer.capacity()
    }

    pub fn size(&self) -> u32 {
        self.shared.buffer.size()
    }

    pub fn element_size(&self) -> u32 {
        self.shared.buffer.element_size()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.shared.buffer.is_full()
    }

    pub fn producer_mode(&self) -> SyncMode {
        self.shared.config.producer()
    }

    pub fn consumer_mode(&self) -> SyncMode {
        self.shared.config.consumer()
    }

    pub fn cursors(&self) -> Cursors {
        self.shared.buffer.cursors()
    }

    /// Human-readable state dump.
    pub fn dump(&self) -> String {
        crate::Debug::StructDebug::dump_ring(&self.shared.buffer)
    }

    /// Live references to the ring: `Ring` clones, role handles and registry entries.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// Whether two references point at the same ring.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<M: MemoryModel> RingShared<M> {
    pub(crate) fn release_producer(&self) {
        self.producer_claimed.store(false, Ordering::Release);
    }

    pub(crate) fn release_consumer(&self) {
        self.consumer_claimed.store(false, Ordering::Release);
    }
}

impl<M: MemoryModel> fmt::Debug for Ring<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_ring(self, f)
    }
}

fn claim(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
}
