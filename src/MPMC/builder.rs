use super::Buffer::sync::{AcqRel, MemoryModel};
use super::Ring;
use crate::Core::alloc::RingRegistry;
use crate::Core::error::RingError;
use crate::MPMC::Structs::Buffer_Structs::{split_flags, Backing, RingConfig, SyncMode};

/// Configures and constructs a [`Ring`].
///
/// ```
/// use dmxp_ring::{RingBuilder, SyncMode};
///
/// let ring = RingBuilder::new()
///     .with_capacity(1024)
///     .with_element_size(16)
///     .with_consumer(SyncMode::Single)
///     .build()
///     .unwrap();
/// assert_eq!(ring.free_count(), 1024);
/// ```
#[derive(Clone, Debug)]
pub struct RingBuilder {
    capacity: u32,
    element_size: u32,
    producer: SyncMode,
    consumer: SyncMode,
    exact_size: bool,
    name: String,
    backing: Backing,
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self {
            capacity: 1024,  // 1024 slots
            element_size: 8, // one pointer / handle
            producer: SyncMode::Multi,
            consumer: SyncMode::Multi,
            exact_size: false,
            name: String::new(),
            backing: Backing::Heap,
        }
    }
}

impl RingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements the ring holds.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Element width in bytes; a non-zero multiple of 4.
    pub fn with_element_size(mut self, element_size: u32) -> Self {
        self.element_size = element_size;
        self
    }

    pub fn with_producer(mut self, mode: SyncMode) -> Self {
        self.producer = mode;
        self
    }

    pub fn with_consumer(mut self, mode: SyncMode) -> Self {
        self.consumer = mode;
        self
    }

    /// Accept any capacity, rounding storage up to a power of two internally.
    pub fn with_exact_size(mut self, exact: bool) -> Self {
        self.exact_size = exact;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_backing(mut self, backing: Backing) -> Self {
        self.backing = backing;
        self
    }

    /// Apply a `RING_F_*` flag word on top of the current settings.
    pub fn with_flags(self, flags: u32) -> Self {
        let (producer, consumer, exact) = split_flags(flags);
        self.with_producer(producer)
            .with_consumer(consumer)
            .with_exact_size(exact)
    }

    /// Validate the settings without allocating.
    pub fn config(&self) -> Result<RingConfig, RingError> {
        RingConfig::new(
            self.capacity,
            self.element_size,
            self.producer,
            self.consumer,
            self.exact_size,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backing(&self) -> Backing {
        self.backing
    }

    /// Build a standalone ring using acquire/release ordering.
    pub fn build(self) -> Result<Ring, RingError> {
        self.build_with_model::<AcqRel>()
    }

    /// Build a standalone ring with an explicit ordering strategy.
    pub fn build_with_model<M: MemoryModel>(self) -> Result<Ring<M>, RingError> {
        let config = self.config()?;
        Ring::with_config(config, &self.name, self.backing)
    }

    /// Build a ring and register it under its name.
    pub fn build_in<M: MemoryModel>(self, registry: &RingRegistry<M>) -> Result<Ring<M>, RingError> {
        registry.create(self)
    }
}
