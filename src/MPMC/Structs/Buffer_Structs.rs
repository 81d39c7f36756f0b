// Plain configuration and result types shared by the ring, its handles and the C ABI.

use crate::Core::error::RingError;

/// Flag: the ring is single-producer.
pub const RING_F_SP_ENQ: u32 = 0x0001;
/// Flag: the ring is single-consumer.
pub const RING_F_SC_DEQ: u32 = 0x0002;
/// Flag: capacity is exact; storage is rounded up to the next power of two.
pub const RING_F_EXACT_SZ: u32 = 0x0004;

/// Largest storage size (in elements) a ring may have.
pub const RING_SZ_MAX: u32 = 1 << 30;

/// Whether one or many threads may issue operations for a role.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Only one thread ever enqueues (or dequeues). Heads advance with a plain store.
    Single = 0,
    /// Any number of threads may race. Heads advance by compare-and-swap.
    #[default]
    Multi = 1,
}

impl SyncMode {
    #[inline]
    pub fn is_single(self) -> bool {
        matches!(self, SyncMode::Single)
    }
}

/// How a reservation treats a request it cannot fully satisfy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// All or nothing: the result is either the requested count or zero.
    Fixed,
    /// Best effort: move as many elements as currently fit.
    Variable,
}

/// Where a ring's header and storage live.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Backing {
    /// Aligned process heap.
    #[default]
    Heap,
    /// A `/dev/shm` mapping (Linux only).
    SharedMemory,
}

/// Outcome of an enqueue or dequeue.
///
/// `remaining` is the free space left after an enqueue, or the number of
/// entries left after a dequeue, as seen by the reservation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Transfer {
    pub count: u32,
    pub remaining: u32,
}

impl Transfer {
    /// True when nothing was moved.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Validated construction parameters of a ring.
///
/// Only obtainable through [`RingConfig::new`] or [`RingConfig::from_flags`], so every
/// value satisfies the construction contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RingConfig {
    capacity: u32,
    size: u32,
    element_size: u32,
    producer: SyncMode,
    consumer: SyncMode,
    exact: bool,
}

impl RingConfig {
    /// Validate the construction contract.
    ///
    /// Without `exact`, `count` must be a power of two in `[2, RING_SZ_MAX]` and the ring
    /// holds exactly `count` elements. With `exact`, any `count` in `[1, RING_SZ_MAX]` is
    /// accepted and storage is rounded up to the next power of two.
    pub fn new(
        count: u32,
        element_size: u32,
        producer: SyncMode,
        consumer: SyncMode,
        exact: bool,
    ) -> Result<Self, RingError> {
        if element_size == 0 || element_size % 4 != 0 {
            return Err(RingError::InvalidElementSize(element_size));
        }

        let size = if exact {
            if count == 0 || count > RING_SZ_MAX {
                return Err(RingError::InvalidCapacity(count));
            }
            count.next_power_of_two()
        } else {
            if count < 2 || !count.is_power_of_two() || count > RING_SZ_MAX {
                return Err(RingError::InvalidCapacity(count));
            }
            count
        };

        Ok(Self {
            capacity: count,
            size,
            element_size,
            producer,
            consumer,
            exact,
        })
    }

    /// Build a config from the C flag word (`RING_F_*`).
    pub fn from_flags(count: u32, element_size: u32, flags: u32) -> Result<Self, RingError> {
        let (producer, consumer, exact) = split_flags(flags);
        Self::new(count, element_size, producer, consumer, exact)
    }

    /// Usable capacity in elements.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Storage size in elements, always a power of two.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Element width in bytes, a non-zero multiple of 4.
    #[inline]
    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    pub fn producer(&self) -> SyncMode {
        self.producer
    }

    pub fn consumer(&self) -> SyncMode {
        self.consumer
    }

    /// Whether exact sizing (`RING_F_EXACT_SZ`) was requested.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Storage size in bytes.
    #[inline]
    pub fn storage_bytes(&self) -> usize {
        self.size as usize * self.element_size as usize
    }

    /// The C flag word equivalent of this config.
    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.producer.is_single() {
            flags |= RING_F_SP_ENQ;
        }
        if self.consumer.is_single() {
            flags |= RING_F_SC_DEQ;
        }
        if self.exact {
            flags |= RING_F_EXACT_SZ;
        }
        flags
    }
}

/// Check a ring geometry against the construction contract: `size` a power of two in
/// `[1, RING_SZ_MAX]`, `1 <= capacity <= size`, `element_size` a non-zero multiple of 4.
///
/// Used wherever a geometry is about to back real storage, including headers read
/// back from a memory zone.
pub fn check_geometry(capacity: u32, size: u32, element_size: u32) -> Result<(), RingError> {
    if element_size == 0 || element_size % 4 != 0 {
        return Err(RingError::InvalidElementSize(element_size));
    }
    if !size.is_power_of_two() || size > RING_SZ_MAX || capacity == 0 || capacity > size {
        return Err(RingError::InvalidCapacity(capacity));
    }
    Ok(())
}

/// Decode a `RING_F_*` flag word into producer mode, consumer mode and exact sizing.
pub fn split_flags(flags: u32) -> (SyncMode, SyncMode, bool) {
    let mode = |bit: u32| {
        if flags & bit != 0 {
            SyncMode::Single
        } else {
            SyncMode::Multi
        }
    };
    (
        mode(RING_F_SP_ENQ),
        mode(RING_F_SC_DEQ),
        flags & RING_F_EXACT_SZ != 0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Core::SharedMemory::{HeapZone, MemoryZone};
    use crate::MPMC::Buffer::sync::AcqRel;
    use crate::MPMC::Buffer::RingBuffer;
    use crate::MPMC::Ring;

    // Hand-built configs that skip `RingConfig::new`
    fn raw(capacity: u32, size: u32, element_size: u32) -> RingConfig {
        RingConfig {
            capacity,
            size,
            element_size,
            producer: SyncMode::Single,
            consumer: SyncMode::Single,
            exact: false,
        }
    }

    #[test]
    fn geometry_check_rejects_broken_shapes() {
        assert!(check_geometry(4, 4, 4).is_ok());
        assert!(check_geometry(5, 8, 12).is_ok());
        assert!(check_geometry(1, 1, 4).is_ok());

        assert!(matches!(check_geometry(8, 4, 4), Err(RingError::InvalidCapacity(8))));
        assert!(matches!(check_geometry(0, 4, 4), Err(RingError::InvalidCapacity(0))));
        assert!(matches!(check_geometry(1, 0, 4), Err(RingError::InvalidCapacity(1))));
        assert!(matches!(check_geometry(6, 6, 4), Err(RingError::InvalidCapacity(6))));
        assert!(check_geometry(4, RING_SZ_MAX << 1, 4).is_err());
        assert!(matches!(check_geometry(4, 4, 6), Err(RingError::InvalidElementSize(6))));
        assert!(matches!(check_geometry(4, 4, 0), Err(RingError::InvalidElementSize(0))));
    }

    #[test]
    fn init_rejects_capacity_beyond_storage() {
        let zone = HeapZone::new(4096).unwrap();
        for bad in [raw(8, 4, 4), raw(4, 0, 4), raw(3, 3, 4), raw(4, 4, 2)] {
            let res = unsafe { RingBuffer::<AcqRel>::init(zone.as_ptr(), zone.size(), &bad, "bad") };
            assert!(res.is_err(), "{bad:?} was accepted");
        }
    }

    #[test]
    fn owned_ring_rejects_capacity_beyond_storage() {
        let res = Ring::<AcqRel>::with_config(raw(8, 4, 4), "bad", Backing::Heap);
        assert!(matches!(res, Err(RingError::InvalidCapacity(8))));

        assert!(Ring::<AcqRel>::with_config(raw(4, 4, 4), "ok", Backing::Heap).is_ok());
    }

    #[test]
    fn exact_flag_survives_power_of_two_capacity() {
        let config = RingConfig::new(8, 4, SyncMode::Multi, SyncMode::Multi, true).unwrap();
        assert_eq!(config.size(), 8);
        assert!(config.is_exact());
        assert_eq!(config.flags(), RING_F_EXACT_SZ);

        let config = RingConfig::from_flags(16, 8, RING_F_SP_ENQ).unwrap();
        assert!(!config.is_exact());
        assert_eq!(config.flags(), RING_F_SP_ENQ);
    }
}
