use crossbeam_utils::CachePadded;
use std::mem::size_of;
use std::sync::atomic::AtomicU32;

use crate::Core::error::RingError;
use crate::MPMC::Structs::Buffer_Structs::RingConfig;

/// Maximum ring name length, including the trailing NUL.
pub const RING_NAMESIZE: usize = 32;

/// Identifies an initialized ring header in a memory zone ("DMXPRING").
pub const RING_MAGIC: u64 = 0x444D_5850_5249_4E47;

/// One role's cursor pair.
///
/// `head` is how far slots have been reserved; `tail` is how far they have been
/// filled (or drained) and published. Both only ever grow, wrapping at 2^32.
#[repr(C)]
pub struct HeadTail {
    pub head: AtomicU32,
    pub tail: AtomicU32,
    /// `SyncMode` of this role as its `u32` discriminant.
    pub sync: u32,
}

impl HeadTail {
    pub const fn new(sync: u32) -> Self {
        Self {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            sync,
        }
    }
}

/// The metadata that precedes a ring's element storage in its memory zone.
///
/// The producer and consumer pairs each sit on their own cache line(s) so the
/// two roles never false-share.
#[repr(C, align(128))]
pub struct RingHeader {
    /// [`RING_MAGIC`] once the header has been written.
    pub magic: u64,

    /// NUL-padded ring name.
    pub name: [u8; RING_NAMESIZE],

    /// `RING_F_*` flag word.
    pub flags: u32,

    /// Storage size in elements (power of two).
    pub size: u32,

    /// `size - 1`, applied to cursors to find a slot.
    pub mask: u32,

    /// Usable capacity in elements (`<= size`).
    pub capacity: u32,

    /// Element width in bytes.
    pub esize: u32,

    /// Producer cursors.
    pub prod: CachePadded<HeadTail>,

    /// Consumer cursors.
    pub cons: CachePadded<HeadTail>,
}

impl RingHeader {
    pub fn new(config: &RingConfig, name: &str) -> Result<Self, RingError> {
        Ok(Self {
            magic: RING_MAGIC,
            name: encode_name(name)?,
            flags: config.flags(),
            size: config.size(),
            mask: config.size() - 1,
            capacity: config.capacity(),
            esize: config.element_size(),
            prod: CachePadded::new(HeadTail::new(config.producer() as u32)),
            cons: CachePadded::new(HeadTail::new(config.consumer() as u32)),
        })
    }

    /// The stored name up to its first NUL.
    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(RING_NAMESIZE);
        std::str::from_utf8(&self.name[..len]).unwrap_or("<invalid>")
    }
}

/// Byte offset of element storage from the start of the zone.
#[inline]
pub const fn storage_offset() -> usize {
    size_of::<RingHeader>()
}

/// Bytes a zone must hold for a ring with this config: header plus storage.
pub fn memsize(config: &RingConfig) -> Result<usize, RingError> {
    (config.size() as usize)
        .checked_mul(config.element_size() as usize)
        .and_then(|bytes| bytes.checked_add(storage_offset()))
        .ok_or(RingError::TooLarge {
            size: config.size(),
            element_size: config.element_size(),
        })
}

fn encode_name(name: &str) -> Result<[u8; RING_NAMESIZE], RingError> {
    let bytes = name.as_bytes();
    if bytes.len() >= RING_NAMESIZE {
        return Err(RingError::NameTooLong(name.to_owned()));
    }
    let mut out = [0u8; RING_NAMESIZE];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}
