use std::io;

use thiserror::Error;

/// Failures reported by ring construction and the registry.
///
/// Running out of room or entries at runtime is not an error; enqueue and
/// dequeue report it through the transferred count.
#[derive(Debug, Error)]
pub enum RingError {
    #[error("invalid ring capacity {0}: must be a power of two in [2, 2^30] (or [1, 2^30] with exact sizing)")]
    InvalidCapacity(u32),

    #[error("invalid element size {0}: must be a non-zero multiple of 4 bytes")]
    InvalidElementSize(u32),

    #[error("ring of {size} x {element_size}-byte elements does not fit in the address space")]
    TooLarge { size: u32, element_size: u32 },

    #[error("ring name {0:?} exceeds {max} bytes", max = crate::MPMC::Buffer::layout::RING_NAMESIZE - 1)]
    NameTooLong(String),

    #[error("registered rings need a non-empty name")]
    EmptyName,

    #[error("a ring named {0:?} already exists")]
    NameExists(String),

    #[error("no ring named {0:?}")]
    NotFound(String),

    #[error("registry is full ({0} rings)")]
    RegistryFull(usize),

    #[error("the {0} role of this single-{0} ring is already held")]
    RoleClaimed(&'static str),

    #[error("ring still has live producer or consumer handles")]
    InUse,

    #[error("memory zone is too small: need {needed} bytes, have {have}")]
    ZoneTooSmall { needed: usize, have: usize },

    #[error("memory zone error: {0}")]
    Zone(#[from] io::Error),
}
