mod builder;
mod consumer;
mod producer;
mod ring;

pub use builder::RingBuilder;
pub use consumer::Consumer;
pub use producer::Producer;
pub use ring::Ring;

pub mod Buffer {
    pub mod Buffer;
    pub mod Buffer_impl;
    pub mod layout;
    pub mod sync;
    pub(crate) mod transfer;
    pub use Buffer::RingBuffer; // re-export for stable path
}

pub mod Structs {
    pub mod Buffer_Structs;
    pub use Buffer_Structs::{
        Backing, Behavior, RingConfig, SyncMode, Transfer, RING_F_EXACT_SZ, RING_F_SC_DEQ,
        RING_F_SP_ENQ, RING_SZ_MAX,
    }; // re-export for stable path
}
