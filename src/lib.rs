// Module naming follows project convention (MPMC = Multi-Producer Multi-Consumer)
#[allow(non_snake_case)]
pub mod MPMC;

#[allow(non_snake_case)]
pub mod Core;

#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub mod ffi;

pub use Core::error::RingError;
pub use Core::alloc::RingRegistry;
pub use MPMC::{Consumer, Producer, Ring, RingBuilder};
pub use MPMC::Buffer::sync::{AcqRel, Fenced, MemoryModel};
pub use MPMC::Buffer::Buffer_impl::Cursors;
pub use MPMC::Structs::{Backing, Behavior, RingConfig, SyncMode, Transfer};
