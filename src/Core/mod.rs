pub mod SharedMemory;
pub mod alloc;
pub mod error;

pub use SharedMemory::{create_heap_zone, create_shared_memory, HeapZone, MemoryZone, RawHandle};
