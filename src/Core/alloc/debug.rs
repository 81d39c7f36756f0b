use super::*;
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl<M: MemoryModel> fmt::Debug for RingRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_ring_registry(self, f)
    }
}
