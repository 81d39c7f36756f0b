use super::*;

/// Read-only accessors for RingRegistry, mostly for monitoring and tests.
impl<M: MemoryModel> RingRegistry<M> {
    /// Maximum number of rings this registry accepts.
    pub fn limit(&self) -> usize {
        self.max_rings
    }

    /// Whether a ring is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.rings.lock().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rings.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
