use std::collections::HashMap;

use crate::Core::error::RingError;
use crate::MPMC::Buffer::sync::{AcqRel, MemoryModel};
use crate::MPMC::{Ring, RingBuilder};
mod debug;
mod getters;

// Use parking_lot's Mutex for better performance
use parking_lot::Mutex;

/// Default maximum number of rings one registry tracks.
pub const MAX_RINGS: usize = 256;

/// A table of named rings.
///
/// The registry is an ordinary value: whoever builds rings passes it in
/// explicitly (see [`RingBuilder::build_in`]). It keeps each registered ring
/// alive until [`RingRegistry::free`] is called; the ring's memory is released
/// once the last handle to it drops.
pub struct RingRegistry<M: MemoryModel = AcqRel> {
    rings: Mutex<HashMap<String, Ring<M>>>,
    max_rings: usize,
}

impl<M: MemoryModel> Default for RingRegistry<M> {
    fn default() -> Self {
        Self::with_limit(MAX_RINGS)
    }
}

impl<M: MemoryModel> RingRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that refuses to hold more than `max_rings` rings.
    pub fn with_limit(max_rings: usize) -> Self {
        Self {
            rings: Mutex::new(HashMap::new()),
            max_rings,
        }
    }

    /// Build the ring described by `builder` and register it under its name.
    pub fn create(&self, builder: RingBuilder) -> Result<Ring<M>, RingError> {
        let name = builder.name().to_owned();
        if name.is_empty() {
            return Err(RingError::EmptyName);
        }

        // Hold the table for the whole creation so two creators can't race on a name
        let mut rings = self.rings.lock();

        if rings.contains_key(&name) {
            tracing::debug!(name = %name, "ring name already registered");
            return Err(RingError::NameExists(name));
        }
        if rings.len() >= self.max_rings {
            tracing::warn!(name = %name, limit = self.max_rings, "ring registry full");
            return Err(RingError::RegistryFull(self.max_rings));
        }

        let ring = builder.build_with_model::<M>()?;
        rings.insert(name.clone(), ring.clone());

        tracing::info!(
            name = %name,
            capacity = ring.capacity(),
            element_size = ring.element_size(),
            registered = rings.len(),
            "ring registered"
        );
        Ok(ring)
    }

    /// Find a registered ring by name.
    pub fn lookup(&self, name: &str) -> Option<Ring<M>> {
        self.rings.lock().get(name).cloned()
    }

    /// Remove a ring from the registry.
    ///
    /// Handles that are still alive keep working; the storage goes away with the last of them.
    pub fn free(&self, name: &str) -> Result<(), RingError> {
        match self.rings.lock().remove(name) {
            Some(ring) => {
                tracing::info!(name, live_refs = ring.ref_count() - 1, "ring unregistered");
                Ok(())
            }
            None => Err(RingError::NotFound(name.to_owned())),
        }
    }

    /// Number of registered rings.
    pub fn len(&self) -> usize {
        self.rings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.lock().is_empty()
    }

    /// One line per ring, sorted by name.
    pub fn dump(&self) -> String {
        let rings = self.rings.lock();
        let mut names: Vec<&String> = rings.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| rings[name].dump())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
