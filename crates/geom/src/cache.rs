use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::capsule::generate_topology;
use crate::topology::MeshTopology;

/// Everything capsule topology depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopologyKey {
    pub num_radial: usize,
    pub num_cap_axial: usize,
    pub closed_sweep: bool,
}

impl TopologyKey {
    pub fn new(num_radial: usize, num_cap_axial: usize, sweep_degrees: f64) -> Self {
        Self {
            num_radial,
            num_cap_axial,
            closed_sweep: crate::capsule::is_closed_sweep(sweep_degrees),
        }
    }
}

/// Capsule topologies shared across every instance with the same resolution.
///
/// Entries are generated once, published behind an `Arc`, and never mutated
/// afterwards. The lock only guards the map; readers hold no lock while using
/// a topology.
#[derive(Debug, Default)]
pub struct TopologyCache {
    entries: RwLock<HashMap<TopologyKey, Arc<MeshTopology>>>,
}

impl TopologyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the shared topology for `key`, generating it on first use.
    pub fn get_or_generate(&self, key: TopologyKey) -> Arc<MeshTopology> {
        if let Some(topology) = self.entries.read().get(&key) {
            return Arc::clone(topology);
        }
        let mut entries = self.entries.write();
        let topology = entries.entry(key).or_insert_with(|| {
            tracing::debug!(?key, "generating shared capsule topology");
            Arc::new(generate_topology(
                key.num_radial,
                key.num_cap_axial,
                key.closed_sweep,
            ))
        });
        Arc::clone(topology)
    }

    /// Number of distinct topologies published so far.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
