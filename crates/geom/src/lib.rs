//! Procedural geometry: implicit shape parameters to mesh buffers.
//!
//! # Invariants
//! - Generation is pure: no state, no I/O, no error path.
//! - Topology depends on resolution and sweep closure only; points depend on
//!   radii, height and basis.
//! - Published topology is immutable and shared through `Arc`.

pub mod capsule;
mod cache;
mod topology;

pub use cache::{TopologyCache, TopologyKey};
pub use capsule::{
    CapsuleGeometry, MIN_NUM_CAP_AXIAL, MIN_NUM_RADIAL, compute_num_points,
    compute_num_radial_points, generate_points, generate_points_into, generate_topology,
    is_closed_sweep,
};
pub use topology::{MeshBuffers, MeshTopology, TopologyError};
