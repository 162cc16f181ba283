//! Capsule prim adapter: turns capsule scene prims into renderable meshes.
//!
//! # Invariants
//! - Adapters are stateless and shared; per-prim state (variability, pending
//!   dirty bits) is owned by the host and keyed by prim path.
//! - Parameter resolution never fails. Unreadable attributes keep their
//!   schema defaults and are reported as diagnostics.
//! - Variability flags only accumulate; a flagged category is never
//!   re-queried.
//! - Shape edits dirty points only. Topology depends on resolution alone and
//!   is shared by every capsule with the same resolution.
//! - Any property without a known mapping dirties everything.

mod adapter;
mod change;
mod config;
mod data_source;
mod delegate;
mod dirty;
mod locator;
mod registry;
mod render_index;
mod resolver;
pub mod tokens;
mod variability;

pub use adapter::{CapsuleAdapter, PrimAdapter, Subprim, track_gprim_variability};
pub use change::{capsule_property_change, gprim_property_change};
pub use config::{AdapterConfig, ConfigError};
pub use data_source::{CapsuleDataSource, ContainerDataSource, DataValue};
pub use delegate::ImagingDelegate;
pub use dirty::DirtyBits;
pub use locator::{Locator, LocatorSet, locators_for_dirty_bits, names};
pub use registry::AdapterRegistry;
pub use render_index::{MemoryRenderIndex, RenderIndex, Rprim};
pub use resolver::{
    CapsuleVariant, Resolution, ResolveIssue, ShapeParameters, is_shape_attribute,
    read_shape_parameters, resolve_shape_parameters,
};
pub use variability::VariabilityState;
