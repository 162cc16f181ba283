//! Shared types for the primforge adapter workspace.
//!
//! # Invariants
//! - Prims are referenced by path, never by pointer.
//! - Types here carry no back-reference to the scene description.

mod types;

pub use types::{Axis, PathError, PrimPath, TimeCode};
