//! Schema type names, attribute names and data source locator names.

/// Legacy single-radius capsule schema.
pub const CAPSULE: &str = "Capsule";
/// Dual-radius capsule schema.
pub const CAPSULE_1: &str = "Capsule_1";

pub const HEIGHT: &str = "height";
pub const RADIUS: &str = "radius";
pub const RADIUS_BOTTOM: &str = "radiusBottom";
pub const RADIUS_TOP: &str = "radiusTop";
pub const AXIS: &str = "axis";

pub const VISIBILITY: &str = "visibility";
pub const EXTENT: &str = "extent";
pub const DOUBLE_SIDED: &str = "doubleSided";
pub const XFORM_OP_ORDER: &str = "xformOpOrder";
pub const XFORM_OP_PREFIX: &str = "xformOp:";
pub const PRIMVARS_PREFIX: &str = "primvars:";
pub const MATERIAL_BINDING: &str = "material:binding";

/// Rprim type the capsule adapter inserts into the render index.
pub const MESH: &str = "mesh";
/// Subprim type reported for the capsule's single imaging subprim.
pub const CAPSULE_SUBPRIM_TYPE: &str = "capsule";
