//! Property-change processing: which cached outputs an edited attribute
//! invalidates.

use crate::dirty::DirtyBits;
use crate::resolver::is_shape_attribute;
use crate::tokens;

/// Mapping shared by every geometric prim adapter.
///
/// Names it does not recognize dirty everything: an unmapped property is
/// never assumed harmless.
pub fn gprim_property_change(property: &str) -> DirtyBits {
    match property {
        tokens::VISIBILITY => DirtyBits::VISIBILITY,
        tokens::EXTENT => DirtyBits::EXTENT,
        tokens::DOUBLE_SIDED => DirtyBits::DOUBLE_SIDED,
        tokens::XFORM_OP_ORDER => DirtyBits::TRANSFORM,
        tokens::MATERIAL_BINDING => DirtyBits::MATERIAL_ID,
        p if p.starts_with(tokens::XFORM_OP_PREFIX) => DirtyBits::TRANSFORM,
        p if p.starts_with(tokens::MATERIAL_BINDING) => DirtyBits::MATERIAL_ID,
        p if p.starts_with(tokens::PRIMVARS_PREFIX) => DirtyBits::PRIMVAR,
        _ => DirtyBits::ALL_DIRTY,
    }
}

/// Capsule mapping: the height/radius/axis family only moves points; the
/// rest falls through to [`gprim_property_change`].
pub fn capsule_property_change(property: &str) -> DirtyBits {
    if is_shape_attribute(property) {
        DirtyBits::POINTS
    } else {
        gprim_property_change(property)
    }
}
