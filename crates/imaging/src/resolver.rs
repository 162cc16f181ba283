//! Capsule parameter resolution across schema versions.
//!
//! Reads never fail: every attribute that cannot be evaluated keeps its
//! built-in default, the problem is logged and recorded as a
//! [`ResolveIssue`], and the remaining attributes are still read.

use glam::Vec3;
use primforge_common::{Axis, PrimPath, TimeCode};
use primforge_geom::{CapsuleGeometry, TopologyKey, generate_points};
use primforge_stage::{SceneDescription, StageError};
use serde::{Deserialize, Serialize};

use crate::config::AdapterConfig;
use crate::tokens;

/// Schema versions of the capsule prim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapsuleVariant {
    /// `Capsule_1`: independent bottom and top radii.
    DualRadius,
    /// `Capsule`: one radius for both caps.
    SingleRadius,
}

impl CapsuleVariant {
    /// Resolution order, newest schema first.
    pub const PRIORITY: [Self; 2] = [Self::DualRadius, Self::SingleRadius];

    pub fn type_name(self) -> &'static str {
        match self {
            Self::DualRadius => tokens::CAPSULE_1,
            Self::SingleRadius => tokens::CAPSULE,
        }
    }

    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|variant| variant.type_name() == type_name)
    }

    /// The variant a prim is typed as, checking each schema in priority order.
    pub fn resolve(stage: &dyn SceneDescription, path: &PrimPath) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|variant| stage.is_a(path, variant.type_name()))
    }

    /// Attributes that shape the points, in the order they are checked.
    pub fn shape_attributes(self) -> &'static [&'static str] {
        match self {
            Self::DualRadius => &[
                tokens::HEIGHT,
                tokens::RADIUS_BOTTOM,
                tokens::RADIUS_TOP,
                tokens::AXIS,
            ],
            Self::SingleRadius => &[tokens::HEIGHT, tokens::RADIUS, tokens::AXIS],
        }
    }
}

/// Whether `attribute` is one of the height/radius/axis family in any schema
/// version.
pub fn is_shape_attribute(attribute: &str) -> bool {
    matches!(
        attribute,
        tokens::HEIGHT | tokens::RADIUS | tokens::RADIUS_BOTTOM | tokens::RADIUS_TOP | tokens::AXIS
    )
}

/// Fully resolved inputs to capsule generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeParameters {
    pub height: f64,
    pub radius_bottom: f64,
    pub radius_top: f64,
    pub axis: Axis,
    pub angular_resolution: usize,
    pub axial_cap_resolution: usize,
    pub sweep_degrees: f64,
}

impl ShapeParameters {
    /// Schema defaults with the resolution taken from `config`.
    pub fn with_config(config: &AdapterConfig) -> Self {
        let defaults = CapsuleGeometry::default();
        Self {
            height: defaults.height,
            radius_bottom: defaults.radius_bottom,
            radius_top: defaults.radius_top,
            axis: Axis::default(),
            angular_resolution: config.num_radial,
            axial_cap_resolution: config.num_cap_axial,
            sweep_degrees: config.sweep_degrees,
        }
    }

    pub fn geometry(&self) -> CapsuleGeometry {
        CapsuleGeometry {
            radius_bottom: self.radius_bottom,
            radius_top: self.radius_top,
            height: self.height,
            sweep_degrees: self.sweep_degrees,
        }
    }

    /// Key of the shared topology these parameters produce.
    pub fn topology_key(&self) -> TopologyKey {
        TopologyKey::new(
            self.angular_resolution,
            self.axial_cap_resolution,
            self.sweep_degrees,
        )
    }

    /// Points in prim space, with the spine rotated onto `axis`.
    pub fn generate_points(&self) -> Vec<Vec3> {
        let basis = self.axis.basis();
        generate_points(
            self.angular_resolution,
            self.axial_cap_resolution,
            &self.geometry(),
            Some(&basis),
        )
    }
}

impl Default for ShapeParameters {
    fn default() -> Self {
        Self::with_config(&AdapterConfig::default())
    }
}

/// A non-fatal problem met while resolving parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveIssue {
    #[error("could not evaluate {attribute} on prim {path}: {source}")]
    MissingAttribute {
        path: PrimPath,
        attribute: &'static str,
        #[source]
        source: StageError,
    },
    #[error("prim {0} is not typed as any capsule schema; using defaults")]
    UnknownVariant(PrimPath),
    #[error("{attribute} on prim {path} is {value}; using the default")]
    NonFinite {
        path: PrimPath,
        attribute: &'static str,
        value: f64,
    },
    #[error("axis {token:?} on prim {path} is not one of X, Y, Z")]
    InvalidAxis { path: PrimPath, token: String },
}

/// Parameters plus everything learned while reading them.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub params: ShapeParameters,
    pub variant: Option<CapsuleVariant>,
    pub issues: Vec<ResolveIssue>,
}

struct Reader<'a> {
    stage: &'a dyn SceneDescription,
    path: &'a PrimPath,
    time: TimeCode,
    issues: Vec<ResolveIssue>,
}

impl Reader<'_> {
    fn missing(&mut self, attribute: &'static str, source: StageError) {
        // Unauthored attributes take the schema fallback; anything else means
        // an authored value could not be evaluated.
        if matches!(source, StageError::AttributeNotFound { .. }) {
            tracing::debug!(prim = %self.path, attribute, "attribute not authored, using fallback");
        } else {
            tracing::warn!(prim = %self.path, attribute, error = %source, "could not evaluate attribute");
        }
        self.issues.push(ResolveIssue::MissingAttribute {
            path: self.path.clone(),
            attribute,
            source,
        });
    }

    fn double(&mut self, attribute: &'static str) -> Option<f64> {
        match self.stage.get_double(self.path, attribute, self.time) {
            Ok(value) if value.is_finite() => Some(value),
            Ok(value) => {
                tracing::warn!(prim = %self.path, attribute, value, "non-finite value, using fallback");
                self.issues.push(ResolveIssue::NonFinite {
                    path: self.path.clone(),
                    attribute,
                    value,
                });
                None
            }
            Err(source) => {
                self.missing(attribute, source);
                None
            }
        }
    }

    fn axis(&mut self) -> Option<Axis> {
        let token = match self.stage.get_token(self.path, tokens::AXIS, self.time) {
            Ok(token) => token,
            Err(source) => {
                self.missing(tokens::AXIS, source);
                return None;
            }
        };
        let axis = Axis::from_token(&token);
        if axis.is_none() {
            tracing::warn!(prim = %self.path, %token, "unsupported axis token");
            self.issues.push(ResolveIssue::InvalidAxis {
                path: self.path.clone(),
                token,
            });
        }
        axis
    }
}

/// Resolve capsule parameters at `time`, reporting every issue met.
pub fn resolve_shape_parameters(
    stage: &dyn SceneDescription,
    path: &PrimPath,
    time: TimeCode,
    config: &AdapterConfig,
) -> Resolution {
    let mut params = ShapeParameters::with_config(config);
    let variant = CapsuleVariant::resolve(stage, path);
    let mut reader = Reader {
        stage,
        path,
        time,
        issues: Vec::new(),
    };

    match variant {
        None => {
            tracing::warn!(prim = %path, "no capsule schema matched, using defaults");
            reader.issues.push(ResolveIssue::UnknownVariant(path.clone()));
        }
        Some(variant) => {
            if let Some(height) = reader.double(tokens::HEIGHT) {
                params.height = height;
            }
            match variant {
                CapsuleVariant::DualRadius => {
                    if let Some(bottom) = reader.double(tokens::RADIUS_BOTTOM) {
                        params.radius_bottom = bottom;
                    }
                    if let Some(top) = reader.double(tokens::RADIUS_TOP) {
                        params.radius_top = top;
                    }
                }
                CapsuleVariant::SingleRadius => {
                    if let Some(radius) = reader.double(tokens::RADIUS) {
                        params.radius_bottom = radius;
                        params.radius_top = radius;
                    }
                }
            }
            if let Some(axis) = reader.axis() {
                params.axis = axis;
            }
        }
    }

    Resolution {
        params,
        variant,
        issues: reader.issues,
    }
}

/// Resolve capsule parameters at `time`. Never fails.
pub fn read_shape_parameters(
    stage: &dyn SceneDescription,
    path: &PrimPath,
    time: TimeCode,
    config: &AdapterConfig,
) -> ShapeParameters {
    resolve_shape_parameters(stage, path, time, config).params
}
