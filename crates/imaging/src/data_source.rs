//! Hierarchical data-source view of an imaging subprim.
//!
//! Values are computed lazily on each `get`; nothing is cached here except
//! the shared topology, which lives in the adapter's [`TopologyCache`].

use glam::Vec3;
use primforge_common::{PrimPath, TimeCode};
use primforge_geom::{MeshTopology, TopologyCache};
use primforge_stage::SceneDescription;
use std::sync::Arc;

use crate::change::gprim_property_change;
use crate::config::AdapterConfig;
use crate::locator::{Locator, LocatorSet, locators_for_dirty_bits, names};
use crate::resolver::{ShapeParameters, is_shape_attribute, read_shape_parameters};
use crate::tokens;

/// A leaf value served by a data source.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Double(f64),
    Token(String),
    Points(Vec<Vec3>),
    Topology(Arc<MeshTopology>),
}

impl DataValue {
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&[Vec3]> {
        match self {
            Self::Points(points) => Some(points),
            _ => None,
        }
    }

    pub fn as_topology(&self) -> Option<&Arc<MeshTopology>> {
        match self {
            Self::Topology(topology) => Some(topology),
            _ => None,
        }
    }
}

/// Read access to named values by locator.
pub trait ContainerDataSource {
    /// Leaf locators this source can serve.
    fn names(&self) -> Vec<Locator>;

    /// Value at `locator`, or `None` if the locator is not served.
    fn get(&self, locator: &Locator) -> Option<DataValue>;
}

/// Data source for the single capsule subprim of a prim.
///
/// Serves the resolved parameters under `capsule/` and the generated mesh
/// under `mesh/topology` and `primvars/points`.
pub struct CapsuleDataSource<'a> {
    stage: &'a dyn SceneDescription,
    path: PrimPath,
    time: TimeCode,
    config: AdapterConfig,
    topology: &'a TopologyCache,
}

impl<'a> CapsuleDataSource<'a> {
    pub fn new(
        stage: &'a dyn SceneDescription,
        path: PrimPath,
        time: TimeCode,
        config: AdapterConfig,
        topology: &'a TopologyCache,
    ) -> Self {
        Self {
            stage,
            path,
            time,
            config,
            topology,
        }
    }

    pub fn path(&self) -> &PrimPath {
        &self.path
    }

    fn params(&self) -> ShapeParameters {
        read_shape_parameters(self.stage, &self.path, self.time, &self.config)
    }

    /// Locators made stale by edits to `properties`.
    ///
    /// A shape attribute invalidates its parameter locator and the generated
    /// points; the legacy `radius` covers both radius locators. Other names go
    /// through the gprim dirty mapping, so an unknown name invalidates
    /// everything.
    pub fn invalidate<S: AsRef<str>>(properties: &[S]) -> LocatorSet {
        let mut set = LocatorSet::new();
        for property in properties {
            let property = property.as_ref();
            if is_shape_attribute(property) {
                if property == tokens::RADIUS {
                    set.insert(names::capsule(tokens::RADIUS_BOTTOM));
                    set.insert(names::capsule(tokens::RADIUS_TOP));
                } else {
                    set.insert(names::capsule(property));
                }
                set.insert(names::points());
            } else {
                set.union(&locators_for_dirty_bits(gprim_property_change(property)));
            }
        }
        set
    }
}

impl ContainerDataSource for CapsuleDataSource<'_> {
    fn names(&self) -> Vec<Locator> {
        vec![
            names::capsule(tokens::HEIGHT),
            names::capsule(tokens::RADIUS_BOTTOM),
            names::capsule(tokens::RADIUS_TOP),
            names::capsule(tokens::AXIS),
            names::topology(),
            names::points(),
        ]
    }

    fn get(&self, locator: &Locator) -> Option<DataValue> {
        let elements: Vec<&str> = locator.elements().iter().map(String::as_str).collect();
        let value = match elements.as_slice() {
            ["capsule", tokens::HEIGHT] => DataValue::Double(self.params().height),
            ["capsule", tokens::RADIUS_BOTTOM] => DataValue::Double(self.params().radius_bottom),
            ["capsule", tokens::RADIUS_TOP] => DataValue::Double(self.params().radius_top),
            ["capsule", tokens::AXIS] => {
                DataValue::Token(self.params().axis.as_token().to_string())
            }
            ["mesh", "topology"] => DataValue::Topology(
                self.topology
                    .get_or_generate(ShapeParameters::with_config(&self.config).topology_key()),
            ),
            ["primvars", "points"] => DataValue::Points(self.params().generate_points()),
            _ => return None,
        };
        Some(value)
    }
}
