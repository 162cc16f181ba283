use glam::Vec3;
use primforge_common::{PrimPath, TimeCode};
use primforge_geom::{MeshTopology, TopologyCache};
use primforge_stage::SceneDescription;
use std::fmt;
use std::sync::Arc;

use crate::change::capsule_property_change;
use crate::config::AdapterConfig;
use crate::data_source::{CapsuleDataSource, ContainerDataSource};
use crate::dirty::DirtyBits;
use crate::locator::LocatorSet;
use crate::render_index::RenderIndex;
use crate::resolver::{CapsuleVariant, ShapeParameters, read_shape_parameters};
use crate::tokens;
use crate::variability::VariabilityState;

/// Named sub-component of a prim's imaging output. The empty name stands for
/// the prim itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subprim(String);

impl Subprim {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subprim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Translates one family of scene prims into renderer-consumable data.
///
/// Adapters hold no per-prim state: whatever must persist between calls (the
/// variability record) is owned by the caller and passed in. One adapter
/// instance serves every prim of its types and may be shared across threads.
pub trait PrimAdapter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether `index` can accept the render prims this adapter produces.
    fn is_supported(&self, index: &dyn RenderIndex) -> bool;

    /// Register the render prim for `path`. Returns the render prim's path.
    fn populate(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        index: &mut dyn RenderIndex,
    ) -> PrimPath;

    /// Material the render prim of `path` is bound to, if any.
    fn material(&self, stage: &dyn SceneDescription, path: &PrimPath) -> Option<PrimPath>;

    /// Record which output categories of `path` vary over time.
    fn track_variability(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        state: &mut VariabilityState,
    );

    /// Outputs invalidated by an edit to `property`.
    fn process_property_change(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        property: &str,
    ) -> DirtyBits;

    fn points(&self, stage: &dyn SceneDescription, path: &PrimPath, time: TimeCode) -> Vec<Vec3>;

    fn topology(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        time: TimeCode,
    ) -> Arc<MeshTopology>;

    fn imaging_subprims(&self, stage: &dyn SceneDescription, path: &PrimPath) -> Vec<Subprim>;

    fn imaging_subprim_type(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        subprim: &Subprim,
    ) -> Option<&'static str>;

    fn imaging_subprim_data<'a>(
        &'a self,
        stage: &'a dyn SceneDescription,
        path: &PrimPath,
        subprim: &Subprim,
        time: TimeCode,
    ) -> Option<Box<dyn ContainerDataSource + 'a>>;

    /// Data source locators made stale by edits to `properties`.
    fn invalidate_imaging_subprim(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        subprim: &Subprim,
        properties: &[&str],
    ) -> LocatorSet;
}

/// Variability tracking shared by every geometric prim: transform,
/// visibility, extent and primvars.
pub fn track_gprim_variability(
    stage: &dyn SceneDescription,
    path: &PrimPath,
    state: &mut VariabilityState,
) {
    for attribute in stage.attribute_names(path) {
        let category = if attribute == tokens::XFORM_OP_ORDER
            || attribute.starts_with(tokens::XFORM_OP_PREFIX)
        {
            DirtyBits::TRANSFORM
        } else if attribute == tokens::VISIBILITY {
            DirtyBits::VISIBILITY
        } else if attribute == tokens::EXTENT {
            DirtyBits::EXTENT
        } else if attribute.starts_with(tokens::PRIMVARS_PREFIX) {
            DirtyBits::PRIMVAR
        } else {
            continue;
        };
        state.check_and_mark_varying(stage, path, &attribute, category);
    }
}

/// Adapter for both capsule schema versions.
#[derive(Debug, Default)]
pub struct CapsuleAdapter {
    config: AdapterConfig,
    topology_cache: Arc<TopologyCache>,
}

impl CapsuleAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self::with_cache(config, Arc::new(TopologyCache::new()))
    }

    /// Adapter sharing an existing topology cache.
    pub fn with_cache(config: AdapterConfig, topology_cache: Arc<TopologyCache>) -> Self {
        Self {
            config,
            topology_cache,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn topology_cache(&self) -> &Arc<TopologyCache> {
        &self.topology_cache
    }
}

impl PrimAdapter for CapsuleAdapter {
    fn name(&self) -> &'static str {
        "capsule"
    }

    fn is_supported(&self, index: &dyn RenderIndex) -> bool {
        index.is_rprim_type_supported(tokens::MESH)
    }

    fn populate(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        index: &mut dyn RenderIndex,
    ) -> PrimPath {
        let material = self.material(stage, path);
        tracing::debug!(prim = %path, ?material, "inserting mesh rprim");
        index.insert_rprim(tokens::MESH, path, material);
        path.clone()
    }

    fn material(&self, stage: &dyn SceneDescription, path: &PrimPath) -> Option<PrimPath> {
        let target = stage
            .get_token(path, tokens::MATERIAL_BINDING, TimeCode::Default)
            .ok()?;
        match PrimPath::parse(&target) {
            Ok(material) => Some(material),
            Err(error) => {
                tracing::warn!(prim = %path, %target, %error, "ignoring material binding");
                None
            }
        }
    }

    fn track_variability(
        &self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        state: &mut VariabilityState,
    ) {
        track_gprim_variability(stage, path, state);
        let Some(variant) = CapsuleVariant::resolve(stage, path) else {
            return;
        };
        for attribute in variant.shape_attributes() {
            state.check_and_mark_varying(stage, path, attribute, DirtyBits::POINTS);
        }
    }

    fn process_property_change(
        &self,
        _stage: &dyn SceneDescription,
        _path: &PrimPath,
        property: &str,
    ) -> DirtyBits {
        capsule_property_change(property)
    }

    fn points(&self, stage: &dyn SceneDescription, path: &PrimPath, time: TimeCode) -> Vec<Vec3> {
        read_shape_parameters(stage, path, time, &self.config).generate_points()
    }

    fn topology(
        &self,
        _stage: &dyn SceneDescription,
        _path: &PrimPath,
        _time: TimeCode,
    ) -> Arc<MeshTopology> {
        // Topology depends only on resolution, which comes from config.
        let key = ShapeParameters::with_config(&self.config).topology_key();
        self.topology_cache.get_or_generate(key)
    }

    fn imaging_subprims(&self, _stage: &dyn SceneDescription, _path: &PrimPath) -> Vec<Subprim> {
        vec![Subprim::default()]
    }

    fn imaging_subprim_type(
        &self,
        _stage: &dyn SceneDescription,
        _path: &PrimPath,
        subprim: &Subprim,
    ) -> Option<&'static str> {
        subprim.is_empty().then_some(tokens::CAPSULE_SUBPRIM_TYPE)
    }

    fn imaging_subprim_data<'a>(
        &'a self,
        stage: &'a dyn SceneDescription,
        path: &PrimPath,
        subprim: &Subprim,
        time: TimeCode,
    ) -> Option<Box<dyn ContainerDataSource + 'a>> {
        if !subprim.is_empty() {
            return None;
        }
        Some(Box::new(CapsuleDataSource::new(
            stage,
            path.clone(),
            time,
            self.config,
            &self.topology_cache,
        )))
    }

    fn invalidate_imaging_subprim(
        &self,
        _stage: &dyn SceneDescription,
        _path: &PrimPath,
        subprim: &Subprim,
        properties: &[&str],
    ) -> LocatorSet {
        if !subprim.is_empty() {
            return LocatorSet::new();
        }
        CapsuleDataSource::invalidate(properties)
    }
}
