use primforge_common::{PrimPath, TimeCode};
use primforge_stage::{SceneDescription, StageEvent};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapter::PrimAdapter;
use crate::dirty::DirtyBits;
use crate::registry::AdapterRegistry;
use crate::render_index::RenderIndex;
use crate::variability::VariabilityState;

/// Per-prim state owned by the delegate on behalf of its adapter.
struct PrimEntry {
    adapter: Arc<dyn PrimAdapter>,
    variability: VariabilityState,
    dirty: DirtyBits,
}

/// Host that drives adapters: populates prims into a render index, routes
/// stage edits through change processing, and syncs dirty geometry.
///
/// Per-prim state lives here, keyed by path. It is created on populate and
/// dropped on removal; adapters stay stateless.
pub struct ImagingDelegate {
    registry: AdapterRegistry,
    prims: BTreeMap<PrimPath, PrimEntry>,
    time: TimeCode,
}

impl ImagingDelegate {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            prims: BTreeMap::new(),
            time: TimeCode::Default,
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn time(&self) -> TimeCode {
        self.time
    }

    pub fn prim_count(&self) -> usize {
        self.prims.len()
    }

    pub fn is_populated(&self, path: &PrimPath) -> bool {
        self.prims.contains_key(path)
    }

    /// Variability record of a populated prim.
    pub fn variability(&self, path: &PrimPath) -> Option<VariabilityState> {
        self.prims.get(path).map(|entry| entry.variability)
    }

    /// Outputs of a populated prim awaiting the next [`sync`](Self::sync).
    pub fn dirty_bits(&self, path: &PrimPath) -> Option<DirtyBits> {
        self.prims.get(path).map(|entry| entry.dirty)
    }

    /// Populate every prim of the stage that has a registered adapter.
    /// Returns the number of prims populated.
    pub fn populate(&mut self, stage: &dyn SceneDescription, index: &mut dyn RenderIndex) -> usize {
        let _span = tracing::info_span!("populate").entered();
        let populated = stage
            .prim_paths()
            .iter()
            .filter(|path| self.populate_prim(stage, path, index))
            .count();
        tracing::info!(populated, total = self.prims.len(), "populate finished");
        populated
    }

    fn populate_prim(
        &mut self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        index: &mut dyn RenderIndex,
    ) -> bool {
        let Some(type_name) = stage.prim_type(path) else {
            return false;
        };
        let Some(adapter) = self.registry.adapter_for(type_name).cloned() else {
            tracing::trace!(prim = %path, type_name, "no adapter registered");
            return false;
        };
        if !adapter.is_supported(index) {
            tracing::warn!(prim = %path, adapter = adapter.name(), "render index cannot image prim");
            return false;
        }

        adapter.populate(stage, path, index);
        let mut variability = VariabilityState::new();
        adapter.track_variability(stage, path, &mut variability);
        index.mark_rprim_dirty(path, DirtyBits::ALL_DIRTY);
        tracing::debug!(prim = %path, varying = ?variability.bits(), "populated prim");

        self.prims.insert(
            path.clone(),
            PrimEntry {
                adapter,
                variability,
                dirty: DirtyBits::ALL_DIRTY,
            },
        );
        true
    }

    /// Tear down a populated prim, dropping its variability record.
    pub fn remove_prim(&mut self, path: &PrimPath, index: &mut dyn RenderIndex) -> bool {
        if self.prims.remove(path).is_none() {
            return false;
        }
        index.remove_rprim(path);
        tracing::debug!(prim = %path, "removed prim");
        true
    }

    /// Route stage change notifications to the affected prims.
    pub fn apply_events(
        &mut self,
        stage: &dyn SceneDescription,
        events: &[StageEvent],
        index: &mut dyn RenderIndex,
    ) {
        let _span = tracing::info_span!("apply_events", count = events.len()).entered();
        for event in events {
            match event {
                StageEvent::PrimDefined { path, .. } => {
                    // A retype may change the adapter; rebuild from scratch.
                    self.remove_prim(path, index);
                    self.populate_prim(stage, path, index);
                }
                StageEvent::PrimRemoved { path } => {
                    self.remove_prim(path, index);
                }
                StageEvent::AttributeChanged { path, attribute } => {
                    self.property_changed(stage, path, attribute, index);
                }
            }
        }
    }

    fn property_changed(
        &mut self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        attribute: &str,
        index: &mut dyn RenderIndex,
    ) {
        let Some(entry) = self.prims.get_mut(path) else {
            return;
        };
        let bits = entry.adapter.process_property_change(stage, path, attribute);
        // The edit may have introduced samples; flags only ever accumulate.
        entry
            .adapter
            .track_variability(stage, path, &mut entry.variability);
        entry.dirty |= bits;
        index.mark_rprim_dirty(path, bits);
        tracing::debug!(prim = %path, attribute, dirty = ?bits, "property changed");
    }

    /// Move to `time`, dirtying every category known to vary.
    pub fn set_time(&mut self, time: TimeCode, index: &mut dyn RenderIndex) {
        if time == self.time {
            return;
        }
        let _span = tracing::info_span!("set_time", ?time).entered();
        self.time = time;
        for (path, entry) in &mut self.prims {
            let varying = entry.variability.bits();
            if varying.is_empty() {
                continue;
            }
            entry.dirty |= varying;
            index.mark_rprim_dirty(path, varying);
            tracing::trace!(prim = %path, ?varying, "time change dirtied prim");
        }
    }

    /// Regenerate dirty outputs into `index`. Returns the number of prims
    /// synced.
    ///
    /// Only points, topology and the material binding are delivered; the
    /// other categories reach the sink solely through the dirty
    /// notifications sent by [`RenderIndex::mark_rprim_dirty`].
    pub fn sync(&mut self, stage: &dyn SceneDescription, index: &mut dyn RenderIndex) -> usize {
        let _span = tracing::info_span!("sync").entered();
        let time = self.time;
        let mut synced = 0;
        for (path, entry) in &mut self.prims {
            if entry.dirty.is_empty() {
                continue;
            }
            let points = entry
                .dirty
                .contains(DirtyBits::POINTS)
                .then(|| entry.adapter.points(stage, path, time));
            let topology = entry
                .dirty
                .contains(DirtyBits::TOPOLOGY)
                .then(|| entry.adapter.topology(stage, path, time));
            if points.is_some() || topology.is_some() {
                index.update_mesh(path, points, topology);
            }
            if entry.dirty.contains(DirtyBits::MATERIAL_ID) {
                index.update_material(path, entry.adapter.material(stage, path));
            }
            entry.dirty = DirtyBits::CLEAN;
            synced += 1;
        }
        tracing::debug!(synced, "sync finished");
        synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use crate::render_index::MemoryRenderIndex;
    use primforge_geom::MeshBuffers;
    use primforge_stage::MemoryStage;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn path(s: &str) -> PrimPath {
        PrimPath::parse(s).unwrap()
    }

    fn delegate() -> ImagingDelegate {
        init_tracing();
        ImagingDelegate::new(AdapterRegistry::with_builtin(AdapterConfig::default()))
    }

    fn populated(stage: &mut MemoryStage) -> (ImagingDelegate, MemoryRenderIndex) {
        stage.drain_events();
        let mut delegate = delegate();
        let mut index = MemoryRenderIndex::with_mesh_support();
        delegate.populate(stage, &mut index);
        delegate.sync(stage, &mut index);
        (delegate, index)
    }

    fn mesh(index: &MemoryRenderIndex, p: &PrimPath) -> MeshBuffers {
        index.mesh(p).unwrap()
    }

    #[test]
    fn legacy_and_dual_radius_produce_identical_meshes() {
        let mut stage = MemoryStage::new();
        let legacy = path("/legacy");
        stage.define_prim(legacy.clone(), "Capsule");
        stage.set_default(&legacy, "height", 2.0).unwrap();
        stage.set_default(&legacy, "radius", 0.5).unwrap();

        let current = path("/current");
        stage.define_prim(current.clone(), "Capsule_1");
        stage.set_default(&current, "height", 2.0).unwrap();
        stage.set_default(&current, "radiusBottom", 0.5).unwrap();
        stage.set_default(&current, "radiusTop", 0.5).unwrap();
        stage.set_default(&current, "axis", "Z").unwrap();

        let (_, index) = populated(&mut stage);
        let a = mesh(&index, &legacy);
        let b = mesh(&index, &current);
        assert!(a.validate().is_ok());
        assert_eq!(a.points, b.points);
        assert_eq!(a.point_bytes(), b.point_bytes());
        assert!(Arc::ptr_eq(&a.topology, &b.topology));
        assert_eq!(a.topology.index_bytes(), b.topology.index_bytes());
    }

    #[test]
    fn populate_skips_unregistered_and_untyped_prims() {
        let mut stage = MemoryStage::new();
        stage.define_prim(path("/World"), "");
        stage.define_prim(path("/World/ball"), "Sphere");
        stage.define_prim(path("/World/capsule"), "Capsule");

        let (delegate, index) = populated(&mut stage);
        assert_eq!(delegate.prim_count(), 1);
        assert!(delegate.is_populated(&path("/World/capsule")));
        assert_eq!(index.rprim_count(), 1);
    }

    #[test]
    fn unsupported_index_populates_nothing() {
        let mut stage = MemoryStage::new();
        stage.define_prim(path("/capsule"), "Capsule");
        let mut delegate = delegate();
        let mut index = MemoryRenderIndex::new(["points"]);
        assert_eq!(delegate.populate(&stage, &mut index), 0);
        assert_eq!(index.rprim_count(), 0);
    }

    #[test]
    fn first_sync_delivers_points_and_topology() {
        let mut stage = MemoryStage::new();
        let p = path("/capsule");
        stage.define_prim(p.clone(), "Capsule");

        stage.drain_events();
        let mut delegate = delegate();
        let mut index = MemoryRenderIndex::with_mesh_support();
        delegate.populate(&stage, &mut index);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::ALL_DIRTY));
        assert_eq!(index.take_dirty(&p), DirtyBits::ALL_DIRTY);

        assert_eq!(delegate.sync(&stage, &mut index), 1);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::CLEAN));
        let rprim = index.rprim(&p).unwrap();
        assert_eq!(rprim.points_updates, 1);
        assert_eq!(rprim.topology_updates, 1);

        assert_eq!(delegate.sync(&stage, &mut index), 0);
    }

    #[test]
    fn time_change_resyncs_only_varying_prims() {
        let mut stage = MemoryStage::new();
        let animated = path("/animated");
        stage.define_prim(animated.clone(), "Capsule");
        stage.set_time_sample(&animated, "height", 0.0, 1.0).unwrap();
        stage.set_time_sample(&animated, "height", 10.0, 3.0).unwrap();
        let still = path("/still");
        stage.define_prim(still.clone(), "Capsule");
        stage.set_default(&still, "height", 1.0).unwrap();

        let (mut delegate, mut index) = populated(&mut stage);
        assert_eq!(
            delegate.variability(&animated).unwrap().bits(),
            DirtyBits::POINTS
        );
        assert!(delegate.variability(&still).unwrap().bits().is_empty());

        delegate.set_time(TimeCode::At(0.0), &mut index);
        delegate.sync(&stage, &mut index);
        let before = mesh(&index, &animated).points;

        delegate.set_time(TimeCode::At(10.0), &mut index);
        assert_eq!(delegate.dirty_bits(&animated), Some(DirtyBits::POINTS));
        assert_eq!(delegate.dirty_bits(&still), Some(DirtyBits::CLEAN));
        assert_eq!(delegate.sync(&stage, &mut index), 1);

        let after = mesh(&index, &animated).points;
        assert_ne!(before, after);
        let top = after[after.len() - 1];
        assert!((top.z - 2.0).abs() < 1e-6);

        let animated_rprim = index.rprim(&animated).unwrap();
        assert_eq!(animated_rprim.points_updates, 3);
        assert_eq!(animated_rprim.topology_updates, 1);
        assert_eq!(index.rprim(&still).unwrap().points_updates, 1);
    }

    #[test]
    fn same_time_is_a_no_op() {
        let mut stage = MemoryStage::new();
        let p = path("/capsule");
        stage.define_prim(p.clone(), "Capsule");
        stage.set_value_clips(&p, "radius", true).unwrap();

        let (mut delegate, mut index) = populated(&mut stage);
        delegate.set_time(TimeCode::Default, &mut index);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::CLEAN));
    }

    #[test]
    fn radius_edit_regenerates_points_but_not_topology() {
        let mut stage = MemoryStage::new();
        let p = path("/capsule");
        stage.define_prim(p.clone(), "Capsule");
        stage.set_default(&p, "radius", 0.5).unwrap();
        let (mut delegate, mut index) = populated(&mut stage);
        let before = mesh(&index, &p);

        stage.set_default(&p, "radius", 1.0).unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::POINTS));
        delegate.sync(&stage, &mut index);

        let after = mesh(&index, &p);
        assert_ne!(before.points, after.points);
        assert!(Arc::ptr_eq(&before.topology, &after.topology));
        assert_eq!(index.rprim(&p).unwrap().topology_updates, 1);
    }

    #[test]
    fn material_rebind_reaches_the_index() {
        let mut stage = MemoryStage::new();
        let p = path("/capsule");
        stage.define_prim(p.clone(), "Capsule");
        stage.set_default(&p, "material:binding", "/Looks/Red").unwrap();
        let (mut delegate, mut index) = populated(&mut stage);
        assert_eq!(index.rprim(&p).unwrap().material, Some(path("/Looks/Red")));

        stage.set_default(&p, "material:binding", "/Looks/Blue").unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::MATERIAL_ID));
        delegate.sync(&stage, &mut index);

        let rprim = index.rprim(&p).unwrap();
        assert_eq!(rprim.material, Some(path("/Looks/Blue")));
        assert_eq!(rprim.points_updates, 1);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::CLEAN));

        stage.clear_attribute(&p, "material:binding").unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        delegate.sync(&stage, &mut index);
        assert_eq!(index.rprim(&p).unwrap().material, None);
    }

    #[test]
    fn transform_edit_is_left_to_dirty_notifications() {
        let mut stage = MemoryStage::new();
        let p = path("/capsule");
        stage.define_prim(p.clone(), "Capsule");
        let (mut delegate, mut index) = populated(&mut stage);
        index.take_dirty(&p);

        stage
            .set_default(&p, "xformOp:translate", glam::DVec3::X)
            .unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert_eq!(delegate.sync(&stage, &mut index), 1);

        let rprim = index.rprim(&p).unwrap();
        assert_eq!(rprim.points_updates, 1);
        assert_eq!(rprim.topology_updates, 1);
        assert_eq!(index.take_dirty(&p), DirtyBits::TRANSFORM);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::CLEAN));
    }

    #[test]
    fn unknown_attribute_edit_dirties_everything() {
        let mut stage = MemoryStage::new();
        let p = path("/capsule");
        stage.define_prim(p.clone(), "Capsule");
        let (mut delegate, mut index) = populated(&mut stage);

        stage.set_default(&p, "someCustomAttr", 1.0).unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert_eq!(delegate.dirty_bits(&p), Some(DirtyBits::ALL_DIRTY));
        assert_eq!(index.take_dirty(&p), DirtyBits::ALL_DIRTY);
    }

    #[test]
    fn edits_accumulate_variability() {
        let mut stage = MemoryStage::new();
        let p = path("/capsule");
        stage.define_prim(p.clone(), "Capsule_1");
        let (mut delegate, mut index) = populated(&mut stage);
        assert!(delegate.variability(&p).unwrap().bits().is_empty());

        stage
            .set_time_sample(&p, "xformOp:translate", 0.0, glam::DVec3::ZERO)
            .unwrap();
        stage
            .set_time_sample(&p, "xformOp:translate", 1.0, glam::DVec3::Y)
            .unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert_eq!(
            delegate.variability(&p).unwrap().bits(),
            DirtyBits::TRANSFORM
        );

        // Making the attribute constant again never clears the flag.
        stage.clear_attribute(&p, "xformOp:translate").unwrap();
        stage.set_time_sample(&p, "radiusTop", 0.0, 0.1).unwrap();
        stage.set_time_sample(&p, "radiusTop", 1.0, 0.2).unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert_eq!(
            delegate.variability(&p).unwrap().bits(),
            DirtyBits::TRANSFORM | DirtyBits::POINTS
        );
    }

    #[test]
    fn removal_drops_prim_state() {
        let mut stage = MemoryStage::new();
        stage.define_prim(path("/World"), "");
        let p = path("/World/capsule");
        stage.define_prim(p.clone(), "Capsule");
        let (mut delegate, mut index) = populated(&mut stage);
        assert!(delegate.variability(&p).is_some());

        stage.remove_prim(&path("/World"));
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert!(delegate.variability(&p).is_none());
        assert_eq!(delegate.prim_count(), 0);
        assert_eq!(index.rprim_count(), 0);
        assert!(!delegate.remove_prim(&p, &mut index));
    }

    #[test]
    fn defined_prims_are_populated_from_events() {
        let mut stage = MemoryStage::new();
        let (mut delegate, mut index) = populated(&mut stage);
        assert_eq!(delegate.prim_count(), 0);

        let p = path("/late");
        stage.define_prim(p.clone(), "Capsule");
        stage.set_default(&p, "axis", "X").unwrap();
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert!(delegate.is_populated(&p));
        delegate.sync(&stage, &mut index);
        let points = mesh(&index, &p).points;
        let top = points[points.len() - 1];
        assert!((top.x - 1.5).abs() < 1e-6);

        // Retyping to something without an adapter tears the prim down.
        stage.define_prim(p.clone(), "Sphere");
        let events = stage.drain_events();
        delegate.apply_events(&stage, &events, &mut index);
        assert!(!delegate.is_populated(&p));
        assert_eq!(index.rprim_count(), 0);
    }
}
