use glam::Vec3;
use primforge_common::PrimPath;
use primforge_geom::{MeshBuffers, MeshTopology};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::dirty::DirtyBits;

/// Renderer-side sink that receives render prims and their geometry.
///
/// The index never reaches back into the scene description; everything it
/// holds was pushed to it by adapters and the delegate.
pub trait RenderIndex {
    fn is_rprim_type_supported(&self, type_name: &str) -> bool;

    /// Register a render prim for `path`.
    fn insert_rprim(&mut self, type_name: &'static str, path: &PrimPath, material: Option<PrimPath>);

    fn remove_rprim(&mut self, path: &PrimPath);

    /// Notify the renderer that cached outputs of `path` are stale.
    fn mark_rprim_dirty(&mut self, path: &PrimPath, bits: DirtyBits);

    /// Rebind the render prim's material. `None` clears the binding.
    fn update_material(&mut self, path: &PrimPath, material: Option<PrimPath>);

    /// Deliver regenerated geometry. `None` leaves that buffer unchanged.
    fn update_mesh(
        &mut self,
        path: &PrimPath,
        points: Option<Vec<Vec3>>,
        topology: Option<Arc<MeshTopology>>,
    );
}

/// A render prim as held by [`MemoryRenderIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rprim {
    pub type_name: &'static str,
    pub material: Option<PrimPath>,
    /// Stale categories reported since the last [`MemoryRenderIndex::take_dirty`].
    pub dirty: DirtyBits,
    pub points: Vec<Vec3>,
    pub topology: Option<Arc<MeshTopology>>,
    pub points_updates: usize,
    pub topology_updates: usize,
}

/// In-memory render index for hosts without a GPU backend and for tests.
#[derive(Debug, Default)]
pub struct MemoryRenderIndex {
    supported: BTreeSet<String>,
    rprims: BTreeMap<PrimPath, Rprim>,
}

impl MemoryRenderIndex {
    pub fn new<'a>(supported: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            supported: supported.into_iter().map(str::to_string).collect(),
            rprims: BTreeMap::new(),
        }
    }

    /// Index supporting the `mesh` rprim type.
    pub fn with_mesh_support() -> Self {
        Self::new([crate::tokens::MESH])
    }

    pub fn rprim_count(&self) -> usize {
        self.rprims.len()
    }

    pub fn rprim(&self, path: &PrimPath) -> Option<&Rprim> {
        self.rprims.get(path)
    }

    pub fn rprims(&self) -> &BTreeMap<PrimPath, Rprim> {
        &self.rprims
    }

    /// Current geometry of a render prim, once both buffers have arrived.
    pub fn mesh(&self, path: &PrimPath) -> Option<MeshBuffers> {
        let rprim = self.rprims.get(path)?;
        let topology = rprim.topology.clone()?;
        Some(MeshBuffers::new(rprim.points.clone(), topology))
    }

    /// Consume the pending dirty notifications for a render prim.
    pub fn take_dirty(&mut self, path: &PrimPath) -> DirtyBits {
        self.rprims
            .get_mut(path)
            .map(|rprim| std::mem::take(&mut rprim.dirty))
            .unwrap_or_default()
    }
}

impl RenderIndex for MemoryRenderIndex {
    fn is_rprim_type_supported(&self, type_name: &str) -> bool {
        self.supported.contains(type_name)
    }

    fn insert_rprim(&mut self, type_name: &'static str, path: &PrimPath, material: Option<PrimPath>) {
        self.rprims.insert(
            path.clone(),
            Rprim {
                type_name,
                material,
                dirty: DirtyBits::CLEAN,
                points: Vec::new(),
                topology: None,
                points_updates: 0,
                topology_updates: 0,
            },
        );
    }

    fn remove_rprim(&mut self, path: &PrimPath) {
        self.rprims.remove(path);
    }

    fn mark_rprim_dirty(&mut self, path: &PrimPath, bits: DirtyBits) {
        if let Some(rprim) = self.rprims.get_mut(path) {
            rprim.dirty |= bits;
        }
    }

    fn update_material(&mut self, path: &PrimPath, material: Option<PrimPath>) {
        match self.rprims.get_mut(path) {
            Some(rprim) => rprim.material = material,
            None => tracing::warn!(prim = %path, "material update for unknown rprim"),
        }
    }

    fn update_mesh(
        &mut self,
        path: &PrimPath,
        points: Option<Vec<Vec3>>,
        topology: Option<Arc<MeshTopology>>,
    ) {
        let Some(rprim) = self.rprims.get_mut(path) else {
            tracing::warn!(prim = %path, "mesh update for unknown rprim");
            return;
        };
        if let Some(points) = points {
            rprim.points = points;
            rprim.points_updates += 1;
        }
        if let Some(topology) = topology {
            rprim.topology = Some(topology);
            rprim.topology_updates += 1;
        }
    }
}

impl fmt::Display for MemoryRenderIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Render Index ({} rprims) ===", self.rprims.len())?;
        for (path, rprim) in &self.rprims {
            let faces = rprim.topology.as_ref().map_or(0, |t| t.face_count());
            writeln!(
                f,
                "  {path} [{}] points={} faces={} dirty={:?}",
                rprim.type_name,
                rprim.points.len(),
                faces,
                rprim.dirty
            )?;
        }
        Ok(())
    }
}
