use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Invariant violations found by [`MeshTopology::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("face vertex counts sum to {counted}, but there are {indices} indices")]
    CountMismatch { counted: usize, indices: usize },
    #[error("face vertex index {index} out of range for {num_points} points")]
    IndexOutOfRange { index: u32, num_points: usize },
}

/// Face/vertex connectivity, independent of vertex positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshTopology {
    pub face_vertex_counts: Vec<u32>,
    pub face_vertex_indices: Vec<u32>,
}

impl MeshTopology {
    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.face_vertex_counts.is_empty()
    }

    /// Check `sum(counts) == len(indices)` and that every index addresses one of
    /// `num_points` points.
    pub fn validate(&self, num_points: usize) -> Result<(), TopologyError> {
        let counted: usize = self.face_vertex_counts.iter().map(|&c| c as usize).sum();
        if counted != self.face_vertex_indices.len() {
            return Err(TopologyError::CountMismatch {
                counted,
                indices: self.face_vertex_indices.len(),
            });
        }
        if let Some(&index) = self
            .face_vertex_indices
            .iter()
            .find(|&&i| i as usize >= num_points)
        {
            return Err(TopologyError::IndexOutOfRange { index, num_points });
        }
        Ok(())
    }

    /// Iterate faces as index slices.
    pub fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        let mut start = 0usize;
        self.face_vertex_counts.iter().map(move |&count| {
            let end = start + count as usize;
            let face = &self.face_vertex_indices[start..end];
            start = end;
            face
        })
    }

    /// Index buffer as raw bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.face_vertex_indices)
    }
}

/// Generated mesh: per-instance points plus shared topology.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffers {
    pub points: Vec<Vec3>,
    pub topology: Arc<MeshTopology>,
}

impl MeshBuffers {
    pub fn new(points: Vec<Vec3>, topology: Arc<MeshTopology>) -> Self {
        Self { points, topology }
    }

    pub fn validate(&self) -> Result<(), TopologyError> {
        self.topology.validate(self.points.len())
    }

    /// Point buffer as raw bytes for upload.
    pub fn point_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }
}
