use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Cached render outputs an edit can invalidate.
    ///
    /// Also used per prim to record which outputs are time-varying.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DirtyBits: u32 {
        const POINTS       = 1 << 0;
        const TOPOLOGY     = 1 << 1;
        const TRANSFORM    = 1 << 2;
        const VISIBILITY   = 1 << 3;
        const EXTENT       = 1 << 4;
        const DOUBLE_SIDED = 1 << 5;
        const PRIMVAR      = 1 << 6;
        const MATERIAL_ID  = 1 << 7;
    }
}

impl DirtyBits {
    pub const CLEAN: Self = Self::empty();
    pub const ALL_DIRTY: Self = Self::all();
}

impl Default for DirtyBits {
    fn default() -> Self {
        Self::CLEAN
    }
}
