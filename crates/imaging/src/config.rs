use primforge_geom::{MIN_NUM_CAP_AXIAL, MIN_NUM_RADIAL};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tessellation settings applied to every capsule an adapter generates.
///
/// Missing fields fall back to the defaults when deserialized, so a host can
/// override just the resolution it cares about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Longitude divisions around the spine.
    pub num_radial: usize,
    /// Latitude rings per cap, including the body ring.
    pub num_cap_axial: usize,
    /// Revolution in degrees; anything short of 360 leaves an open seam.
    pub sweep_degrees: f64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            num_radial: 10,
            num_cap_axial: 4,
            sweep_degrees: 360.0,
        }
    }
}

impl AdapterConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.warn_if_degenerate();
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(std::fs::File::open(path)?)?;
        config.warn_if_degenerate();
        Ok(config)
    }

    /// Whether capsules generated with this config have any points at all.
    pub fn is_renderable(&self) -> bool {
        self.num_radial >= MIN_NUM_RADIAL && self.num_cap_axial >= MIN_NUM_CAP_AXIAL
    }

    fn warn_if_degenerate(&self) {
        if !self.is_renderable() {
            tracing::warn!(
                num_radial = self.num_radial,
                num_cap_axial = self.num_cap_axial,
                "resolution below minimum, capsules will be empty"
            );
        }
    }
}
