use glam::{DMat4, DVec4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors from parsing a prim path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("prim path {0:?} must be absolute")]
    NotAbsolute(String),
    #[error("prim path {0:?} contains an empty element")]
    EmptyElement(String),
}

/// Absolute path identifying a prim in the scene description.
///
/// Ordered so that maps keyed by path iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimPath(String);

impl PrimPath {
    /// Parse an absolute path such as `/World/capsule`.
    pub fn parse(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(PathError::NotAbsolute(path));
        }
        if path.len() > 1 && path[1..].split('/').any(str::is_empty) {
            return Err(PathError::EmptyElement(path));
        }
        Ok(Self(path))
    }

    /// The pseudo-root `/`.
    pub fn root() -> Self {
        Self("/".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path element, or empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Append a child element.
    pub fn child(&self, name: &str) -> Result<Self, PathError> {
        if self.0 == "/" {
            Self::parse(format!("/{name}"))
        } else {
            Self::parse(format!("{}/{name}", self.0))
        }
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time at which an attribute is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TimeCode {
    /// The authored default value, ignoring time samples.
    #[default]
    Default,
    /// A point on the timeline.
    At(f64),
}

impl TimeCode {
    pub fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<f64> for TimeCode {
    fn from(t: f64) -> Self {
        Self::At(t)
    }
}

/// Spine axis of an implicit shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    /// Parse the authored token (`"X"`, `"Y"`, `"Z"`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "Z" => Some(Self::Z),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        }
    }

    /// Basis mapping the canonical Z spine onto this axis.
    ///
    /// X maps `(x, y, z)` to `(z, x, y)`; Y maps it to `(y, z, x)`; Z is the
    /// identity. Both are rotations, so winding order is preserved.
    pub fn basis(self) -> DMat4 {
        match self {
            Self::X => DMat4::from_cols(DVec4::Y, DVec4::Z, DVec4::X, DVec4::W),
            Self::Y => DMat4::from_cols(DVec4::Z, DVec4::X, DVec4::Y, DVec4::W),
            Self::Z => DMat4::IDENTITY,
        }
    }
}
