use glam::DVec3;
use serde::{Deserialize, Serialize};

/// An attribute value held by the scene description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Token(String),
    Vec3(DVec3),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Token(_) => "token",
            Self::Vec3(_) => "double3",
        }
    }

    /// Numeric view; ints widen to double.
    pub fn as_double(&self) -> Option<f64> {
        match *self {
            Self::Double(v) => Some(v),
            Self::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(t) => Some(t),
            _ => None,
        }
    }

    /// Blend between two samples. Doubles and vectors interpolate linearly;
    /// everything else holds the earlier sample.
    pub fn lerp(&self, other: &Self, alpha: f64) -> Self {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => Self::Double(a + (b - a) * alpha),
            (Self::Vec3(a), Self::Vec3(b)) => Self::Vec3(a.lerp(*b, alpha)),
            _ => self.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<DVec3> for Value {
    fn from(v: DVec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Token(v.to_string())
    }
}
