//! Scene description: the narrow read interface adapters consume, plus an
//! in-memory stage implementing it.
//!
//! # Invariants
//! - Adapters only read through [`SceneDescription`]; they never mutate it.
//! - Every mutation of a [`MemoryStage`] appends a [`StageEvent`].
//! - Prim iteration order is deterministic (BTreeMap).

mod stage;
mod value;

pub use stage::{Attribute, MemoryStage, PrimData, StageEvent};
pub use value::Value;

use primforge_common::{PrimPath, TimeCode};

/// Errors from reading or writing scene description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error("prim {0} not found")]
    PrimNotFound(PrimPath),
    #[error("attribute {attribute} not authored on {path}")]
    AttributeNotFound { path: PrimPath, attribute: String },
    #[error("attribute {attribute} on {path} has no value at {time:?}")]
    NoValue {
        path: PrimPath,
        attribute: String,
        time: TimeCode,
    },
    #[error("attribute {attribute} on {path} holds {found}, expected {expected}")]
    TypeMismatch {
        path: PrimPath,
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Read access to a time-sampled scene description.
///
/// This is the whole surface adapters see: typed prims, attribute values at a
/// time, and whether an attribute can change over time.
pub trait SceneDescription {
    /// Schema type name of the prim, if it exists and is typed.
    fn prim_type(&self, path: &PrimPath) -> Option<&str>;

    /// All prim paths, in deterministic order.
    fn prim_paths(&self) -> Vec<PrimPath>;

    /// Names of the attributes authored on a prim.
    fn attribute_names(&self, path: &PrimPath) -> Vec<String>;

    /// Resolve an attribute's value at `time`.
    fn attribute_value(
        &self,
        path: &PrimPath,
        attribute: &str,
        time: TimeCode,
    ) -> Result<Value, StageError>;

    /// True when the attribute has more than one time sample or is driven by
    /// value clips.
    fn is_attribute_time_varying(&self, path: &PrimPath, attribute: &str) -> bool;

    /// Whether the prim is typed as `type_name`.
    fn is_a(&self, path: &PrimPath, type_name: &str) -> bool {
        self.prim_type(path) == Some(type_name)
    }

    fn get_double(
        &self,
        path: &PrimPath,
        attribute: &str,
        time: TimeCode,
    ) -> Result<f64, StageError> {
        let value = self.attribute_value(path, attribute, time)?;
        value.as_double().ok_or_else(|| StageError::TypeMismatch {
            path: path.clone(),
            attribute: attribute.to_string(),
            expected: "double",
            found: value.type_name(),
        })
    }

    fn get_token(
        &self,
        path: &PrimPath,
        attribute: &str,
        time: TimeCode,
    ) -> Result<String, StageError> {
        match self.attribute_value(path, attribute, time)? {
            Value::Token(token) => Ok(token),
            other => Err(StageError::TypeMismatch {
                path: path.clone(),
                attribute: attribute.to_string(),
                expected: "token",
                found: other.type_name(),
            }),
        }
    }
}
