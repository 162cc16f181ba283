use primforge_common::{PrimPath, TimeCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::Value;
use crate::{SceneDescription, StageError};

/// A change notification produced by every mutation to the stage.
///
/// Consumers drain these to learn which prims and attributes were edited;
/// values are read back through [`SceneDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageEvent {
    /// Prim was created or retyped.
    PrimDefined { path: PrimPath, type_name: String },
    /// Prim was removed.
    PrimRemoved { path: PrimPath },
    /// An attribute's default, samples or clip flag changed.
    AttributeChanged { path: PrimPath, attribute: String },
}

impl StageEvent {
    pub fn path(&self) -> &PrimPath {
        match self {
            Self::PrimDefined { path, .. }
            | Self::PrimRemoved { path }
            | Self::AttributeChanged { path, .. } => path,
        }
    }
}

/// Authored opinions for one attribute: an optional default plus time
/// samples kept sorted by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    default: Option<Value>,
    samples: Vec<(f64, Value)>,
    value_clips: bool,
}

impl Attribute {
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn samples(&self) -> &[(f64, Value)] {
        &self.samples
    }

    pub fn num_time_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn has_value_clips(&self) -> bool {
        self.value_clips
    }

    /// True when more than one sample is authored or clips drive the value.
    pub fn might_be_time_varying(&self) -> bool {
        self.samples.len() > 1 || self.value_clips
    }

    fn set_sample(&mut self, time: f64, value: Value) {
        let idx = self.samples.partition_point(|(t, _)| *t < time);
        if self.samples.get(idx).is_some_and(|(t, _)| *t == time) {
            self.samples[idx].1 = value;
        } else {
            self.samples.insert(idx, (time, value));
        }
    }

    /// Resolve the value at `time`.
    ///
    /// The default time reads only the default value. Numeric times read the
    /// samples (clamped at both ends, interpolated between neighbours) and
    /// fall back to the default when none are authored.
    pub fn resolve(&self, time: TimeCode) -> Option<Value> {
        let TimeCode::At(t) = time else {
            return self.default.clone();
        };
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return self.default.clone(),
        };
        let idx = self.samples.partition_point(|(st, _)| *st <= t);
        if idx == 0 {
            return Some(first.1.clone());
        }
        if idx == self.samples.len() {
            return Some(last.1.clone());
        }
        let (t0, v0) = &self.samples[idx - 1];
        let (t1, v1) = &self.samples[idx];
        if *t0 == t {
            return Some(v0.clone());
        }
        Some(v0.lerp(v1, (t - t0) / (t1 - t0)))
    }
}

/// Per-prim data stored in the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimData {
    pub type_name: String,
    attributes: BTreeMap<String, Attribute>,
}

impl PrimData {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }
}

/// In-memory scene description.
///
/// All mutations go through explicit operations and append a [`StageEvent`].
/// Uses BTreeMap so prim and attribute iteration order is stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStage {
    prims: BTreeMap<PrimPath, PrimData>,
    /// Append-only log of change notifications.
    #[serde(skip)]
    event_log: Vec<StageEvent>,
}

impl MemoryStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prim_count(&self) -> usize {
        self.prims.len()
    }

    /// Drain and return pending change notifications.
    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to pending change notifications.
    pub fn events(&self) -> &[StageEvent] {
        &self.event_log
    }

    pub fn prims(&self) -> &BTreeMap<PrimPath, PrimData> {
        &self.prims
    }

    pub fn get(&self, path: &PrimPath) -> Option<&PrimData> {
        self.prims.get(path)
    }

    /// Create a prim of `type_name`, or retype an existing one keeping its
    /// attributes.
    pub fn define_prim(&mut self, path: PrimPath, type_name: impl Into<String>) {
        let type_name = type_name.into();
        self.prims
            .entry(path.clone())
            .and_modify(|prim| prim.type_name.clone_from(&type_name))
            .or_insert_with(|| PrimData {
                type_name: type_name.clone(),
                attributes: BTreeMap::new(),
            });
        tracing::trace!(%path, %type_name, "prim defined");
        self.event_log
            .push(StageEvent::PrimDefined { path, type_name });
    }

    /// Remove a prim and its descendants. Returns the prim's data if it existed.
    pub fn remove_prim(&mut self, path: &PrimPath) -> Option<PrimData> {
        let removed = self.prims.remove(path)?;
        let prefix = format!("{path}/");
        let descendants: Vec<PrimPath> = self
            .prims
            .keys()
            .filter(|p| p.as_str().starts_with(&prefix))
            .cloned()
            .collect();
        for descendant in descendants {
            self.prims.remove(&descendant);
            self.event_log
                .push(StageEvent::PrimRemoved { path: descendant });
        }
        self.event_log
            .push(StageEvent::PrimRemoved { path: path.clone() });
        Some(removed)
    }

    /// Author the default (non-time-sampled) value.
    pub fn set_default(
        &mut self,
        path: &PrimPath,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<(), StageError> {
        self.attribute_mut(path, attribute)?.default = Some(value.into());
        self.push_changed(path, attribute);
        Ok(())
    }

    /// Author a time sample, replacing any sample at the same time.
    pub fn set_time_sample(
        &mut self,
        path: &PrimPath,
        attribute: &str,
        time: f64,
        value: impl Into<Value>,
    ) -> Result<(), StageError> {
        self.attribute_mut(path, attribute)?
            .set_sample(time, value.into());
        self.push_changed(path, attribute);
        Ok(())
    }

    /// Mark whether value clips drive this attribute.
    pub fn set_value_clips(
        &mut self,
        path: &PrimPath,
        attribute: &str,
        clipped: bool,
    ) -> Result<(), StageError> {
        self.attribute_mut(path, attribute)?.value_clips = clipped;
        self.push_changed(path, attribute);
        Ok(())
    }

    /// Remove every opinion for an attribute. Returns whether it was authored.
    pub fn clear_attribute(
        &mut self,
        path: &PrimPath,
        attribute: &str,
    ) -> Result<bool, StageError> {
        let prim = self
            .prims
            .get_mut(path)
            .ok_or_else(|| StageError::PrimNotFound(path.clone()))?;
        let existed = prim.attributes.remove(attribute).is_some();
        if existed {
            self.push_changed(path, attribute);
        }
        Ok(existed)
    }

    fn attribute_mut(
        &mut self,
        path: &PrimPath,
        attribute: &str,
    ) -> Result<&mut Attribute, StageError> {
        let prim = self
            .prims
            .get_mut(path)
            .ok_or_else(|| StageError::PrimNotFound(path.clone()))?;
        Ok(prim.attributes.entry(attribute.to_string()).or_default())
    }

    fn push_changed(&mut self, path: &PrimPath, attribute: &str) {
        self.event_log.push(StageEvent::AttributeChanged {
            path: path.clone(),
            attribute: attribute.to_string(),
        });
    }
}

impl SceneDescription for MemoryStage {
    fn prim_type(&self, path: &PrimPath) -> Option<&str> {
        self.prims
            .get(path)
            .map(|prim| prim.type_name.as_str())
            .filter(|name| !name.is_empty())
    }

    fn prim_paths(&self) -> Vec<PrimPath> {
        self.prims.keys().cloned().collect()
    }

    fn attribute_names(&self, path: &PrimPath) -> Vec<String> {
        self.prims
            .get(path)
            .map(|prim| prim.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn attribute_value(
        &self,
        path: &PrimPath,
        attribute: &str,
        time: TimeCode,
    ) -> Result<Value, StageError> {
        let prim = self
            .prims
            .get(path)
            .ok_or_else(|| StageError::PrimNotFound(path.clone()))?;
        let attr = prim
            .attributes
            .get(attribute)
            .ok_or_else(|| StageError::AttributeNotFound {
                path: path.clone(),
                attribute: attribute.to_string(),
            })?;
        attr.resolve(time).ok_or_else(|| StageError::NoValue {
            path: path.clone(),
            attribute: attribute.to_string(),
            time,
        })
    }

    fn is_attribute_time_varying(&self, path: &PrimPath, attribute: &str) -> bool {
        self.prims
            .get(path)
            .and_then(|prim| prim.attributes.get(attribute))
            .is_some_and(Attribute::might_be_time_varying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> PrimPath {
        PrimPath::parse(s).unwrap()
    }

    fn stage_with_capsule() -> (MemoryStage, PrimPath) {
        let mut stage = MemoryStage::new();
        let p = path("/World/capsule");
        stage.define_prim(p.clone(), "Capsule");
        (stage, p)
    }

    #[test]
    fn stage_starts_empty() {
        let stage = MemoryStage::new();
        assert_eq!(stage.prim_count(), 0);
        assert!(stage.events().is_empty());
    }

    #[test]
    fn define_and_query_type() {
        let (stage, p) = stage_with_capsule();
        assert_eq!(stage.prim_type(&p), Some("Capsule"));
        assert!(stage.is_a(&p, "Capsule"));
        assert!(!stage.is_a(&p, "Capsule_1"));
        assert_eq!(stage.prim_type(&path("/missing")), None);
    }

    #[test]
    fn untyped_prim_has_no_type() {
        let mut stage = MemoryStage::new();
        let p = path("/Scope");
        stage.define_prim(p.clone(), "");
        assert_eq!(stage.prim_type(&p), None);
    }

    #[test]
    fn retype_keeps_attributes() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_default(&p, "height", 3.0).unwrap();
        stage.define_prim(p.clone(), "Capsule_1");
        assert_eq!(stage.prim_type(&p), Some("Capsule_1"));
        assert_eq!(stage.get_double(&p, "height", TimeCode::Default), Ok(3.0));
    }

    #[test]
    fn default_value_resolution() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_default(&p, "height", 4.0).unwrap();
        assert_eq!(stage.get_double(&p, "height", TimeCode::Default), Ok(4.0));
        // No samples: numeric times fall back to the default.
        assert_eq!(stage.get_double(&p, "height", TimeCode::At(10.0)), Ok(4.0));
    }

    #[test]
    fn samples_interpolate_and_clamp() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_time_sample(&p, "height", 0.0, 1.0).unwrap();
        stage.set_time_sample(&p, "height", 10.0, 3.0).unwrap();
        let at = |t: f64| stage.get_double(&p, "height", TimeCode::At(t)).unwrap();
        assert_eq!(at(-5.0), 1.0);
        assert_eq!(at(0.0), 1.0);
        assert_eq!(at(5.0), 2.0);
        assert_eq!(at(10.0), 3.0);
        assert_eq!(at(20.0), 3.0);
    }

    #[test]
    fn default_time_ignores_samples() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_time_sample(&p, "height", 1.0, 7.0).unwrap();
        assert!(matches!(
            stage.attribute_value(&p, "height", TimeCode::Default),
            Err(StageError::NoValue { .. })
        ));
    }

    #[test]
    fn token_samples_hold() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_time_sample(&p, "axis", 0.0, "X").unwrap();
        stage.set_time_sample(&p, "axis", 2.0, "Y").unwrap();
        assert_eq!(stage.get_token(&p, "axis", TimeCode::At(1.5)).unwrap(), "X");
        assert_eq!(stage.get_token(&p, "axis", TimeCode::At(2.0)).unwrap(), "Y");
    }

    #[test]
    fn sample_at_same_time_is_replaced() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_time_sample(&p, "height", 1.0, 1.0).unwrap();
        stage.set_time_sample(&p, "height", 1.0, 2.0).unwrap();
        let attr = stage.get(&p).unwrap().attribute("height").unwrap();
        assert_eq!(attr.num_time_samples(), 1);
        assert_eq!(stage.get_double(&p, "height", TimeCode::At(1.0)), Ok(2.0));
    }

    #[test]
    fn read_errors() {
        let (mut stage, p) = stage_with_capsule();
        assert!(matches!(
            stage.attribute_value(&path("/nope"), "height", TimeCode::Default),
            Err(StageError::PrimNotFound(_))
        ));
        assert!(matches!(
            stage.attribute_value(&p, "height", TimeCode::Default),
            Err(StageError::AttributeNotFound { .. })
        ));
        stage.set_default(&p, "height", "tall").unwrap();
        assert!(matches!(
            stage.get_double(&p, "height", TimeCode::Default),
            Err(StageError::TypeMismatch {
                expected: "double",
                found: "token",
                ..
            })
        ));
    }

    #[test]
    fn time_varying_needs_two_samples_or_clips() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_time_sample(&p, "height", 0.0, 1.0).unwrap();
        assert!(!stage.is_attribute_time_varying(&p, "height"));
        stage.set_time_sample(&p, "height", 1.0, 2.0).unwrap();
        assert!(stage.is_attribute_time_varying(&p, "height"));

        stage.set_default(&p, "radius", 0.5).unwrap();
        assert!(!stage.is_attribute_time_varying(&p, "radius"));
        stage.set_value_clips(&p, "radius", true).unwrap();
        assert!(stage.is_attribute_time_varying(&p, "radius"));

        assert!(!stage.is_attribute_time_varying(&p, "unauthored"));
    }

    #[test]
    fn mutations_are_logged() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_default(&p, "height", 1.0).unwrap();
        stage.set_time_sample(&p, "radius", 0.0, 0.5).unwrap();
        stage.clear_attribute(&p, "radius").unwrap();
        let events = stage.drain_events();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[1],
            StageEvent::AttributeChanged {
                path: p.clone(),
                attribute: "height".into()
            }
        );
        assert!(stage.events().is_empty());
    }

    #[test]
    fn writes_to_missing_prim_fail() {
        let mut stage = MemoryStage::new();
        assert!(matches!(
            stage.set_default(&path("/nope"), "height", 1.0),
            Err(StageError::PrimNotFound(_))
        ));
        assert!(stage.events().is_empty());
    }

    #[test]
    fn remove_prim_takes_descendants() {
        let mut stage = MemoryStage::new();
        stage.define_prim(path("/World"), "Xform");
        stage.define_prim(path("/World/a"), "Capsule");
        stage.define_prim(path("/World/a/b"), "Capsule");
        stage.define_prim(path("/Worldly"), "Capsule");
        stage.drain_events();

        assert!(stage.remove_prim(&path("/World/a")).is_some());
        assert_eq!(stage.prim_paths(), vec![path("/World"), path("/Worldly")]);
        let removed: Vec<&PrimPath> = stage.events().iter().map(StageEvent::path).collect();
        assert_eq!(removed, vec![&path("/World/a/b"), &path("/World/a")]);
        assert!(stage.remove_prim(&path("/World/a")).is_none());
    }

    #[test]
    fn attribute_names_are_sorted() {
        let (mut stage, p) = stage_with_capsule();
        stage.set_default(&p, "radius", 0.5).unwrap();
        stage.set_default(&p, "axis", "Z").unwrap();
        stage.set_default(&p, "height", 1.0).unwrap();
        assert_eq!(stage.attribute_names(&p), vec!["axis", "height", "radius"]);
    }
}
