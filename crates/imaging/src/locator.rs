use std::collections::BTreeSet;
use std::fmt;

use crate::dirty::DirtyBits;

/// Path into a prim's data source, e.g. `mesh/topology`.
///
/// The empty locator addresses the whole data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(Vec<String>);

impl Locator {
    /// The root locator, covering everything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(elements.into_iter().map(Into::into).collect())
    }

    /// Parse a `/`-separated locator.
    pub fn parse(s: &str) -> Self {
        Self::new(s.split('/').filter(|e| !e.is_empty()))
    }

    pub fn elements(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn append(&self, name: &str) -> Self {
        let mut elements = self.0.clone();
        elements.push(name.to_string());
        Self(elements)
    }

    pub fn has_prefix(&self, prefix: &Locator) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True when one locator contains the other.
    pub fn intersects(&self, other: &Locator) -> bool {
        self.has_prefix(other) || other.has_prefix(self)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Minimal set of locators: no member is a prefix of another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorSet(BTreeSet<Locator>);

impl LocatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set covering everything.
    pub fn universal() -> Self {
        let mut set = Self::new();
        set.insert(Locator::empty());
        set
    }

    /// Insert a locator unless an ancestor is present; drops any descendants
    /// it subsumes.
    pub fn insert(&mut self, locator: Locator) {
        if self.0.iter().any(|existing| locator.has_prefix(existing)) {
            return;
        }
        self.0.retain(|existing| !existing.has_prefix(&locator));
        self.0.insert(locator);
    }

    pub fn union(&mut self, other: &LocatorSet) {
        for locator in &other.0 {
            self.insert(locator.clone());
        }
    }

    /// Exact membership.
    pub fn contains(&self, locator: &Locator) -> bool {
        self.0.contains(locator)
    }

    /// Whether any member overlaps `locator`.
    pub fn intersects(&self, locator: &Locator) -> bool {
        self.0.iter().any(|existing| existing.intersects(locator))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.0.iter()
    }
}

impl FromIterator<Locator> for LocatorSet {
    fn from_iter<T: IntoIterator<Item = Locator>>(iter: T) -> Self {
        let mut set = Self::new();
        for locator in iter {
            set.insert(locator);
        }
        set
    }
}

/// Well-known locators of a prim data source.
pub mod names {
    use super::Locator;

    pub fn points() -> Locator {
        Locator::new(["primvars", "points"])
    }

    pub fn primvars() -> Locator {
        Locator::new(["primvars"])
    }

    pub fn topology() -> Locator {
        Locator::new(["mesh", "topology"])
    }

    pub fn double_sided() -> Locator {
        Locator::new(["mesh", "doubleSided"])
    }

    /// `capsule/<attribute>` parameter locator.
    pub fn capsule(attribute: &str) -> Locator {
        Locator::new(["capsule", attribute])
    }

    pub fn xform() -> Locator {
        Locator::new(["xform"])
    }

    pub fn visibility() -> Locator {
        Locator::new(["visibility"])
    }

    pub fn extent() -> Locator {
        Locator::new(["extent"])
    }

    pub fn material_bindings() -> Locator {
        Locator::new(["materialBindings"])
    }
}

/// Locators invalidated by a dirty mask. A fully dirty mask maps to the
/// universal set.
pub fn locators_for_dirty_bits(bits: DirtyBits) -> LocatorSet {
    if bits.contains(DirtyBits::ALL_DIRTY) {
        return LocatorSet::universal();
    }
    let table = [
        (DirtyBits::POINTS, names::points()),
        (DirtyBits::TOPOLOGY, names::topology()),
        (DirtyBits::TRANSFORM, names::xform()),
        (DirtyBits::VISIBILITY, names::visibility()),
        (DirtyBits::EXTENT, names::extent()),
        (DirtyBits::DOUBLE_SIDED, names::double_sided()),
        (DirtyBits::PRIMVAR, names::primvars()),
        (DirtyBits::MATERIAL_ID, names::material_bindings()),
    ];
    table
        .into_iter()
        .filter(|(bit, _)| bits.contains(*bit))
        .map(|(_, locator)| locator)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let l = Locator::parse("mesh/topology");
        assert_eq!(l, names::topology());
        assert_eq!(l.to_string(), "mesh/topology");
        assert!(Locator::parse("").is_empty());
    }

    #[test]
    fn prefix_relations() {
        let primvars = names::primvars();
        let points = names::points();
        assert!(points.has_prefix(&primvars));
        assert!(!primvars.has_prefix(&points));
        assert!(primvars.intersects(&points));
        assert!(!points.intersects(&names::topology()));
        assert!(points.has_prefix(&Locator::empty()));
    }

    #[test]
    fn set_keeps_only_ancestors() {
        let mut set = LocatorSet::new();
        set.insert(names::points());
        set.insert(Locator::parse("primvars/normals"));
        assert_eq!(set.len(), 2);
        set.insert(names::primvars());
        assert_eq!(set.len(), 1);
        assert!(set.contains(&names::primvars()));
        set.insert(names::points());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn universal_intersects_everything() {
        let set = LocatorSet::universal();
        assert!(set.intersects(&names::topology()));
        assert!(set.intersects(&names::capsule("height")));
    }

    #[test]
    fn dirty_bits_map_to_locators() {
        let set = locators_for_dirty_bits(DirtyBits::POINTS);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![&names::points()]);
        assert!(!set.intersects(&names::topology()));

        // Primvar subsumes points.
        let set = locators_for_dirty_bits(DirtyBits::POINTS | DirtyBits::PRIMVAR);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&names::primvars()));

        assert!(locators_for_dirty_bits(DirtyBits::CLEAN).is_empty());
        assert_eq!(
            locators_for_dirty_bits(DirtyBits::ALL_DIRTY),
            LocatorSet::universal()
        );
    }
}
