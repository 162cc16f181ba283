use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::adapter::{CapsuleAdapter, PrimAdapter};
use crate::config::AdapterConfig;
use crate::resolver::CapsuleVariant;

/// Maps schema type names to the adapter that images them.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn PrimAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in adapters. Both capsule schema versions
    /// share one adapter, and therefore one topology cache.
    pub fn with_builtin(config: AdapterConfig) -> Self {
        let mut registry = Self::new();
        let capsule: Arc<dyn PrimAdapter> = Arc::new(CapsuleAdapter::new(config));
        for variant in CapsuleVariant::PRIORITY {
            registry.register(variant.type_name(), Arc::clone(&capsule));
        }
        registry
    }

    /// Register `adapter` for `type_name`, returning any adapter it replaces.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        adapter: Arc<dyn PrimAdapter>,
    ) -> Option<Arc<dyn PrimAdapter>> {
        let type_name = type_name.into();
        tracing::debug!(%type_name, adapter = adapter.name(), "registering prim adapter");
        self.adapters.insert(type_name, adapter)
    }

    pub fn adapter_for(&self, type_name: &str) -> Option<&Arc<dyn PrimAdapter>> {
        self.adapters.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.adapters.iter().map(|(k, v)| (k, v.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_both_capsule_schemas() {
        let registry = AdapterRegistry::with_builtin(AdapterConfig::default());
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.type_names().collect::<Vec<_>>(),
            vec!["Capsule", "Capsule_1"]
        );
        let legacy = registry.adapter_for("Capsule").unwrap();
        let current = registry.adapter_for("Capsule_1").unwrap();
        assert!(Arc::ptr_eq(legacy, current));
        assert!(registry.adapter_for("Sphere").is_none());
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = AdapterRegistry::new();
        assert!(registry.is_empty());
        let first: Arc<dyn PrimAdapter> = Arc::new(CapsuleAdapter::default());
        let second: Arc<dyn PrimAdapter> = Arc::new(CapsuleAdapter::default());
        assert!(registry.register("Capsule", first).is_none());
        let replaced = registry.register("Capsule", Arc::clone(&second));
        assert!(replaced.is_some());
        assert!(Arc::ptr_eq(registry.adapter_for("Capsule").unwrap(), &second));
    }

    #[test]
    fn debug_lists_adapter_names() {
        let registry = AdapterRegistry::with_builtin(AdapterConfig::default());
        let text = format!("{registry:?}");
        assert!(text.contains("\"Capsule_1\": \"capsule\""));
    }
}
