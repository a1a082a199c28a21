use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::any::{Any, TypeId};
use tracing::warn;

use crate::{
    any::TypeInfo,
    errors::BindingError,
    finalizer::BoxedCloneFinalizer,
    lifetime::Lifetime,
    provider::{Implementation, Provider},
};

#[derive(Clone)]
pub(crate) struct ProviderEntry {
    pub(crate) target: TypeInfo,
    pub(crate) lifetime: Lifetime,
    pub(crate) implementation: Implementation,
    pub(crate) finalizer: Option<BoxedCloneFinalizer>,
}

impl From<Provider> for ProviderEntry {
    fn from(provider: Provider) -> Self {
        Self {
            target: provider.target,
            lifetime: provider.lifetime,
            implementation: provider.implementation,
            finalizer: provider.finalizer.map(|(_, finalizer)| finalizer),
        }
    }
}

/// Binding storage. At most one active binding per target type; a later
/// registration supersedes the earlier one.
#[derive(Default)]
pub(crate) struct Registry {
    entries: BTreeMap<TypeId, ProviderEntry>,
}

impl Registry {
    pub(crate) fn register(&mut self, provider: Provider) -> Result<(), BindingError> {
        provider.validate()?;
        let entry = ProviderEntry::from(provider);
        if let Some(prior) = self.entries.insert(entry.target.id, entry) {
            warn!(dependency = prior.target.name, "Provider replaced by a later registration");
        }
        Ok(())
    }

    /// Replaces the binding without the duplicate warning, returning the
    /// prior entry so an override scope can restore it.
    pub(crate) fn swap(&mut self, provider: Provider) -> Result<Option<ProviderEntry>, BindingError> {
        provider.validate()?;
        let entry = ProviderEntry::from(provider);
        Ok(self.entries.insert(entry.target.id, entry))
    }

    pub(crate) fn restore(&mut self, type_id: TypeId, prior: Option<ProviderEntry>) {
        match prior {
            Some(entry) => {
                self.entries.insert(type_id, entry);
            }
            None => {
                self.entries.remove(&type_id);
            }
        }
    }

    #[must_use]
    pub(crate) fn get(&self, type_id: &TypeId) -> Option<ProviderEntry> {
        self.entries.get(type_id).cloned()
    }

    /// Pre-built instances, for publication at lifespan entry.
    #[must_use]
    pub(crate) fn object_entries(&self) -> Vec<(TypeInfo, Arc<dyn Any + Send + Sync>, Option<BoxedCloneFinalizer>)> {
        self.entries
            .values()
            .filter_map(|entry| match &entry.implementation {
                Implementation::Instance(instance) => Some((entry.target, instance.clone(), entry.finalizer.clone())),
                Implementation::Factory(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{format, string::{String, ToString}};
    use tracing_test::traced_test;

    use super::Registry;
    use crate::{errors::InstantiateErrorKind, provider::Provider};

    struct Config(&'static str);

    #[test]
    #[traced_test]
    fn test_duplicate_register_warns() {
        let mut registry = Registry::default();
        registry
            .register(Provider::singleton(|| Ok::<_, InstantiateErrorKind>(Config("first"))))
            .unwrap();
        registry
            .register(Provider::singleton(|| Ok::<_, InstantiateErrorKind>(Config("second"))))
            .unwrap();

        assert!(logs_contain("Provider replaced by a later registration"));
    }

    #[test]
    #[traced_test]
    fn test_swap_returns_prior() {
        let mut registry = Registry::default();
        registry
            .register(Provider::singleton(|| Ok::<_, InstantiateErrorKind>(Config("real"))))
            .unwrap();

        let prior = registry
            .swap(Provider::singleton(|| Ok::<_, InstantiateErrorKind>(Config("double"))))
            .unwrap();
        assert!(prior.is_some());
        assert!(!logs_contain("Provider replaced by a later registration"));

        let type_id = core::any::TypeId::of::<Config>();
        registry.restore(type_id, None);
        assert!(registry.get(&type_id).is_none());
    }
}
