use alloc::sync::Arc;

use crate::{context::InjectionContext, dependency_resolver::DependencyResolver, errors::ResolveErrorKind};

/// Resolves a shared handle to the dependency, materialized per the
/// binding's lifetime.
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    type Error = ResolveErrorKind;

    fn resolve(context: &InjectionContext) -> Result<Self, Self::Error> {
        context.get().map(Self)
    }
}

/// Resolves an owned instance from a transient binding.
pub struct InjectTransient<Dep>(pub Dep);

impl<Dep: 'static> DependencyResolver for InjectTransient<Dep> {
    type Error = ResolveErrorKind;

    fn resolve(context: &InjectionContext) -> Result<Self, Self::Error> {
        context.get_transient().map(Self)
    }
}
