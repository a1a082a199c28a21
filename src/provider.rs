use alloc::sync::Arc;
use core::any::Any;

use crate::{
    any::TypeInfo,
    dependency_resolver::DependencyResolver,
    errors::{BindingError, InstantiateErrorKind, ResolveErrorKind},
    finalizer::{boxed_finalizer_factory, BoxedCloneFinalizer, Finalizer},
    instantiator::{boxed_instantiator_factory, BoxedCloneInstantiator, Instantiator},
    lifetime::Lifetime,
};

#[derive(Clone)]
pub(crate) enum Implementation {
    Factory(BoxedCloneInstantiator<ResolveErrorKind, InstantiateErrorKind>),
    Instance(Arc<dyn Any + Send + Sync>),
}

/// One binding: a target type, a construction strategy and a lifetime.
///
/// The target type is taken from the factory's return type
/// ([`Instantiator::Provides`]), so it is always known at compile time.
pub struct Provider {
    pub(crate) target: TypeInfo,
    pub(crate) lifetime: Lifetime,
    pub(crate) implementation: Implementation,
    pub(crate) finalizer: Option<(TypeInfo, BoxedCloneFinalizer)>,
}

impl Provider {
    /// Binds a factory whose instance is constructed once per container
    /// lifetime.
    #[must_use]
    pub fn singleton<Inst, Deps>(factory: Inst) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        Self::from_factory(factory, Lifetime::Singleton)
    }

    /// Binds a factory whose instance is constructed once per injection
    /// context.
    #[must_use]
    pub fn scoped<Inst, Deps>(factory: Inst) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        Self::from_factory(factory, Lifetime::Scoped)
    }

    /// Binds a factory invoked on every resolution call; instances are
    /// never cached.
    #[must_use]
    pub fn transient<Inst, Deps>(factory: Inst) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        Self::from_factory(factory, Lifetime::Transient)
    }

    /// Binds an already-constructed instance. Singleton-equivalent: the
    /// instance is published to the singleton cache and no factory is
    /// ever invoked for it.
    #[must_use]
    pub fn object<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            target: TypeInfo::of::<T>(),
            lifetime: Lifetime::Singleton,
            implementation: Implementation::Instance(Arc::new(value)),
            finalizer: None,
        }
    }

    /// Attaches a release routine, making the binding a scoped-acquisition
    /// resource (see [`Finalizer`]).
    ///
    /// The finalizer's parameter type must match the provided type and the
    /// binding must not be transient; both are checked at registration.
    #[must_use]
    pub fn with_finalizer<Dep>(mut self, finalizer: impl Finalizer<Dep> + Send + Sync) -> Self
    where
        Dep: Send + Sync + 'static,
    {
        self.finalizer = Some((TypeInfo::of::<Dep>(), boxed_finalizer_factory(finalizer)));
        self
    }

    #[must_use]
    fn from_factory<Inst, Deps>(factory: Inst, lifetime: Lifetime) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        Self {
            target: TypeInfo::of::<Inst::Provides>(),
            lifetime,
            implementation: Implementation::Factory(boxed_instantiator_factory(factory)),
            finalizer: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), BindingError> {
        if let Some((finalizer_target, _)) = &self.finalizer {
            if finalizer_target.id != self.target.id {
                return Err(BindingError::FinalizerTypeMismatch {
                    target: self.target,
                    finalizer: *finalizer_target,
                });
            }
            if self.lifetime == Lifetime::Transient {
                return Err(BindingError::TransientFinalizer { target: self.target });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{format, string::{String, ToString}, sync::Arc};
    use tracing_test::traced_test;

    use super::Provider;
    use crate::{
        container::Container,
        errors::{BindingError, InstantiateErrorKind},
    };

    struct Connection;
    struct Other;

    #[test]
    #[traced_test]
    fn test_finalizer_type_mismatch() {
        let container = Container::new();
        let result = container.register(
            Provider::singleton(|| Ok::<_, InstantiateErrorKind>(Connection))
                .with_finalizer(|_: Arc<Other>| -> anyhow::Result<()> { Ok(()) }),
        );

        assert!(matches!(
            result,
            Err(BindingError::FinalizerTypeMismatch { target: _, finalizer: _ })
        ));
    }

    #[test]
    #[traced_test]
    fn test_transient_finalizer_rejected() {
        let container = Container::new();
        let result = container.register(
            Provider::transient(|| Ok::<_, InstantiateErrorKind>(Connection))
                .with_finalizer(|_: Arc<Connection>| -> anyhow::Result<()> { Ok(()) }),
        );

        assert!(matches!(result, Err(BindingError::TransientFinalizer { target: _ })));
    }

    #[test]
    #[traced_test]
    fn test_object_target_is_concrete_type() {
        let provider = Provider::object(Connection);
        assert_eq!(provider.target.id, core::any::TypeId::of::<Connection>());
    }
}
