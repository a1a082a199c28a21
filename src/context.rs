use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::any::{type_name, Any, TypeId};
use parking_lot::Mutex;
use tracing::{debug, error, info_span};

use crate::{
    any::{Map, TypeInfo},
    cache::{Cache, Resolved},
    container::Container,
    errors::{CycleChain, InstantiatorErrorKind, ReleaseError, ReleaseFailure, ReleaseSubject, ResolveErrorKind},
    lifetime::Lifetime,
    provider::Implementation,
    registry::ProviderEntry,
    service::Service as _,
};

/// Pre-built values for one injection context, looked up before any
/// binding is consulted. Useful for per-request data that exists before
/// resolution starts.
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) map: Map,
}

impl Context {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { map: Map::new() }
    }

    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<Arc<T>> {
        self.map
            .insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|boxed| boxed.downcast().ok())
    }

    #[inline]
    pub fn insert_rc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> Option<Arc<T>> {
        self.map.insert(TypeId::of::<T>(), value).and_then(|boxed| boxed.downcast().ok())
    }
}

/// Resolution scope for one unit of work (e.g. one incoming request).
///
/// Owns the scoped cache and the acquisition stack; the singleton cache
/// is shared through the owning [`Container`]. Clones share state, so a
/// factory resolving its own dependencies walks the same scope.
///
/// Dropping the context releases everything on its acquisition stack in
/// reverse acquisition order; use [`InjectionContext::close`] to observe
/// release failures instead of having them logged.
#[derive(Clone)]
pub struct InjectionContext {
    inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    container: Container,
    scoped: Mutex<Cache>,
    resolving: Mutex<Vec<TypeInfo>>,
}

impl InjectionContext {
    #[must_use]
    pub(crate) fn new(container: Container, context: Context) -> Self {
        let mut cache = Cache::new();
        cache.seed(&context.map);

        Self {
            inner: Arc::new(ContextInner {
                container,
                scoped: Mutex::new(cache),
                resolving: Mutex::new(Vec::new()),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// Resolves a shared handle to the dependency, materialized per the
    /// binding's lifetime: singletons come from (or are published to) the
    /// container-wide cache, scoped instances from this context's cache,
    /// transient instances are constructed fresh on every call.
    #[allow(clippy::missing_errors_doc)]
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let span = info_span!("resolve", dependency = type_name::<Dep>());
        let _guard = span.enter();

        let type_id = TypeId::of::<Dep>();

        if let Some(dependency) = self.inner.container.cached_singleton::<Dep>(&type_id) {
            debug!("Found in singleton cache");
            return Ok(dependency);
        }
        if let Some(dependency) = self.inner.scoped.lock().get::<Dep>(&type_id) {
            debug!("Found in scoped cache");
            return Ok(dependency);
        }

        let Some(entry) = self.inner.container.binding(&type_id) else {
            let err = ResolveErrorKind::NoProvider {
                type_info: TypeInfo::of::<Dep>(),
            };
            error!("{}", err);
            return Err(err);
        };

        match entry.lifetime {
            Lifetime::Singleton => self.inner.container.get_singleton::<Dep>(&entry, self),
            Lifetime::Scoped => {
                let dependency = Arc::new(self.construct::<Dep>(&entry)?);
                let mut guard = self.inner.scoped.lock();
                guard.insert_rc(dependency.clone());
                debug!("Cached in scoped cache");
                if let Some(finalizer) = &entry.finalizer {
                    guard.push_resolved(Resolved {
                        type_info: entry.target,
                        dependency: dependency.clone(),
                        finalizer: finalizer.clone(),
                    });
                    debug!("Pushed to acquisition stack");
                }
                Ok(dependency)
            }
            Lifetime::Transient => self.construct::<Dep>(&entry).map(Arc::new),
        }
    }

    /// Resolves an owned instance from a transient binding.
    ///
    /// Bindings with another lifetime are refused: handing out an
    /// uncached copy of a singleton or scoped dependency would bypass its
    /// declared reuse policy.
    #[allow(clippy::missing_errors_doc)]
    pub fn get_transient<Dep: 'static>(&self) -> Result<Dep, ResolveErrorKind> {
        let span = info_span!("resolve_transient", dependency = type_name::<Dep>());
        let _guard = span.enter();

        let type_id = TypeId::of::<Dep>();

        let Some(entry) = self.inner.container.binding(&type_id) else {
            let err = ResolveErrorKind::NoProvider {
                type_info: TypeInfo::of::<Dep>(),
            };
            error!("{}", err);
            return Err(err);
        };

        if entry.lifetime != Lifetime::Transient {
            let err = ResolveErrorKind::LifetimeMismatch {
                type_info: TypeInfo::of::<Dep>(),
                expected: Lifetime::Transient,
                actual: entry.lifetime,
            };
            error!("{}", err);
            return Err(err);
        }

        self.construct::<Dep>(&entry)
    }

    /// Releases the acquisition stack in reverse acquisition order and
    /// clears the scoped cache. Best-effort: every release is attempted,
    /// collected failures are surfaced afterwards.
    #[allow(clippy::missing_errors_doc)]
    pub fn close(&self) -> Result<(), ReleaseError> {
        self.inner.close()
    }

    pub(crate) fn construct<Dep: 'static>(&self, entry: &ProviderEntry) -> Result<Dep, ResolveErrorKind> {
        match self.construct_any(entry)?.downcast::<Dep>() {
            Ok(dependency) => Ok(*dependency),
            Err(incorrect_type) => {
                let err = ResolveErrorKind::IncorrectType {
                    expected: TypeInfo::of::<Dep>(),
                    actual: (*incorrect_type).type_id(),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }

    fn construct_any(&self, entry: &ProviderEntry) -> Result<Box<dyn Any>, ResolveErrorKind> {
        let Implementation::Factory(instantiator) = &entry.implementation else {
            unreachable!("pre-built instances are published through the singleton cache");
        };

        {
            let mut resolving = self.inner.resolving.lock();
            if resolving.iter().any(|type_info| type_info.id == entry.target.id) {
                let mut chain = resolving.clone();
                chain.push(entry.target);
                let err = ResolveErrorKind::CyclicDependency {
                    chain: CycleChain(chain.into_boxed_slice()),
                };
                error!("{}", err);
                return Err(err);
            }
            resolving.push(entry.target);
        }

        let result = instantiator.clone().call(self.clone());
        self.inner.resolving.lock().pop();

        match result {
            Ok(dependency) => Ok(dependency),
            Err(InstantiatorErrorKind::Deps(err)) => {
                error!("{}", err);
                Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(err))))
            }
            Err(InstantiatorErrorKind::Factory(err)) => {
                error!("{}", err);
                Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err)))
            }
        }
    }
}

impl ContextInner {
    /// Can be called multiple times; only resources acquired since the
    /// last call are released.
    fn close(&self) -> Result<(), ReleaseError> {
        let mut resolved = {
            let mut scoped = self.scoped.lock();
            let resolved = scoped.take_resolved_set();
            scoped.clear();
            resolved
        };

        let mut failures = Vec::new();
        while let Some(Resolved {
            type_info,
            dependency,
            mut finalizer,
        }) = resolved.pop()
        {
            debug!(dependency = type_info.name, "Releasing");
            if let Err(error) = finalizer.call(dependency) {
                error!(dependency = type_info.name, "Release failed: {error}");
                failures.push(ReleaseFailure {
                    subject: ReleaseSubject::Dependency(type_info),
                    error,
                });
            }
        }

        ReleaseError::from_failures(failures)
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            error!("{}", err);
        }
        debug!("Injection context closed on drop");
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{format, string::{String, ToString}, sync::Arc, vec, vec::Vec};
    use core::sync::atomic::{AtomicU8, Ordering};
    use parking_lot::Mutex;
    use tracing::debug;
    use tracing_test::traced_test;

    use super::Context;
    use crate::{
        container::Container,
        errors::{InstantiateErrorKind, ResolveErrorKind},
        inject::Inject,
        lifetime::Lifetime,
        provider::Provider,
    };

    struct Request;
    struct Session(&'static str);

    #[test]
    #[traced_test]
    fn test_scoped_identity_within_context() {
        let instantiator_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container
            .register(Provider::scoped({
                let instantiator_call_count = instantiator_call_count.clone();
                move || {
                    instantiator_call_count.fetch_add(1, Ordering::SeqCst);

                    debug!("Call instantiator request");
                    Ok::<_, InstantiateErrorKind>(Request)
                }
            }))
            .unwrap();

        let context = container.context();
        let request_1 = context.get::<Request>().unwrap();
        let request_2 = context.get::<Request>().unwrap();

        assert!(Arc::ptr_eq(&request_1, &request_2));
        assert_eq!(instantiator_call_count.load(Ordering::SeqCst), 1);

        let other_context = container.context();
        let request_3 = other_context.get::<Request>().unwrap();

        assert!(!Arc::ptr_eq(&request_1, &request_3));
        assert_eq!(instantiator_call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_transient_never_reused() {
        let instantiator_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container
            .register(Provider::transient({
                let instantiator_call_count = instantiator_call_count.clone();
                move || {
                    instantiator_call_count.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, InstantiateErrorKind>(Request)
                }
            }))
            .unwrap();

        let context = container.context();
        let request_1 = context.get::<Request>().unwrap();
        let request_2 = context.get::<Request>().unwrap();

        assert!(!Arc::ptr_eq(&request_1, &request_2));
        assert_eq!(instantiator_call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_release_in_reverse_acquisition_order() {
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        struct A;
        struct B;
        struct C;

        let container = Container::new();
        container
            .register(Provider::scoped(|| Ok::<_, InstantiateErrorKind>(A)).with_finalizer({
                let events = events.clone();
                move |_: Arc<A>| -> anyhow::Result<()> {
                    events.lock().push(String::from("release a"));
                    Ok(())
                }
            }))
            .unwrap();
        container
            .register(Provider::scoped(|| Ok::<_, InstantiateErrorKind>(B)).with_finalizer({
                let events = events.clone();
                move |_: Arc<B>| -> anyhow::Result<()> {
                    events.lock().push(String::from("release b"));
                    Ok(())
                }
            }))
            .unwrap();
        container
            .register(Provider::scoped(|| Ok::<_, InstantiateErrorKind>(C)).with_finalizer({
                let events = events.clone();
                move |_: Arc<C>| -> anyhow::Result<()> {
                    events.lock().push(String::from("release c"));
                    Ok(())
                }
            }))
            .unwrap();

        let context = container.context();
        let _ = context.get::<A>().unwrap();
        let _ = context.get::<B>().unwrap();
        let _ = context.get::<C>().unwrap();

        context.close().unwrap();

        assert_eq!(*events.lock(), vec!["release c", "release b", "release a"]);
    }

    #[test]
    #[traced_test]
    fn test_release_failure_doesnt_stop_unwind() {
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        struct A;
        struct B;

        let container = Container::new();
        container
            .register(Provider::scoped(|| Ok::<_, InstantiateErrorKind>(A)).with_finalizer({
                let events = events.clone();
                move |_: Arc<A>| -> anyhow::Result<()> {
                    events.lock().push(String::from("release a"));
                    Ok(())
                }
            }))
            .unwrap();
        container
            .register(Provider::scoped(|| Ok::<_, InstantiateErrorKind>(B)).with_finalizer({
                let events = events.clone();
                move |_: Arc<B>| -> anyhow::Result<()> {
                    events.lock().push(String::from("release b"));
                    Err(anyhow::anyhow!("flush failed"))
                }
            }))
            .unwrap();

        let context = container.context();
        let _ = context.get::<A>().unwrap();
        let _ = context.get::<B>().unwrap();

        let err = context.close().unwrap_err();

        assert_eq!(err.failures.len(), 1);
        assert_eq!(*events.lock(), vec!["release b", "release a"]);
    }

    #[test]
    #[traced_test]
    fn test_cyclic_dependency_detected() {
        #[derive(Debug)]
        struct X(#[allow(dead_code)] Arc<Y>);
        #[derive(Debug)]
        struct Y(#[allow(dead_code)] Arc<X>);

        let container = Container::new();
        container
            .register(Provider::scoped(|Inject(y): Inject<Y>| Ok::<_, InstantiateErrorKind>(X(y))))
            .unwrap();
        container
            .register(Provider::scoped(|Inject(x): Inject<X>| Ok::<_, InstantiateErrorKind>(Y(x))))
            .unwrap();

        let context = container.context();

        let err = context.get::<X>().unwrap_err();
        assert!(matches!(flatten_resolve_err(err), ResolveErrorKind::CyclicDependency { .. }));

        let err = context.get::<Y>().unwrap_err();
        assert!(matches!(flatten_resolve_err(err), ResolveErrorKind::CyclicDependency { .. }));
    }

    fn flatten_resolve_err(mut err: ResolveErrorKind) -> ResolveErrorKind {
        use crate::errors::InstantiatorErrorKind;

        loop {
            match err {
                ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(inner)) => err = *inner,
                other => return other,
            }
        }
    }

    #[test]
    #[traced_test]
    fn test_unregistered_type() {
        let container = Container::new();
        let context = container.context();

        assert!(matches!(
            context.get::<Request>(),
            Err(ResolveErrorKind::NoProvider { type_info: _ })
        ));
    }

    #[test]
    #[traced_test]
    fn test_get_transient_requires_transient_binding() {
        let container = Container::new();
        container
            .register(Provider::scoped(|| Ok::<_, InstantiateErrorKind>(Request)))
            .unwrap();

        let context = container.context();

        assert!(matches!(
            context.get_transient::<Request>(),
            Err(ResolveErrorKind::LifetimeMismatch {
                expected: Lifetime::Transient,
                ..
            })
        ));
    }

    #[test]
    #[traced_test]
    fn test_seeded_context_values() {
        let container = Container::new();

        let mut seed = Context::new();
        seed.insert(Session("abc"));

        let context = container.context_with(seed);
        let session_1 = context.get::<Session>().unwrap();
        let session_2 = context.get::<Session>().unwrap();

        assert_eq!(session_1.0, "abc");
        assert!(Arc::ptr_eq(&session_1, &session_2));
    }
}
