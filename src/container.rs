use alloc::{sync::Arc, vec::Vec};
use core::any::{Any, TypeId};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    any::TypeInfo,
    cache::{Cache, Resolved},
    context::{Context, InjectionContext},
    errors::{BindingError, ReleaseError, ReleaseFailure, ReleaseSubject, ResolveErrorKind},
    finalizer::BoxedCloneFinalizer,
    lock::StripedLocks,
    provider::{Implementation, Provider},
    registry::{ProviderEntry, Registry},
    service::Service as _,
};

const SINGLETON_LOCK_STRIPES: usize = 16;

/// The dependency provider: owns the registry and the singleton cache.
///
/// Clones share state. The stable surface is [`Container::register`],
/// [`Container::context`], [`Container::lifespan`] and
/// [`Container::override_provider`].
#[derive(Clone, Default)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding to the registry, replacing any earlier binding for
    /// the same target type. Replacement outside an override scope is
    /// logged as a warning.
    #[allow(clippy::missing_errors_doc)]
    pub fn register(&self, provider: Provider) -> Result<(), BindingError> {
        self.inner.registry.lock().register(provider)
    }

    /// Opens a fresh injection context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> InjectionContext {
        InjectionContext::new(self.clone(), Context::new())
    }

    /// Opens a fresh injection context seeded with pre-built values.
    /// Seeded values behave like already-cached scoped instances.
    #[inline]
    #[must_use]
    pub fn context_with(&self, context: Context) -> InjectionContext {
        InjectionContext::new(self.clone(), context)
    }

    /// Enters the whole-process lifespan of the container.
    ///
    /// On entry every pre-built instance is published to the singleton
    /// cache. Closing (or dropping) the guard releases singleton
    /// acquisitions in reverse creation order and clears the cache.
    #[must_use]
    pub fn lifespan(&self) -> LifespanGuard {
        for (target, instance, finalizer) in self.inner.registry.lock().object_entries() {
            self.inner.publish_instance(target, instance, finalizer.as_ref());
        }
        debug!("Container lifespan entered");

        LifespanGuard { container: self.clone() }
    }

    /// Temporarily replaces a binding, e.g. with a test double.
    ///
    /// The prior binding and any already-published singleton instance of
    /// the target type are stashed and restored when the guard closes;
    /// a singleton instance published by the override itself is released
    /// on exit. Concurrent resolutions of the overridden type from other
    /// threads during the window require external coordination.
    #[allow(clippy::missing_errors_doc)]
    pub fn override_provider(&self, provider: Provider) -> Result<OverrideGuard, BindingError> {
        let target = provider.target;
        let prior = self.inner.registry.lock().swap(provider)?;
        let stashed = self.inner.singletons.lock().remove_any(&target.id);
        debug!(dependency = target.name, "Override entered");

        Ok(OverrideGuard {
            container: self.clone(),
            target,
            prior,
            stashed,
            restored: false,
        })
    }

    #[must_use]
    pub(crate) fn binding(&self, type_id: &TypeId) -> Option<ProviderEntry> {
        self.inner.registry.lock().get(type_id)
    }

    #[must_use]
    pub(crate) fn cached_singleton<Dep: Send + Sync + 'static>(&self, type_id: &TypeId) -> Option<Arc<Dep>> {
        self.inner.singletons.lock().get::<Dep>(type_id)
    }

    /// Construct-once: first construction of each singleton type is
    /// guarded by a striped lock, so concurrent first resolutions build
    /// the instance exactly once without serializing unrelated types.
    pub(crate) fn get_singleton<Dep: Send + Sync + 'static>(
        &self,
        entry: &ProviderEntry,
        context: &InjectionContext,
    ) -> Result<Arc<Dep>, ResolveErrorKind> {
        let _construction = self.inner.locks.get(entry.target.id).lock();

        // Another context may have finished construction while we waited.
        if let Some(dependency) = self.cached_singleton::<Dep>(&entry.target.id) {
            debug!("Found in singleton cache");
            return Ok(dependency);
        }

        match &entry.implementation {
            Implementation::Instance(instance) => {
                self.inner.publish_instance(entry.target, instance.clone(), entry.finalizer.as_ref());
                match instance.clone().downcast::<Dep>() {
                    Ok(dependency) => Ok(dependency),
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
            Implementation::Factory(_) => {
                let dependency = Arc::new(context.construct::<Dep>(entry)?);
                let mut singletons = self.inner.singletons.lock();
                singletons.insert_rc(dependency.clone());
                debug!("Cached in singleton cache");
                if let Some(finalizer) = &entry.finalizer {
                    singletons.push_resolved(Resolved {
                        type_info: entry.target,
                        dependency: dependency.clone(),
                        finalizer: finalizer.clone(),
                    });
                    debug!("Pushed to acquisition stack");
                }
                Ok(dependency)
            }
        }
    }
}

#[derive(Default)]
struct ContainerInner {
    registry: Mutex<Registry>,
    singletons: Mutex<Cache>,
    locks: StripedLocks<SINGLETON_LOCK_STRIPES>,
}

impl ContainerInner {
    fn publish_instance(&self, target: TypeInfo, instance: Arc<dyn Any + Send + Sync>, finalizer: Option<&BoxedCloneFinalizer>) {
        let mut singletons = self.singletons.lock();
        if singletons.get_any(&target.id).is_some() {
            return;
        }
        singletons.insert_any(target.id, instance.clone());
        debug!(dependency = target.name, "Published pre-built instance");
        if let Some(finalizer) = finalizer {
            singletons.push_resolved(Resolved {
                type_info: target,
                dependency: instance,
                finalizer: finalizer.clone(),
            });
        }
    }

    /// Can be called multiple times; only resources acquired since the
    /// last call are released.
    fn close(&self) -> Result<(), ReleaseError> {
        let mut resolved = {
            let mut singletons = self.singletons.lock();
            let resolved = singletons.take_resolved_set();
            singletons.clear();
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

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            error!("{}", err);
        }
        debug!("Container closed on drop");
    }
}

/// Guard for the container's whole-process lifespan.
///
/// Dropping the guard releases singletons with failures logged; use
/// [`LifespanGuard::close`] to observe them instead.
pub struct LifespanGuard {
    container: Container,
}

impl LifespanGuard {
    /// Releases singleton acquisitions in reverse creation order and
    /// clears the singleton cache. Best-effort: every release is
    /// attempted, collected failures are surfaced afterwards.
    #[allow(clippy::missing_errors_doc)]
    pub fn close(&self) -> Result<(), ReleaseError> {
        let result = self.container.inner.close();
        debug!("Container lifespan exited");
        result
    }
}

impl Drop for LifespanGuard {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            error!("{}", err);
        }
    }
}

/// Guard for a temporarily replaced binding. The swap is undone when the
/// guard closes or drops, whichever comes first.
pub struct OverrideGuard {
    container: Container,
    target: TypeInfo,
    prior: Option<ProviderEntry>,
    stashed: Option<Arc<dyn Any + Send + Sync>>,
    restored: bool,
}

impl OverrideGuard {
    pub fn close(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;

        let inner = &self.container.inner;
        inner.registry.lock().restore(self.target.id, self.prior.take());

        let published = {
            let mut singletons = inner.singletons.lock();
            let published = singletons.remove_any(&self.target.id);
            let resolved = published
                .as_ref()
                .map(|instance| singletons.resolved.remove_matching(instance))
                .unwrap_or_default();
            if let Some(instance) = self.stashed.take() {
                singletons.insert_any(self.target.id, instance);
            }
            resolved
        };

        // The override's own instance has no later release point.
        for Resolved {
            type_info,
            dependency,
            mut finalizer,
        } in published.into_iter().rev()
        {
            debug!(dependency = type_info.name, "Releasing");
            if let Err(error) = finalizer.call(dependency) {
                error!(dependency = type_info.name, "Release failed: {error}");
            }
        }

        debug!(dependency = self.target.name, "Override exited");
    }
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
