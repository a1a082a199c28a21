use alloc::{boxed::Box, sync::Arc};
use core::any::Any;

use crate::service::{service_fn, BoxCloneService};

/// Release routine for a cached dependency, invoked during unwind in
/// reverse acquisition order.
///
/// Attaching a finalizer makes the binding a scoped-acquisition resource:
/// the instance is recorded on the owning acquisition stack when it is
/// constructed, and the finalizer runs when that stack unwinds (context
/// close for scoped bindings, container lifespan close for singletons).
pub trait Finalizer<Dep>: Clone + 'static {
    fn finalize(&mut self, dependency: Arc<Dep>) -> anyhow::Result<()>;
}

pub(crate) type BoxedCloneFinalizer = BoxCloneService<Arc<dyn Any + Send + Sync>, (), anyhow::Error>;

#[must_use]
pub(crate) fn boxed_finalizer_factory<Dep, Fin>(mut finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send + Sync,
{
    BoxCloneService(Box::new(service_fn(move |dependency: Arc<dyn Any + Send + Sync>| {
        let dependency = dependency
            .downcast::<Dep>()
            .expect("finalizer target type is checked at registration");
        finalizer.finalize(dependency)
    })))
}

impl<F, Dep> Finalizer<Dep> for F
where
    F: FnMut(Arc<Dep>) -> anyhow::Result<()> + Clone + 'static,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) -> anyhow::Result<()> {
        self(dependency)
    }
}
