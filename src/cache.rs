use alloc::{boxed::Box, collections::vec_deque::VecDeque, sync::Arc, vec::Vec};
use core::{
    any::{Any, TypeId},
    mem,
};

use crate::{
    any::{Map, TypeInfo},
    finalizer::BoxedCloneFinalizer,
};

/// Instance storage of one cache tier plus its acquisition stack.
///
/// The container holds one for singletons, each injection context holds
/// one for scoped instances. The map is created lazily on first write.
#[derive(Default)]
pub(crate) struct Cache {
    pub(crate) map: Option<Box<Map>>,
    pub(crate) resolved: ResolvedSet,
}

impl Cache {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            map: None,
            resolved: ResolvedSet::new(),
        }
    }

    #[inline]
    pub(crate) fn insert_rc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.map.get_or_insert_with(Box::default).insert(TypeId::of::<T>(), value);
    }

    #[inline]
    pub(crate) fn insert_any(&mut self, type_id: TypeId, value: Arc<dyn Any + Send + Sync>) {
        self.map.get_or_insert_with(Box::default).insert(type_id, value);
    }

    #[must_use]
    pub(crate) fn get<T: Send + Sync + 'static>(&self, type_id: &TypeId) -> Option<Arc<T>> {
        self.map
            .as_ref()
            .and_then(|map| map.get(type_id))
            .and_then(|boxed| boxed.clone().downcast().ok())
    }

    #[must_use]
    pub(crate) fn get_any(&self, type_id: &TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.map.as_ref().and_then(|map| map.get(type_id)).cloned()
    }

    pub(crate) fn remove_any(&mut self, type_id: &TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.map.as_mut().and_then(|map| map.remove(type_id))
    }

    #[inline]
    pub(crate) fn seed(&mut self, values: &Map) {
        if values.is_empty() {
            return;
        }
        self.map
            .get_or_insert_with(Box::default)
            .extend(values.iter().map(|(type_id, value)| (*type_id, value.clone())));
    }

    #[inline]
    pub(crate) fn push_resolved(&mut self, resolved: Resolved) {
        self.resolved.push(resolved);
    }

    #[inline]
    #[must_use]
    pub(crate) fn take_resolved_set(&mut self) -> ResolvedSet {
        mem::take(&mut self.resolved)
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.map = None;
    }
}

/// One acquired resource: the instance and the release thunk recorded at
/// construction time, so a later registry mutation can't change what
/// releases it.
#[derive(Clone)]
pub(crate) struct Resolved {
    pub(crate) type_info: TypeInfo,
    pub(crate) dependency: Arc<dyn Any + Send + Sync>,
    pub(crate) finalizer: BoxedCloneFinalizer,
}

#[derive(Default)]
pub(crate) struct ResolvedSet(pub(crate) VecDeque<Resolved>);

impl ResolvedSet {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self(VecDeque::new())
    }

    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    /// LIFO: the most recently acquired resource is released first.
    pub(crate) fn pop(&mut self) -> Option<Resolved> {
        self.0.pop_back()
    }

    pub(crate) fn remove_matching(&mut self, dependency: &Arc<dyn Any + Send + Sync>) -> Vec<Resolved> {
        let mut removed = Vec::new();
        self.0.retain(|resolved| {
            if Arc::ptr_eq(&resolved.dependency, dependency) {
                removed.push(resolved.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}
