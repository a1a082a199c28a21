use ahash::AHasher;
use core::{
    array,
    hash::{Hash, Hasher as _},
};
use parking_lot::ReentrantMutex;

#[allow(clippy::cast_possible_truncation)]
fn stripe_index<const N: usize>(val: impl Hash) -> usize {
    let mut hasher = AHasher::default();
    val.hash(&mut hasher);

    hasher.finish() as usize % N
}

/// Striped locks guarding singleton first-construction, so unrelated
/// singleton constructions don't serialize on a single global lock.
///
/// Stripes are reentrant: a singleton factory may recursively construct
/// another singleton that hashes to the same stripe.
pub(crate) struct StripedLocks<const N: usize> {
    stripes: [ReentrantMutex<()>; N],
}

impl<const N: usize> StripedLocks<N> {
    #[inline]
    #[must_use]
    fn new() -> Self {
        Self {
            stripes: array::from_fn(|_| ReentrantMutex::new(())),
        }
    }
}

impl<const N: usize> StripedLocks<N> {
    #[inline]
    #[must_use]
    pub(crate) fn get(&self, val: impl Hash) -> &ReentrantMutex<()> {
        &self.stripes[stripe_index::<N>(val)]
    }
}

impl<const N: usize> Default for StripedLocks<N> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
