/// Instance reuse policy of a binding.
///
/// Pre-built instances registered with [`crate::Provider::object`] are
/// singleton-equivalent: they live in the singleton cache and are never
/// constructed by the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifetime {
    /// One instance for the whole container lifetime.
    Singleton,
    /// One instance per injection context.
    Scoped,
    /// A fresh instance for every resolution call, never cached.
    Transient,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}
