use crate::{context::InjectionContext, errors::ResolveErrorKind};

/// Resolves a factory parameter through the active injection context.
///
/// Tuples of resolvers resolve left to right, so a factory's declared
/// parameter order is its dependency resolution order.
pub trait DependencyResolver: Sized {
    type Error: Into<ResolveErrorKind>;

    fn resolve(context: &InjectionContext) -> Result<Self, Self::Error>;
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            type Error = ResolveErrorKind;

            #[inline]
            #[allow(unused_variables)]
            fn resolve(context: &InjectionContext) -> Result<Self, Self::Error> {
                Ok(($($ty::resolve(context).map_err(Into::into)?,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);
