use alloc::boxed::Box;
use core::{
    any::TypeId,
    fmt::{self, Display, Formatter},
};

use super::{instantiate::InstantiateErrorKind, instantiator::InstantiatorErrorKind};
use crate::{any::TypeInfo, lifetime::Lifetime};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Provider not found in registry for {}", type_info.name)]
    NoProvider { type_info: TypeInfo },
    #[error("Cyclic dependency detected: {chain}")]
    CyclicDependency { chain: CycleChain },
    #[error(
        "Binding for {} has {} lifetime, expected {}",
        type_info.name,
        actual.name(),
        expected.name(),
    )]
    LifetimeMismatch {
        type_info: TypeInfo,
        expected: Lifetime,
        actual: Lifetime,
    },
    #[error("Incorrect instantiator provides type. Expected: {}, actual: {actual:?}", expected.name)]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}

/// Resolution chain that closed on itself, in resolution order.
#[derive(Debug, Clone)]
pub struct CycleChain(pub(crate) Box<[TypeInfo]>);

impl Display for CycleChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for type_info in &self.0 {
            write!(f, "{sep}{}", type_info.short_name())?;
            sep = " -> ";
        }
        Ok(())
    }
}
