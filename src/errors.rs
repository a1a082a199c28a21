mod binding;
mod instantiate;
mod instantiator;
mod release;
mod resolve;
mod start;

pub use binding::BindingError;
pub use instantiate::InstantiateErrorKind;
pub use instantiator::InstantiatorErrorKind;
pub use release::{ReleaseError, ReleaseFailure, ReleaseSubject};
pub use resolve::{CycleChain, ResolveErrorKind};
pub use start::{BuildError, StartError, StartErrorKind};
