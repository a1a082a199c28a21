use super::{binding::BindingError, release::ReleaseError};
use crate::application::Phase;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("Init hook {index} failed: {error}")]
    Init { index: usize, error: anyhow::Error },
}

/// Startup failure. When entry fails partway, everything already entered
/// is unwound before this error is returned; `unwind` carries the
/// failures of that unwind pass, if any.
#[derive(thiserror::Error, Debug)]
#[error("{kind}")]
pub struct StartError {
    #[source]
    pub kind: StartErrorKind,
    pub unwind: Option<ReleaseError>,
}

#[derive(thiserror::Error, Debug)]
pub enum StartErrorKind {
    #[error("Application can't start from the {} phase", phase.name())]
    InvalidPhase { phase: Phase },
    #[error("Lifespan {index} failed to enter: {error}")]
    Lifespan { index: usize, error: anyhow::Error },
    #[error("Startup hook {index} failed: {error}")]
    StartupHook { index: usize, error: anyhow::Error },
}
