use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use crate::any::TypeInfo;

/// Aggregate of every release that failed during one unwind pass.
///
/// The unwind is best-effort: a failure never prevents the remaining
/// releases from running, and the collected failures are surfaced once
/// the whole pass has been attempted.
#[derive(thiserror::Error, Debug)]
#[error("Unwind completed with {} release failure(s)", failures.len())]
pub struct ReleaseError {
    pub failures: Vec<ReleaseFailure>,
}

impl ReleaseError {
    #[inline]
    pub(crate) fn from_failures(failures: Vec<ReleaseFailure>) -> Result<(), Self> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self { failures })
        }
    }
}

#[derive(Debug)]
pub struct ReleaseFailure {
    pub subject: ReleaseSubject,
    pub error: anyhow::Error,
}

impl Display for ReleaseFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.error)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ReleaseSubject {
    Dependency(TypeInfo),
    Lifespan { index: usize },
    ShutdownHook { index: usize },
}

impl Display for ReleaseSubject {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseSubject::Dependency(type_info) => write!(f, "dependency {}", type_info.name),
            ReleaseSubject::Lifespan { index } => write!(f, "lifespan {index}"),
            ReleaseSubject::ShutdownHook { index } => write!(f, "shutdown hook {index}"),
        }
    }
}
