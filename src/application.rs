use alloc::{boxed::Box, string::String, vec::Vec};
use core::{
    fmt::{self, Debug, Display, Formatter},
    mem,
};
use tracing::{debug, error, info};

use crate::{
    container::{Container, LifespanGuard},
    errors::{BuildError, ReleaseError, ReleaseFailure, ReleaseSubject, StartError, StartErrorKind},
    extension::Extension,
    lifespan::{Lifespan, LifespanFactory, LifespanSetup, NoopLifespan},
    provider::Provider,
};

/// Lifecycle phase of an [`Application`]. `Shutdown` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Started,
    Shutdown,
}

impl Phase {
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Constructed => "constructed",
            Phase::Started => "started",
            Phase::Shutdown => "shutdown",
        }
    }
}

/// One pending release, pushed during startup and popped during unwind.
enum Unwind {
    ContainerLifespan,
    LifespanExit { index: usize },
    ShutdownHook { index: usize },
}

/// Orchestrates startup and shutdown around the container's lifespan.
///
/// Everything acquired during [`Application::start`] is pushed onto a
/// single unwind stack, so a failure partway through startup releases
/// what was already entered through the same path as a regular shutdown:
/// container lifespan first, then configured lifespans in reverse entry
/// order, then shutdown hooks in reverse registration order.
pub struct Application {
    name: String,
    container: Container,
    extensions: Vec<Box<dyn Extension>>,
    lifespans: Vec<LifespanSetup>,
    entered: Vec<Box<dyn Lifespan>>,
    container_lifespan: Option<LifespanGuard>,
    unwind: Vec<Unwind>,
    phase: Phase,
}

impl Application {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder {
            name: name.into(),
            container: Container::new(),
            providers: Vec::new(),
            extensions: Vec::new(),
            lifespans: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Enters every configured lifespan in list order, running startup
    /// hooks after each entry, then enters the container's lifespan.
    ///
    /// # Errors
    /// Returns [`StartError`] when a lifespan entry or startup hook
    /// fails; everything entered up to that point is unwound first, and
    /// failures of that unwind pass are carried alongside the cause.
    pub fn start(&mut self) -> Result<(), StartError> {
        if self.phase != Phase::Constructed {
            return Err(StartError {
                kind: StartErrorKind::InvalidPhase { phase: self.phase },
                unwind: None,
            });
        }
        info!(application = %self.name, "Starting");

        for index in 0..self.extensions.len() {
            self.unwind.push(Unwind::ShutdownHook { index });
        }

        let setups = mem::take(&mut self.lifespans);
        for (index, setup) in setups.into_iter().enumerate() {
            let mut lifespan = match setup {
                LifespanSetup::Manager(lifespan) => lifespan,
                LifespanSetup::Factory(factory) => factory(self),
            };
            debug!(index, "Entering lifespan");
            if let Err(error) = lifespan.enter() {
                return Err(self.fail_start(StartErrorKind::Lifespan { index, error }));
            }
            self.entered.push(lifespan);
            self.unwind.push(Unwind::LifespanExit { index });

            for hook_index in 0..self.extensions.len() {
                debug!(index = hook_index, "Running startup hook");
                if let Err(error) = self.extensions[hook_index].on_app_startup(self) {
                    return Err(self.fail_start(StartErrorKind::StartupHook { index: hook_index, error }));
                }
            }
        }

        // Singletons become constructible only after all external
        // lifespans are active.
        self.container_lifespan = Some(self.container.lifespan());
        self.unwind.push(Unwind::ContainerLifespan);

        self.phase = Phase::Started;
        info!(application = %self.name, "Started");
        Ok(())
    }

    /// Unwinds everything acquired by [`Application::start`] and marks
    /// the application shut down. Best-effort: every release is
    /// attempted, collected failures are surfaced afterwards.
    #[allow(clippy::missing_errors_doc)]
    pub fn shutdown(&mut self) -> Result<(), ReleaseError> {
        info!(application = %self.name, "Shutting down");
        let result = self.unwind_stack();
        self.phase = Phase::Shutdown;
        result
    }

    fn fail_start(&mut self, kind: StartErrorKind) -> StartError {
        error!(application = %self.name, "{kind}");
        let unwind = self.unwind_stack();
        self.phase = Phase::Shutdown;
        StartError {
            kind,
            unwind: unwind.err(),
        }
    }

    fn unwind_stack(&mut self) -> Result<(), ReleaseError> {
        let mut failures = Vec::new();
        while let Some(step) = self.unwind.pop() {
            match step {
                Unwind::ContainerLifespan => {
                    debug!("Exiting container lifespan");
                    if let Some(guard) = self.container_lifespan.take() {
                        if let Err(err) = guard.close() {
                            failures.extend(err.failures);
                        }
                    }
                }
                Unwind::LifespanExit { index } => {
                    debug!(index, "Exiting lifespan");
                    if let Err(error) = self.entered[index].exit() {
                        error!(index, "Lifespan exit failed: {error}");
                        failures.push(ReleaseFailure {
                            subject: ReleaseSubject::Lifespan { index },
                            error,
                        });
                    }
                }
                Unwind::ShutdownHook { index } => {
                    debug!(index, "Running shutdown hook");
                    if let Err(error) = self.extensions[index].on_app_shutdown(self) {
                        error!(index, "Shutdown hook failed: {error}");
                        failures.push(ReleaseFailure {
                            subject: ReleaseSubject::ShutdownHook { index },
                            error,
                        });
                    }
                }
            }
        }

        ReleaseError::from_failures(failures)
    }
}

impl Display for Application {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Application[{}]", self.name)
    }
}

impl Debug for Application {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Application[{}]", self.name)
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        if self.phase == Phase::Started {
            if let Err(err) = self.shutdown() {
                error!("{}", err);
            }
            debug!("Application shut down on drop");
        }
    }
}

pub struct ApplicationBuilder {
    name: String,
    container: Container,
    providers: Vec<Provider>,
    extensions: Vec<Box<dyn Extension>>,
    lifespans: Vec<LifespanSetup>,
}

impl ApplicationBuilder {
    /// Replaces the application's container. A fresh one is used when
    /// not supplied.
    #[must_use]
    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    #[must_use]
    pub fn lifespan(mut self, lifespan: impl Lifespan + 'static) -> Self {
        self.lifespans.push(LifespanSetup::Manager(Box::new(lifespan)));
        self
    }

    #[must_use]
    pub fn lifespan_factory(mut self, factory: impl FnOnce(&Application) -> Box<dyn Lifespan> + Send + Sync + 'static) -> Self {
        self.lifespans.push(LifespanSetup::Factory(Box::new(factory) as LifespanFactory));
        self
    }

    /// Registers the collected providers, then runs every extension's
    /// init hook in registration order.
    ///
    /// # Errors
    /// Returns [`BuildError`] when a provider fails validation or an
    /// init hook fails.
    pub fn build(self) -> Result<Application, BuildError> {
        let Self {
            name,
            container,
            providers,
            extensions,
            mut lifespans,
        } = self;

        for provider in providers {
            container.register(provider)?;
        }

        if lifespans.is_empty() {
            lifespans.push(LifespanSetup::Manager(Box::new(NoopLifespan)));
        }

        let mut app = Application {
            name,
            container,
            extensions,
            lifespans,
            entered: Vec::new(),
            container_lifespan: None,
            unwind: Vec::new(),
            phase: Phase::Constructed,
        };

        let extensions = mem::take(&mut app.extensions);
        for (index, extension) in extensions.iter().enumerate() {
            debug!(index, "Running init hook");
            extension.on_app_init(&mut app).map_err(|error| BuildError::Init { index, error })?;
        }
        app.extensions = extensions;

        info!(application = %app.name, "Application constructed");
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{format, string::{String, ToString}};
    use tracing_test::traced_test;

    use super::{Application, Phase};
    use crate::errors::StartErrorKind;

    #[test]
    #[traced_test]
    fn test_phase_transitions() {
        let mut app = Application::builder("billing").build().unwrap();
        assert_eq!(app.phase(), Phase::Constructed);

        app.start().unwrap();
        assert_eq!(app.phase(), Phase::Started);

        app.shutdown().unwrap();
        assert_eq!(app.phase(), Phase::Shutdown);
    }

    #[test]
    #[traced_test]
    fn test_start_is_not_reentrant() {
        let mut app = Application::builder("billing").build().unwrap();
        app.start().unwrap();

        let err = app.start().unwrap_err();
        assert!(matches!(err.kind, StartErrorKind::InvalidPhase { phase: Phase::Started }));
    }

    #[test]
    #[traced_test]
    fn test_start_after_shutdown_refused() {
        let mut app = Application::builder("billing").build().unwrap();
        app.start().unwrap();
        app.shutdown().unwrap();

        let err = app.start().unwrap_err();
        assert!(matches!(err.kind, StartErrorKind::InvalidPhase { phase: Phase::Shutdown }));
    }

    #[test]
    #[traced_test]
    fn test_repr() {
        let app = Application::builder("billing").build().unwrap();
        assert_eq!(format!("{app}"), "Application[billing]");
        assert_eq!(format!("{app:?}"), "Application[billing]");
    }
}
