use alloc::boxed::Box;

use crate::application::Application;

/// Scoped-acquisition unit for an application-wide resource, such as a
/// connection pool or a background worker.
///
/// Configured lifespans are entered in list order during
/// [`Application::start`] and exited in reverse order during shutdown.
pub trait Lifespan: Send + Sync {
    #[allow(clippy::missing_errors_doc)]
    fn enter(&mut self) -> anyhow::Result<()>;

    #[allow(clippy::missing_errors_doc)]
    fn exit(&mut self) -> anyhow::Result<()>;
}

pub type LifespanFactory = Box<dyn FnOnce(&Application) -> Box<dyn Lifespan> + Send + Sync>;

/// A lifespan as configured on the application: either the manager
/// itself, or a factory invoked with the application at startup.
pub enum LifespanSetup {
    Manager(Box<dyn Lifespan>),
    Factory(LifespanFactory),
}

/// Stand-in used when no lifespan is configured, so startup hooks still
/// run once.
pub(crate) struct NoopLifespan;

impl Lifespan for NoopLifespan {
    fn enter(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn exit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
