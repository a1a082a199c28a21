use crate::application::Application;

/// Application lifecycle hook object.
///
/// All three hooks default to no-ops; an extension overrides any subset.
pub trait Extension: Send + Sync {
    /// Runs synchronously while the application is built, before any
    /// lifespan is entered. May register additional providers through
    /// the application's container, but must not depend on any started
    /// resource.
    #[allow(clippy::missing_errors_doc)]
    fn on_app_init(&self, app: &mut Application) -> anyhow::Result<()> {
        let _ = app;
        Ok(())
    }

    /// Runs after each configured lifespan is entered, in extension
    /// registration order.
    #[allow(clippy::missing_errors_doc)]
    fn on_app_startup(&self, app: &Application) -> anyhow::Result<()> {
        let _ = app;
        Ok(())
    }

    /// Runs during shutdown, in reverse registration order, after the
    /// container lifespan and every configured lifespan have exited.
    #[allow(clippy::missing_errors_doc)]
    fn on_app_shutdown(&self, app: &Application) -> anyhow::Result<()> {
        let _ = app;
        Ok(())
    }
}
