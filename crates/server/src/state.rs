use std::sync::Arc;
use proxysheet_core::{
    CompositorFactory, Config, ImageSource, PrintJobRunner, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    image_source: Arc<dyn ImageSource>,
    compositor_factory: Arc<dyn CompositorFactory>,
}

impl AppState {
    pub fn new(
        config: Config,
        image_source: Arc<dyn ImageSource>,
        compositor_factory: Arc<dyn CompositorFactory>,
    ) -> Self {
        Self {
            config,
            image_source,
            compositor_factory,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// A fresh runner for one WebSocket connection.
    pub fn create_runner(&self) -> PrintJobRunner {
        PrintJobRunner::from_config(
            &self.config,
            Arc::clone(&self.image_source),
            Arc::clone(&self.compositor_factory),
        )
    }
}
