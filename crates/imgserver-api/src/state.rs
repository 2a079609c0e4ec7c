use imgserver_core::Config;
use imgserver_engine::ImageService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: ImageService,
    pub config: Config,
}

impl AppState {
    pub fn new(service: ImageService, config: Config) -> Self {
        Self { service, config }
    }
}
