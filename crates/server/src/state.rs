use crate::auth::Authenticator;
use crate::config::ServiceConfig;
use semantic::Embedder;
use std::sync::Arc;

/// Shared application state.
///
/// Everything in here is read-only after construction, so handlers may run
/// concurrently against the same instance.
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServiceConfig>,
    pub authenticator: Authenticator,
    pub embedder: Arc<dyn Embedder>,
}

impl ServerState {
    pub fn new(config: ServiceConfig, embedder: Arc<dyn Embedder>) -> Self {
        let authenticator = Authenticator::from_config(&config);
        Self {
            config: Arc::new(config),
            authenticator,
            embedder,
        }
    }
}
