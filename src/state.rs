use std::sync::Arc;

use crate::gateway::GenerationGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GenerationGateway>,
}

impl AppState {
    pub fn new(gateway: GenerationGateway) -> Self {
        AppState {
            gateway: Arc::new(gateway),
        }
    }
}
