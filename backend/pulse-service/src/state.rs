use crate::services::SubscriberRegistry;

/// Shared state handed to every HTTP worker
#[derive(Clone)]
pub struct AppState {
    pub registry: SubscriberRegistry,
}

impl AppState {
    pub fn new(registry: SubscriberRegistry) -> Self {
        Self { registry }
    }
}
