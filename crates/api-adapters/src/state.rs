//! State shared across all request handlers.

use std::sync::Arc;

use domains::AuthProvider;
use services::ThreadService;

#[derive(Clone)]
pub struct AppState {
    pub threads: Arc<ThreadService>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(threads: ThreadService, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            threads: Arc::new(threads),
            auth,
        }
    }
}
