use std::sync::Arc;

use common::error::AppError;
use tokio::sync::RwLock;

/// The last failure worth showing to the user, shared by every component
/// of a session.
#[derive(Clone, Default)]
pub struct ErrorState {
    last: Arc<RwLock<Option<String>>>,
}

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, context: &str, error: &AppError) {
        let message = error.display_message();
        log::warn!("{}: {}", context, message);
        *self.last.write().await = Some(message);
    }

    pub async fn clear(&self) {
        *self.last.write().await = None;
    }

    pub async fn get(&self) -> Option<String> {
        self.last.read().await.clone()
    }
}
