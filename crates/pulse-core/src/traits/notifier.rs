use async_trait::async_trait;

use crate::types::DigestMessage;

/// Delivers a finished digest. Never fails past its own boundary.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &DigestMessage) -> bool;
}
