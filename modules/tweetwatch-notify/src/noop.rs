use async_trait::async_trait;

use tweetwatch_common::DispatchError;

use crate::backend::NotifyBackend;
use crate::format::FormattedMessage;

/// No-op notification backend for disabled webhooks and testing.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn send(&self, _message: &FormattedMessage) -> Result<(), DispatchError> {
        Ok(())
    }
}
