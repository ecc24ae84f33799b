use async_trait::async_trait;

use tweetwatch_common::DispatchError;

use crate::format::FormattedMessage;

/// Pluggable notification transport. One call is one outbound message;
/// classification of failures into transient vs permanent is the backend's
/// responsibility, retry policy is the dispatcher's.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    async fn send(&self, message: &FormattedMessage) -> Result<(), DispatchError>;
}
