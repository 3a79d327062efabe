use async_trait::async_trait;

use crate::{domain::UserId, Result};

/// Outbound messaging port.
///
/// Used both for replies to an inbound message and for unsolicited pushes
/// from the poller; the transport decides how a user id maps to a chat.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn deliver(&self, user: &UserId, text: &str) -> Result<()>;
}
