use crate::domain::UserId;

/// Transport-agnostic inbound text message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
        }
    }
}
