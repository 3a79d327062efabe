//! Per-user conversation state machine.
//!
//! Decides, for each inbound text, which session mutation to make and what to
//! reply. The state is derived from which session fields are set; this module
//! never talks to the status source.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::{
    domain::UserId,
    locks::UserLocks,
    messages::Messages,
    messaging::types::InboundMessage,
    session::{Session, SessionPatch, SessionStore},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationState {
    /// No session record.
    New,
    AwaitingTarget,
    AwaitingNumber,
    Monitoring,
}

impl ConversationState {
    pub fn of(session: Option<&Session>) -> Self {
        match session {
            None => Self::New,
            Some(s) if s.target_url.is_none() => Self::AwaitingTarget,
            Some(s) if s.ticket_number.is_none() => Self::AwaitingNumber,
            Some(_) => Self::Monitoring,
        }
    }
}

/// Reply text plus the state the user is in after the message was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub state: ConversationState,
}

impl Reply {
    fn new(text: impl Into<String>, state: ConversationState) -> Self {
        Self {
            text: text.into(),
            state,
        }
    }
}

/// Malformed user input. Never retried: the session is dropped and the user
/// starts over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid ticket number: {0}")]
    InvalidNumber(String),
}

/// Parse a clinic portal reference: an absolute http(s) URL with a host.
pub fn parse_target_url(text: &str) -> std::result::Result<Url, InputError> {
    let raw = text.trim();
    let url = Url::parse(raw).map_err(|e| InputError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(InputError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Parse a queue ticket: a positive integer.
pub fn parse_ticket_number(text: &str) -> std::result::Result<u32, InputError> {
    let raw = text.trim();
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(InputError::InvalidNumber(raw.to_string())),
    }
}

pub struct Conversation {
    store: Arc<dyn SessionStore>,
    locks: Arc<UserLocks>,
    messages: Messages,
    reset_keywords: Vec<String>,
}

impl Conversation {
    /// `extra_reset_keywords` extend the built-in `reset` and the locale's keyword.
    pub fn new(
        store: Arc<dyn SessionStore>,
        locks: Arc<UserLocks>,
        messages: Messages,
        extra_reset_keywords: &[String],
    ) -> Self {
        let mut reset_keywords = vec!["reset".to_string(), messages.reset_keyword.to_lowercase()];
        for kw in extra_reset_keywords {
            let kw = kw.trim().to_lowercase();
            if !kw.is_empty() && !reset_keywords.contains(&kw) {
                reset_keywords.push(kw);
            }
        }

        Self {
            store,
            locks,
            messages,
            reset_keywords,
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn is_reset(&self, text: &str) -> bool {
        let t = text.trim().to_lowercase();
        self.reset_keywords.iter().any(|k| *k == t)
    }

    /// Route one inbound text message.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<Reply> {
        let user = &msg.user_id;
        let _guard = self.locks.lock_user(user).await;

        // Reset wins over every state.
        if self.is_reset(&msg.text) {
            return self.reset_locked(user).await;
        }

        let session = self.store.get(user).await?;
        match ConversationState::of(session.as_ref()) {
            ConversationState::New => self.on_first_contact(user, &msg.text).await,
            ConversationState::AwaitingTarget => self.on_target(user, &msg.text).await,
            ConversationState::AwaitingNumber => self.on_number(user, &msg.text).await,
            ConversationState::Monitoring => {
                let ticket = session.and_then(|s| s.ticket_number).unwrap_or_default();
                Ok(Reply::new(
                    self.messages.already_monitoring(ticket),
                    ConversationState::Monitoring,
                ))
            }
        }
    }

    /// Drop the user's session (if any).
    pub async fn reset(&self, user: &UserId) -> Result<Reply> {
        let _guard = self.locks.lock_user(user).await;
        self.reset_locked(user).await
    }

    /// Start over with an empty session and the welcome prompt.
    pub async fn start(&self, user: &UserId) -> Result<Reply> {
        let _guard = self.locks.lock_user(user).await;
        self.store.create(user).await?;
        info!(user = %user, "session started");
        Ok(Reply::new(
            self.messages.welcome,
            ConversationState::AwaitingTarget,
        ))
    }

    /// Human-readable summary of the user's session.
    pub async fn describe(&self, user: &UserId) -> Result<String> {
        let session = self.store.get(user).await?;
        Ok(self.messages.describe(session.as_ref()))
    }

    async fn reset_locked(&self, user: &UserId) -> Result<Reply> {
        let existed = self.store.delete(user).await?;
        info!(user = %user, existed, "session reset");
        Ok(Reply::new(self.messages.reset, ConversationState::New))
    }

    /// Unknown user: open a session. A URL sent straight away is accepted as
    /// the target (users who just reset usually reply with it).
    async fn on_first_contact(&self, user: &UserId, text: &str) -> Result<Reply> {
        self.store.create(user).await?;
        info!(user = %user, "new session");

        match parse_target_url(text) {
            Ok(url) => {
                self.store
                    .update(user, SessionPatch::target(url.as_str()))
                    .await?;
                Ok(Reply::new(
                    self.messages.request_number,
                    ConversationState::AwaitingNumber,
                ))
            }
            Err(_) => Ok(Reply::new(
                self.messages.welcome,
                ConversationState::AwaitingTarget,
            )),
        }
    }

    async fn on_target(&self, user: &UserId, text: &str) -> Result<Reply> {
        match parse_target_url(text) {
            Ok(url) => {
                self.store
                    .update(user, SessionPatch::target(url.as_str()))
                    .await?;
                info!(user = %user, url = %url, "target recorded");
                Ok(Reply::new(
                    self.messages.request_number,
                    ConversationState::AwaitingNumber,
                ))
            }
            Err(e) => {
                warn!(user = %user, "{e}");
                self.store.delete(user).await?;
                Ok(Reply::new(self.messages.invalid_url, ConversationState::New))
            }
        }
    }

    async fn on_number(&self, user: &UserId, text: &str) -> Result<Reply> {
        match parse_ticket_number(text) {
            Ok(ticket) => {
                self.store
                    .update(
                        user,
                        SessionPatch {
                            ticket_number: Some(ticket),
                            notified: Some(false),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(user = %user, ticket, "monitoring started");
                Ok(Reply::new(
                    self.messages.number_saved,
                    ConversationState::Monitoring,
                ))
            }
            Err(e) => {
                warn!(user = %user, "{e}");
                self.store.delete(user).await?;
                Ok(Reply::new(
                    self.messages.invalid_number,
                    ConversationState::New,
                ))
            }
        }
    }
}
