use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{domain::UserId, errors::Error, Result};

/// Per-user registration and monitoring state.
///
/// Created empty on first contact, filled in as the user supplies a target
/// URL and then a ticket number, and destroyed on reset or on any terminal
/// poll outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub target_url: Option<String>,
    pub ticket_number: Option<u32>,
    #[serde(default)]
    pub notified: bool,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied through [`SessionStore::update`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub target_url: Option<String>,
    pub ticket_number: Option<u32>,
    pub notified: Option<bool>,
}

impl SessionPatch {
    pub fn target(url: impl Into<String>) -> Self {
        Self {
            target_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn ticket(number: u32) -> Self {
        Self {
            ticket_number: Some(number),
            ..Default::default()
        }
    }

    pub fn notified(flag: bool) -> Self {
        Self {
            notified: Some(flag),
            ..Default::default()
        }
    }
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            target_url: None,
            ticket_number: None,
            notified: false,
            updated_at: Utc::now(),
        }
    }

    /// Both the target and the ticket are known, so the poller should watch it.
    pub fn is_monitoring(&self) -> bool {
        self.target_url.is_some() && self.ticket_number.is_some()
    }

    /// Whether `other` still watches the same target and ticket as `self`.
    pub fn same_watch(&self, other: &Session) -> bool {
        self.target_url == other.target_url && self.ticket_number == other.ticket_number
    }

    /// Apply a patch, keeping the record's invariants.
    ///
    /// - a ticket number cannot be recorded before a target URL
    /// - the target URL is fixed once a ticket number is recorded
    /// - changing the ticket number resets `notified` unless the patch sets it
    pub fn apply(&mut self, patch: SessionPatch) -> Result<()> {
        let SessionPatch {
            target_url,
            ticket_number,
            notified,
        } = patch;

        if self.ticket_number.is_some()
            && target_url.is_some()
            && target_url != self.target_url
        {
            return Err(Error::InvalidTransition(format!(
                "target url for {} changed after a ticket number was recorded",
                self.user_id
            )));
        }

        let next_target = target_url.or_else(|| self.target_url.clone());
        if ticket_number.is_some() && next_target.is_none() {
            return Err(Error::InvalidTransition(format!(
                "ticket number for {} recorded before a target url",
                self.user_id
            )));
        }

        let ticket_changed = ticket_number.is_some() && ticket_number != self.ticket_number;

        self.target_url = next_target;
        if ticket_number.is_some() {
            self.ticket_number = ticket_number;
        }
        match notified {
            Some(flag) => self.notified = flag,
            None if ticket_changed => self.notified = false,
            None => {}
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Persistence port for session records, keyed by user identifier.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user: &UserId) -> Result<Option<Session>>;

    /// Create (or overwrite with) an empty session for `user`.
    async fn create(&self, user: &UserId) -> Result<Session>;

    async fn update(&self, user: &UserId, patch: SessionPatch) -> Result<Session>;

    /// Remove the session; returns whether one existed.
    async fn delete(&self, user: &UserId) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<Session>>;
}
