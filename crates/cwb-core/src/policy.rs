//! Classification & notification policy shared by the poller.
//!
//! Pure decision logic: given what the portal reported and what the session
//! holds, decide the session mutation and the push to send.

use crate::status::{FailureKind, RemoteStatus};

/// How close the serving number must be to the ticket to warn the user.
pub const WAIT_THRESHOLD: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The clinic already called past the ticket.
    Missed,
    /// The ticket is being called right now.
    AtNumber,
    /// Fewer than [`WAIT_THRESHOLD`] numbers to go.
    Approaching,
    Waiting,
}

/// Classify a serving number against a ticket.
///
/// `Missed` is checked first and must stay first.
pub fn classify(current_number: u32, ticket_number: u32) -> Outcome {
    if current_number > ticket_number {
        return Outcome::Missed;
    }
    if current_number == ticket_number {
        return Outcome::AtNumber;
    }
    if ticket_number - current_number < WAIT_THRESHOLD {
        return Outcome::Approaching;
    }
    Outcome::Waiting
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Keep,
    MarkNotified,
    Destroy,
}

/// Unsolicited push to a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    Missed { ticket: u32, current: u32 },
    AtNumber { ticket: u32 },
    Approaching { current: u32, ticket: u32 },
    OutsideBusinessHours,
    FetchFailed(FailureKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub mutation: Mutation,
    pub notice: Option<Notice>,
}

impl Decision {
    const NOTHING: Decision = Decision {
        mutation: Mutation::Keep,
        notice: None,
    };

    /// Side effects for a successful lookup.
    pub fn for_status(status: RemoteStatus, ticket: u32, notified: bool) -> Self {
        let current = match status {
            RemoteStatus::Closed => {
                return Self {
                    mutation: Mutation::Destroy,
                    notice: Some(Notice::OutsideBusinessHours),
                }
            }
            RemoteStatus::Serving(n) => n,
        };

        match classify(current, ticket) {
            Outcome::Missed => Self {
                mutation: Mutation::Destroy,
                notice: Some(Notice::Missed { ticket, current }),
            },
            Outcome::AtNumber => Self {
                mutation: Mutation::Destroy,
                notice: Some(Notice::AtNumber { ticket }),
            },
            Outcome::Approaching if notified => Self::NOTHING,
            Outcome::Approaching => Self {
                mutation: Mutation::MarkNotified,
                notice: Some(Notice::Approaching { current, ticket }),
            },
            Outcome::Waiting => Self::NOTHING,
        }
    }

    /// Side effects once every retry of a lookup failed: tell the user, keep
    /// the session so the next sweep tries again.
    pub fn for_failure(kind: FailureKind) -> Self {
        Self {
            mutation: Mutation::Keep,
            notice: Some(Notice::FetchFailed(kind)),
        }
    }
}
