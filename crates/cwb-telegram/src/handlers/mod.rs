//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - turns the Telegram message into a transport-agnostic inbound event
//! - calls into the `cwb-core` conversation state machine
//! - delivers the reply through the messaging port

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::error;

use cwb_core::domain::UserId;

use crate::router::AppState;
use crate::TelegramMessenger;

mod commands;
mod text;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user = TelegramMessenger::user_id(msg.chat.id);

    let Some(text) = msg.text() else {
        reply(&state, &user, state.messages().text_only).await;
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(&state, &user, text).await;
    }

    text::handle_text(&state, &user, text).await
}

/// Send a reply; failures are logged, the update is still considered handled.
pub(crate) async fn reply(state: &AppState, user: &UserId, text: &str) {
    if let Err(e) = state.messenger.deliver(user, text).await {
        error!(user = %user, "failed to deliver reply: {e}");
    }
}

/// Log a handler failure and tell the user something went wrong.
pub(crate) async fn reply_error(state: &AppState, user: &UserId, e: cwb_core::Error) {
    error!(user = %user, "message handling error: {e}");
    reply(state, user, state.messages().system_error).await;
}
