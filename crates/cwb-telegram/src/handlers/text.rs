use teloxide::prelude::*;

use cwb_core::{domain::UserId, messaging::types::InboundMessage};

use super::{reply, reply_error};
use crate::router::AppState;

pub async fn handle_text(state: &AppState, user: &UserId, text: &str) -> ResponseResult<()> {
    let inbound = InboundMessage::new(user.clone(), text);
    match state.conversation.handle(&inbound).await {
        Ok(r) => reply(state, user, &r.text).await,
        Err(e) => reply_error(state, user, e).await,
    }
    Ok(())
}
