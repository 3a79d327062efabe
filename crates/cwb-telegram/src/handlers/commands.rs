use teloxide::prelude::*;

use cwb_core::domain::UserId;

use super::{reply, reply_error};
use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(state: &AppState, user: &UserId, text: &str) -> ResponseResult<()> {
    let (cmd, _args) = parse_command(text);

    let result = match cmd.as_str() {
        "start" => state.conversation.start(user).await.map(|r| r.text),
        "reset" => state.conversation.reset(user).await.map(|r| r.text),
        "status" => state.conversation.describe(user).await,
        _ => Ok(state.messages().help.to_string()),
    };

    match result {
        Ok(text) => reply(state, user, &text).await,
        Err(e) => reply_error(state, user, e).await,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/Status@clinic_wait_bot now"),
            ("status".to_string(), "now".to_string())
        );
        assert_eq!(parse_command("/reset"), ("reset".to_string(), String::new()));
    }
}
