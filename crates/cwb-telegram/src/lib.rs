//! Telegram adapter (teloxide).
//!
//! This crate implements the `cwb-core` MessagingPort over the Telegram Bot
//! API and routes inbound updates into the conversation state machine.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use cwb_core::{domain::UserId, errors::Error, messaging::port::MessagingPort, Result};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Users are keyed by their private chat id.
    pub fn user_id(chat_id: teloxide::types::ChatId) -> UserId {
        UserId(chat_id.0.to_string())
    }

    fn tg_chat(user: &UserId) -> Result<teloxide::types::ChatId> {
        user.as_str()
            .parse::<i64>()
            .map(teloxide::types::ChatId)
            .map_err(|_| Error::External(format!("not a telegram chat id: {user}")))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn deliver(&self, user: &UserId, text: &str) -> Result<()> {
        let chat = Self::tg_chat(user)?;
        self.with_retry(|| self.bot.send_message(chat, text.to_string()))
            .await?;
        Ok(())
    }
}
