use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{info, warn};

use cwb_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use cwb_core::{
    config::Config,
    conversation::Conversation,
    locks::UserLocks,
    messages::Messages,
    messaging::port::MessagingPort,
    poller::Poller,
    session::SessionStore,
    status::StatusSource,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
    pub messenger: Arc<dyn MessagingPort>,
}

impl AppState {
    pub fn messages(&self) -> &Messages {
        self.conversation.messages()
    }
}

/// Wire the bot together and run until the dispatcher stops (ctrl-c).
pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<dyn SessionStore>,
    source: Arc<dyn StatusSource>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!("clinic wait bot started: @{}", me.username()),
        Err(e) => warn!("get_me failed: {e}"),
    }

    // Sweeps can push to many users at once; throttle to stay under Telegram's
    // flood limits. The adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let messages = Messages::for_locale(cfg.locale);
    let locks = Arc::new(UserLocks::new());
    let conversation = Arc::new(Conversation::new(
        store.clone(),
        locks.clone(),
        messages.clone(),
        &cfg.reset_keywords,
    ));
    let poller = Poller::new(
        cfg.poller(),
        store,
        source,
        messenger.clone(),
        locks,
        messages,
    );
    poller.start().await;

    let state = Arc::new(AppState {
        conversation,
        messenger,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    poller.stop().await;
    Ok(())
}
