use std::sync::Arc;
use teloxide::prelude::*;
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use dotenv;

use kitobxona::bot;
use kitobxona::config::BotConfig;
use kitobxona::gateway::BackendGateway;
use kitobxona::localization::{init_localization, t_lang};
use kitobxona::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Kitobxona Telegram Bot");

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Exits non-zero when BOT_TOKEN or API_URL is missing
    let config = BotConfig::from_env()?;

    init_localization()?;

    info!(api_base_url = %config.api_base_url, "Connecting to library backend");

    let gateway = Arc::new(BackendGateway::new(
        &config.api_base_url,
        config.http_timeout_secs,
    )?);
    let store = Arc::new(SessionStore::new(config.session_timeout_secs));

    // Initialize the bot
    let bot = Bot::new(&config.bot_token);

    // Expiry is silent unless notifications are configured
    if config.notify_on_timeout {
        spawn_expiry_notifier(bot.clone(), Arc::clone(&store), config.sweep_interval_secs);
    }

    info!("Bot initialized, starting dispatcher");

    // Set up the dispatcher with shared session store and gateway
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let store = Arc::clone(&store);
            let gateway = Arc::clone(&gateway);
            move |bot: Bot, msg: Message| {
                let store = Arc::clone(&store);
                let gateway = Arc::clone(&gateway);
                async move { bot::message_handler(bot, msg, store, gateway).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let store = Arc::clone(&store);
            let gateway = Arc::clone(&gateway);
            move |bot: Bot, q: CallbackQuery| {
                let store = Arc::clone(&store);
                let gateway = Arc::clone(&gateway);
                async move { bot::callback_handler(bot, q, store, gateway).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Periodically clear idle flows and tell the affected users
fn spawn_expiry_notifier(bot: Bot, store: Arc<SessionStore>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            for (user_id, language_code) in store.sweep_expired().await {
                let chat_id = ChatId(user_id as i64);
                if let Err(e) = bot
                    .send_message(chat_id, t_lang("session-expired", language_code.as_deref()))
                    .await
                {
                    warn!(user_id, error = %e, "Failed to deliver session expiry notice");
                }
            }
        }
    });
}
