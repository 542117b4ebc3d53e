//! Update routing and the supervised polling loop.

use crate::bot::handlers::{self, Command};
use crate::config::Settings;
use crate::dispatcher::QueryDispatcher;
use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::RequestError;
use tracing::{debug, error, info};

/// Builds the update routing tree.
///
/// Callback queries go to navigation, commands to their handlers, text to
/// the search flow and everything else to the text-only notice.
#[must_use]
pub fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
                .branch(dptree::endpoint(handle_non_text)),
        )
}

/// Runs the bot until it is stopped with Ctrl-C.
///
/// The token is verified with `getMe` before polling starts. A failed
/// check or a crashed polling task is logged and retried after
/// `POLLING_RESTART_DELAY_SECS`.
///
/// # Errors
///
/// Returns an error if the search client cannot be created.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    let dispatcher = Arc::new(QueryDispatcher::from_settings(&settings)?);
    let delay = settings.restart_delay();

    info!(
        api_url = %settings.leakosint_api_url,
        limit = settings.search_limit,
        lang = %settings.search_lang,
        "Search client initialized."
    );

    loop {
        let bot = Bot::new(settings.telegram_token.clone());

        match bot.get_me().await {
            Ok(me) => info!("Authorized as @{}", me.username()),
            Err(e) => {
                error!(
                    "Bot token check failed: {e}. Restarting in {}s...",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                continue;
            }
        }

        let deps = dptree::deps![dispatcher.clone(), settings.clone()];
        let polling = tokio::spawn(async move {
            Dispatcher::builder(bot, schema())
                .dependencies(deps)
                .default_handler(|upd| async move {
                    debug!("Unhandled update: {}", upd.id.0);
                })
                .enable_ctrlc_handler()
                .build()
                .dispatch()
                .await;
        });

        info!("Bot is running...");

        match polling.await {
            Ok(()) => {
                info!("Polling stopped.");
                break;
            }
            Err(e) => {
                error!(
                    "Bot polling error: {e}. Restarting in {}s...",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dispatcher: Arc<QueryDispatcher>,
    settings: Arc<Settings>,
) -> Result<(), RequestError> {
    let res = match cmd {
        Command::Start | Command::Help => handlers::start(bot, msg).await,
        Command::Stats => handlers::stats(bot, msg, dispatcher, settings).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<QueryDispatcher>,
    settings: Arc<Settings>,
) -> Result<(), RequestError> {
    if let Err(e) = handlers::handle_text(bot, msg, dispatcher, settings).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_non_text(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<QueryDispatcher>,
) -> Result<(), RequestError> {
    if let Err(e) = handlers::handle_non_text(bot, msg, dispatcher).await {
        error!("Non-text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dispatcher: Arc<QueryDispatcher>,
    settings: Arc<Settings>,
) -> Result<(), RequestError> {
    if let Err(e) = handlers::handle_callback(bot, q, dispatcher, settings).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
