use crate::bot::resilient::{
    answer_callback_quietly, deliver_page, delete_message_quietly, edit_message_resilient,
    reply_resilient, send_message_resilient, PageTarget,
};
use crate::bot::views::{
    stats_text, EXPIRED_TEXT, PAGE_INDICATOR_ANSWER, SEARCHING_TEXT, TEXT_ONLY_TEXT, WELCOME_TEXT,
};
use crate::config::Settings;
use crate::dispatcher::QueryDispatcher;
use crate::error::NavigationError;
use crate::report::CallbackAction;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{CallbackQuery, ParseMode},
    utils::command::BotCommands,
};
use tracing::{debug, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Show the welcome message.")]
    Start,
    /// Show usage help
    #[command(description = "Show usage help.")]
    Help,
    /// Show bot statistics
    #[command(description = "Show API statistics.")]
    Stats,
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// `/start` and `/help` handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);
    info!("User {user_id} ({user_name}) requested the welcome message.");

    reply_resilient(&bot, msg.chat.id, msg.id, WELCOME_TEXT, Some(ParseMode::Html)).await?;
    Ok(())
}

/// `/stats` handler
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn stats(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<QueryDispatcher>,
    settings: Arc<Settings>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    if let Err(e) = dispatcher.authorize(user_id) {
        send_message_resilient(&bot, msg.chat.id, e.user_message(), None).await?;
        return Ok(());
    }

    let cache = dispatcher.cache();
    cache.run_pending_tasks().await;
    let text = stats_text(&settings, cache.entry_count());

    reply_resilient(&bot, msg.chat.id, msg.id, text, Some(ParseMode::Html)).await?;
    Ok(())
}

/// Runs a search for a text message and replies with its first page.
///
/// # Errors
///
/// Returns an error if neither the page nor the failure notice could be
/// delivered.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<QueryDispatcher>,
    settings: Arc<Settings>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let chat_id = msg.chat.id;
    let query = msg.text().unwrap_or_default();

    if let Err(e) = dispatcher.authorize(user_id) {
        info!(
            "⛔️ Unauthorized query from user {user_id} ({}).",
            get_user_name(&msg)
        );
        send_message_resilient(&bot, chat_id, e.user_message(), None).await?;
        return Ok(());
    }

    let searching = match send_message_resilient(&bot, chat_id, SEARCHING_TEXT, None).await {
        Ok(m) => Some(m.id),
        Err(e) => {
            warn!("Failed to send searching notice: {e}");
            None
        }
    };

    let outcome = dispatcher.dispatch(user_id, query).await;

    if let Some(id) = searching {
        delete_message_quietly(&bot, chat_id, id).await;
    }

    match outcome {
        Ok(page) => {
            let target = PageTarget::Reply {
                chat: chat_id,
                reply_to: msg.id,
            };
            deliver_page(&bot, target, &page, settings.rich_text).await?;
        }
        Err(e) => {
            debug!(user_id, kind = e.kind(), "Replying with failure notice");
            let parse_mode = (!e.is_unauthorized()).then_some(ParseMode::Html);
            reply_resilient(&bot, chat_id, msg.id, e.user_message(), parse_mode).await?;
        }
    }

    Ok(())
}

/// Reply to messages that carry no text
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_non_text(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<QueryDispatcher>,
) -> Result<()> {
    let text = match dispatcher.authorize(get_user_id_safe(&msg)) {
        Ok(()) => TEXT_ONLY_TEXT,
        Err(e) => e.user_message(),
    };
    send_message_resilient(&bot, msg.chat.id, text, None).await?;
    Ok(())
}

/// Handle page navigation callbacks.
///
/// The callback is always answered; the report message is edited in place.
///
/// # Errors
///
/// Returns an error if the edited page cannot be delivered.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dispatcher: Arc<QueryDispatcher>,
    settings: Arc<Settings>,
) -> Result<()> {
    let action = q.data.as_deref().and_then(CallbackAction::parse);

    let action = match action {
        Some(CallbackAction::PageInfo) => {
            bot.answer_callback_query(q.id.clone())
                .text(PAGE_INDICATOR_ANSWER)
                .await?;
            return Ok(());
        }
        Some(CallbackAction::Page(action)) => action,
        None => {
            debug!("Ignoring unknown callback data: {:?}", q.data);
            answer_callback_quietly(&bot, &q).await;
            return Ok(());
        }
    };

    answer_callback_quietly(&bot, &q).await;

    let user_id = q.from.id.0.cast_signed();
    if !dispatcher.is_authorized(user_id) {
        debug!(user_id, "Ignoring navigation from unauthorized user");
        return Ok(());
    }

    let message = q
        .message
        .as_ref()
        .ok_or_else(|| anyhow!("Callback message missing"))?;
    let chat = message.chat().id;
    let message_id = message.id();

    match dispatcher.navigate(action.id, action.index).await {
        Ok(page) => {
            let target = PageTarget::Edit {
                chat,
                message: message_id,
            };
            deliver_page(&bot, target, &page, settings.rich_text).await?;
        }
        Err(NavigationError::Expired(id)) => {
            info!(%id, "Navigation on expired report");
            edit_message_resilient(&bot, chat, message_id, EXPIRED_TEXT, None, None).await?;
        }
    }

    Ok(())
}
