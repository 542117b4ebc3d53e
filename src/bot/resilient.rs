//! Resilient delivery of report pages with automatic retry.
//!
//! Transient network failures are retried with exponential backoff and
//! jitter. A page whose HTML markup Telegram refuses is delivered again
//! through the plain renderer.

use crate::bot::views::navigation_keyboard;
use crate::dispatcher::DisplayPage;
use crate::report::RenderMode;
use crate::utils::retry_telegram_operation_if;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardMarkup, Message, MessageId, ParseMode, ReplyParameters,
};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

/// Fragment of Telegram's description for rejected markup
const ERROR_CANT_PARSE: &str = "can't parse entities";

/// Where a page is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTarget {
    /// New message in `chat`, replying to `reply_to`
    Reply {
        /// Destination chat
        chat: ChatId,
        /// Message the page answers
        reply_to: MessageId,
    },
    /// In-place edit of an existing message
    Edit {
        /// Chat holding the message
        chat: ChatId,
        /// Message to replace
        message: MessageId,
    },
}

/// Errors worth another attempt
const fn is_transient(e: &RequestError) -> bool {
    matches!(
        e,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    )
}

/// Whether Telegram refused the message because of its markup
#[must_use]
pub fn is_markup_rejection(e: &RequestError) -> bool {
    match e {
        RequestError::Api(ApiError::CantParseEntities(_)) => true,
        RequestError::Api(api) => api.to_string().to_lowercase().contains(ERROR_CANT_PARSE),
        _ => false,
    }
}

/// Whether an edit was refused because nothing changed
const fn is_not_modified(e: &RequestError) -> bool {
    matches!(e, RequestError::Api(ApiError::MessageNotModified))
}

/// Send a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-transient error.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    parse_mode: Option<ParseMode>,
) -> Result<Message, RequestError> {
    let text = text.into();
    retry_telegram_operation_if(
        || async {
            let mut req = bot.send_message(chat_id, text.clone());
            if let Some(pm) = parse_mode {
                req = req.parse_mode(pm);
            }
            req.await
        },
        is_transient,
    )
    .await
}

/// Reply to a message with automatic retry on network failures.
///
/// # Errors
///
/// Same as [`send_message_resilient`].
pub async fn reply_resilient(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: MessageId,
    text: impl Into<String>,
    parse_mode: Option<ParseMode>,
) -> Result<Message, RequestError> {
    let text = text.into();
    retry_telegram_operation_if(
        || async {
            let mut req = bot
                .send_message(chat_id, text.clone())
                .reply_parameters(ReplyParameters::new(reply_to));
            if let Some(pm) = parse_mode {
                req = req.parse_mode(pm);
            }
            req.await
        },
        is_transient,
    )
    .await
}

/// Edit a message's text with automatic retry on network failures.
///
/// # Errors
///
/// Same as [`send_message_resilient`].
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
    parse_mode: Option<ParseMode>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<(), RequestError> {
    let text = text.into();
    retry_telegram_operation_if(
        || async {
            let mut req = bot.edit_message_text(chat_id, msg_id, text.clone());
            if let Some(pm) = parse_mode {
                req = req.parse_mode(pm);
            }
            if let Some(kb) = keyboard.clone() {
                req = req.reply_markup(kb);
            }
            req.await.map(|_| ())
        },
        is_transient,
    )
    .await
}

/// Delete a message, ignoring failures. Returns whether it was deleted.
pub async fn delete_message_quietly(bot: &Bot, chat_id: ChatId, msg_id: MessageId) -> bool {
    match retry_telegram_operation_if(
        || async { bot.delete_message(chat_id, msg_id).await },
        is_transient,
    )
    .await
    {
        Ok(_) => true,
        Err(e) => {
            debug!("Failed to delete message {}: {e}", msg_id.0);
            false
        }
    }
}

/// Answers a callback query without text, logging a failure instead of
/// returning it.
///
/// Returns `true` if Telegram accepted the answer.
pub async fn answer_callback_quietly(bot: &Bot, q: &CallbackQuery) -> bool {
    match bot.answer_callback_query(q.id.clone()).await {
        Ok(_) => true,
        Err(e) => {
            debug!("Failed to answer callback query {:?}: {e}", q.id);
            false
        }
    }
}

async fn deliver_rendered(
    bot: &Bot,
    target: PageTarget,
    text: String,
    mode: RenderMode,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<(), RequestError> {
    let parse_mode = match mode {
        RenderMode::Html => Some(ParseMode::Html),
        RenderMode::Plain => None,
    };

    match target {
        PageTarget::Reply { chat, reply_to } => {
            retry_telegram_operation_if(
                || async {
                    let mut req = bot
                        .send_message(chat, text.clone())
                        .reply_parameters(ReplyParameters::new(reply_to));
                    if let Some(pm) = parse_mode {
                        req = req.parse_mode(pm);
                    }
                    if let Some(kb) = keyboard.clone() {
                        req = req.reply_markup(kb);
                    }
                    req.await.map(|_| ())
                },
                is_transient,
            )
            .await
        }
        PageTarget::Edit { chat, message } => {
            edit_message_resilient(bot, chat, message, text, parse_mode, keyboard).await
        }
    }
}

/// Text and keyboard of a page in one render mode
#[derive(Debug, Clone, PartialEq)]
struct RenderedPage {
    text: String,
    mode: RenderMode,
    keyboard: Option<InlineKeyboardMarkup>,
}

impl RenderedPage {
    fn new(page: &DisplayPage, mode: RenderMode) -> Self {
        Self {
            text: page.page.render(mode),
            mode,
            keyboard: page.control.as_ref().map(navigation_keyboard),
        }
    }
}

/// Renderer selected by the rich-text capability
const fn initial_mode(rich: bool) -> RenderMode {
    if rich {
        RenderMode::Html
    } else {
        RenderMode::Plain
    }
}

/// Renderer to retry with after `err`, if any
fn fallback_mode(mode: RenderMode, err: &RequestError) -> Option<RenderMode> {
    (mode == RenderMode::Html && is_markup_rejection(err)).then_some(RenderMode::Plain)
}

/// An edit refused because nothing changed counts as delivered
fn settle(result: Result<(), RequestError>) -> Result<(), RequestError> {
    match result {
        Err(e) if is_not_modified(&e) => {
            debug!("Page unchanged, edit skipped");
            Ok(())
        }
        other => other,
    }
}

/// Delivers a page with its navigation keyboard.
///
/// With `rich` set the page goes out as HTML first; if Telegram rejects
/// the markup, the plain rendering is delivered instead. An edit that
/// changes nothing counts as delivered.
///
/// # Errors
///
/// Returns the Telegram error if the page could not be delivered at all.
pub async fn deliver_page(
    bot: &Bot,
    target: PageTarget,
    page: &DisplayPage,
    rich: bool,
) -> Result<(), RequestError> {
    let first = RenderedPage::new(page, initial_mode(rich));
    let result = match deliver_rendered(
        bot,
        target,
        first.text.clone(),
        first.mode,
        first.keyboard.clone(),
    )
    .await
    {
        Err(e) => match fallback_mode(first.mode, &e) {
            Some(mode) => {
                warn!(id = %page.id, index = page.index, "HTML rejected, falling back to plain text: {e}");
                let retry = RenderedPage::new(page, mode);
                deliver_rendered(bot, target, retry.text, retry.mode, retry.keyboard).await
            }
            None => Err(e),
        },
        Ok(()) => Ok(()),
    };

    settle(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{NavigationControl, QueryId, ReportPage};

    fn display_page(total: usize) -> DisplayPage {
        let id = QueryId::new(12_345_678);
        let mut page = ReportPage::new();
        page.bold("📊 DB <1>").newline().plain("a & b");
        DisplayPage {
            id,
            index: 0,
            total,
            page,
            control: NavigationControl::build(id, 0, total),
        }
    }

    #[test]
    fn test_capability_selects_renderer() {
        assert_eq!(initial_mode(true), RenderMode::Html);
        assert_eq!(initial_mode(false), RenderMode::Plain);
    }

    #[test]
    fn test_rejected_html_falls_back_to_plain() {
        let rejected = RequestError::Api(ApiError::CantParseEntities(
            "Bad Request: can't parse entities".to_string(),
        ));
        assert_eq!(
            fallback_mode(RenderMode::Html, &rejected),
            Some(RenderMode::Plain)
        );
        // Plain text has nothing left to strip
        assert_eq!(fallback_mode(RenderMode::Plain, &rejected), None);
        assert_eq!(
            fallback_mode(RenderMode::Html, &RequestError::Api(ApiError::BotBlocked)),
            None
        );
    }

    #[test]
    fn test_fallback_renders_same_page_with_same_keyboard() {
        let page = display_page(3);
        let rich = RenderedPage::new(&page, RenderMode::Html);
        let plain = RenderedPage::new(&page, RenderMode::Plain);

        assert_eq!(rich.text, "<b>📊 DB &lt;1&gt;</b>\na &amp; b");
        assert_eq!(plain.text, page.page.render(RenderMode::Plain));
        assert_eq!(plain.text, "📊 DB <1>\na & b");
        assert!(plain.keyboard.is_some());
        assert_eq!(plain.keyboard, rich.keyboard);
    }

    #[test]
    fn test_single_page_has_no_keyboard() {
        let page = display_page(1);
        assert!(RenderedPage::new(&page, RenderMode::Html).keyboard.is_none());
    }

    #[test]
    fn test_unchanged_edit_counts_as_delivered() {
        assert!(settle(Err(RequestError::Api(ApiError::MessageNotModified))).is_ok());
        assert!(settle(Ok(())).is_ok());
        assert!(settle(Err(RequestError::Api(ApiError::BotBlocked))).is_err());
    }

    #[test]
    fn test_markup_rejection_detection() {
        assert!(is_markup_rejection(&RequestError::Api(
            ApiError::CantParseEntities("Bad Request: can't parse entities".to_string())
        )));
        assert!(is_markup_rejection(&RequestError::Api(ApiError::Unknown(
            "Bad Request: can't parse entities: Unsupported start tag \"x\"".to_string()
        ))));
        assert!(!is_markup_rejection(&RequestError::Api(
            ApiError::MessageNotModified
        )));
        assert!(!is_markup_rejection(&RequestError::Api(ApiError::BotBlocked)));
    }

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(!is_transient(&RequestError::Api(ApiError::BotBlocked)));
        assert!(!is_transient(&RequestError::Api(
            ApiError::CantParseEntities(String::new())
        )));
        assert!(is_transient(&RequestError::Io(std::sync::Arc::new(
            std::io::Error::other("reset")
        ))));
    }

    #[tokio::test]
    async fn test_failed_callback_answer_is_swallowed() {
        let api_url = reqwest::Url::parse("http://127.0.0.1:9/").expect("valid url");
        let bot = Bot::new("123456789:TEST").set_api_url(api_url);
        let q: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "4382bfdwdsb323b2d9",
            "from": {"id": 42, "is_bot": false, "first_name": "Alice"},
            "chat_instance": "-1234567890",
            "data": "page_info"
        }))
        .expect("callback query json");

        assert!(!answer_callback_quietly(&bot, &q).await);
    }

    #[test]
    fn test_not_modified_detection() {
        assert!(is_not_modified(&RequestError::Api(
            ApiError::MessageNotModified
        )));
        assert!(!is_not_modified(&RequestError::Api(ApiError::BotBlocked)));
    }
}
