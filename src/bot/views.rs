//! Texts and inline keyboards shown by the bot

use crate::config::Settings;
use crate::report::{NavigationControl, PAGE_INFO_CALLBACK};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

// ─────────────────────────────────────────────────────────────────────────────
// Static texts
// ─────────────────────────────────────────────────────────────────────────────

/// Transient message shown while the search is running
pub const SEARCHING_TEXT: &str = "🔎 Searching databases, please wait...";
/// Reply to stickers, photos and other non-text messages
pub const TEXT_ONLY_TEXT: &str = "⚠️ Please send a text query to search.";
/// Replaces a report whose pages are no longer cached
pub const EXPIRED_TEXT: &str = "⚠️ This search has expired. Please perform a new search.";
/// Callback answer for the page indicator button
pub const PAGE_INDICATOR_ANSWER: &str = "Page indicator";

/// Label of the "previous page" button
pub const PREVIOUS_LABEL: &str = "⬅️ Previous";
/// Label of the "next page" button
pub const NEXT_LABEL: &str = "Next ➡️";

/// Welcome and usage text for `/start` and `/help` (HTML)
pub const WELCOME_TEXT: &str = "🔍 <b>Leakosint Search Bot</b>

Welcome! I can search leaked databases using the Leakosint API.

<b>How to use:</b>
Simply send me a search query (email, name, phone number, etc.) and I'll search for it in the database.

<b>Examples:</b>
• example@gmail.com
• John Smith
• +1234567890

<b>Commands:</b>
/start - Show this message
/help - Show this message
/stats - Show API statistics

⚠️ <i>Use responsibly and only for legitimate purposes.</i>";

/// `/stats` text (HTML)
#[must_use]
pub fn stats_text(settings: &Settings, cached_reports: u64) -> String {
    format!(
        "📊 <b>Bot Statistics</b>\n\n\
         API URL: {}\n\
         Default Search Limit: {}\n\
         Language: {}\n\
         Cached Reports: {cached_reports}\n\n\
         <i>Type any search query to begin searching.</i>",
        html_escape::encode_text(&settings.leakosint_api_url),
        settings.search_limit,
        html_escape::encode_text(&settings.search_lang),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

/// One-row keyboard: previous, page indicator, next
#[must_use]
pub fn navigation_keyboard(control: &NavigationControl) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(PREVIOUS_LABEL, control.previous.callback_data()),
        InlineKeyboardButton::callback(control.indicator(), PAGE_INFO_CALLBACK),
        InlineKeyboardButton::callback(NEXT_LABEL, control.next.callback_data()),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::QueryId;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("unexpected button kind: {other:?}"),
        }
    }

    #[test]
    fn test_navigation_keyboard_layout() {
        let id = QueryId::new(12_345_678);
        let control = NavigationControl::build(id, 0, 3).expect("three pages");
        let keyboard = navigation_keyboard(&control);

        assert_eq!(keyboard.inline_keyboard.len(), 1);
        let row = &keyboard.inline_keyboard[0];
        let labels: Vec<&str> = row.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(labels, vec![PREVIOUS_LABEL, "1/3", NEXT_LABEL]);
        assert_eq!(callback(&row[0]), "/page 12345678 -1");
        assert_eq!(callback(&row[1]), "page_info");
        assert_eq!(callback(&row[2]), "/page 12345678 1");
    }

    #[test]
    fn test_stats_text_lists_settings() {
        let settings = Settings::default();
        let text = stats_text(&settings, 7);
        assert!(text.contains("Default Search Limit: 300"));
        assert!(text.contains("Language: en"));
        assert!(text.contains("Cached Reports: 7"));
    }
}
