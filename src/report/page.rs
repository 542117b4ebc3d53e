//! Styled text intermediate representation of a report page.
//!
//! Both renderings are derived from the same spans: the HTML one escapes the
//! text and wraps styled spans in Telegram-supported tags, the plain one
//! emits the bare text. Lengths are counted in characters of the HTML
//! rendering because that is what the chat API limits.

use html_escape::encode_text;

/// Visual style of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Unstyled text
    Plain,
    /// `<b>` in HTML
    Bold,
    /// `<i>` in HTML
    Italic,
}

impl Style {
    const fn tags(self) -> (&'static str, &'static str) {
        match self {
            Self::Plain => ("", ""),
            Self::Bold => ("<b>", "</b>"),
            Self::Italic => ("<i>", "</i>"),
        }
    }

    const fn tag_overhead(self) -> usize {
        let (open, close) = self.tags();
        open.len() + close.len()
    }
}

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Style applied to the whole run
    pub style: Style,
    /// Unescaped text
    pub text: String,
}

/// Which renderer to use when delivering a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Telegram HTML parse mode
    Html,
    /// No markup at all
    Plain,
}

/// One unit of paginated output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPage {
    spans: Vec<Span>,
}

fn escaped_char_len(c: char) -> usize {
    match c {
        '&' => "&amp;".len(),
        '<' => "&lt;".len(),
        '>' => "&gt;".len(),
        _ => 1,
    }
}

fn escaped_len(text: &str) -> usize {
    text.chars().map(escaped_char_len).sum()
}

impl ReportPage {
    /// Creates an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends text, merging it into the previous span when the style matches.
    pub fn push(&mut self, style: Style, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(&text),
            _ => self.spans.push(Span { style, text }),
        }
        self
    }

    /// Appends unstyled text
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Style::Plain, text)
    }

    /// Appends bold text
    pub fn bold(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Style::Bold, text)
    }

    /// Appends italic text
    pub fn italic(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Style::Italic, text)
    }

    /// Ends the current line
    pub fn newline(&mut self) -> &mut Self {
        self.plain("\n")
    }

    /// Renders the page with the requested renderer
    #[must_use]
    pub fn render(&self, mode: RenderMode) -> String {
        match mode {
            RenderMode::Html => self.render_html(),
            RenderMode::Plain => self.render_plain(),
        }
    }

    /// Telegram HTML rendering
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            let (open, close) = span.style.tags();
            out.push_str(open);
            out.push_str(&encode_text(&span.text));
            out.push_str(close);
        }
        out
    }

    /// Markup-free rendering
    #[must_use]
    pub fn render_plain(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// Length of the HTML rendering in characters
    #[must_use]
    pub fn html_len(&self) -> usize {
        self.spans
            .iter()
            .map(|span| span.style.tag_overhead() + escaped_len(&span.text))
            .sum()
    }

    /// Cuts the page so that its HTML rendering is at most `budget` characters.
    ///
    /// Entities are never split and every kept styled span keeps both tags.
    pub fn truncate_html(&mut self, budget: usize) {
        let mut used = 0;
        let mut kept = Vec::with_capacity(self.spans.len());

        for span in std::mem::take(&mut self.spans) {
            let overhead = span.style.tag_overhead();
            let full = overhead + escaped_len(&span.text);
            if used + full <= budget {
                used += full;
                kept.push(span);
                continue;
            }

            let room = budget.saturating_sub(used + overhead);
            let mut text = String::new();
            let mut len = 0;
            for c in span.text.chars() {
                let char_len = escaped_char_len(c);
                if len + char_len > room {
                    break;
                }
                len += char_len;
                text.push(c);
            }
            if !text.is_empty() {
                kept.push(Span {
                    style: span.style,
                    text,
                });
            }
            break;
        }

        self.spans = kept;
    }

    /// Drops trailing whitespace, including blank lines.
    pub fn trim_end(&mut self) {
        while let Some(last) = self.spans.last_mut() {
            let trimmed_len = last.text.trim_end().len();
            last.text.truncate(trimmed_len);
            if last.text.is_empty() {
                self.spans.pop();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReportPage {
        let mut page = ReportPage::new();
        page.bold("Title").newline().plain("a < b & c").newline().italic("note");
        page
    }

    #[test]
    fn test_renderers_share_content() {
        let page = sample();
        assert_eq!(
            page.render_html(),
            "<b>Title</b>\na &lt; b &amp; c\n<i>note</i>"
        );
        assert_eq!(page.render_plain(), "Title\na < b & c\nnote");
        assert_eq!(page.render(RenderMode::Plain), page.render_plain());
    }

    #[test]
    fn test_html_len_matches_rendering() {
        let page = sample();
        assert_eq!(page.html_len(), page.render_html().chars().count());
    }

    #[test]
    fn test_push_merges_same_style() {
        let mut page = ReportPage::new();
        page.plain("a").plain("b").bold("c").plain("");
        assert_eq!(page.spans.len(), 2);
        assert_eq!(page.spans[0].text, "ab");
    }

    #[test]
    fn test_truncate_keeps_tags_balanced() {
        let mut page = sample();
        // "<b>Title</b>" is 12 characters, leave room for part of the next span only
        page.truncate_html(16);
        let html = page.render_html();
        assert_eq!(html, "<b>Title</b>\na ");
        assert!(html.chars().count() <= 16);
    }

    #[test]
    fn test_truncate_never_splits_entities() {
        let mut page = ReportPage::new();
        page.plain("&&&&");
        page.truncate_html(7);
        assert_eq!(page.render_html(), "&amp;");
    }

    #[test]
    fn test_truncate_drops_styled_span_without_room() {
        let mut page = ReportPage::new();
        page.plain("abc").bold("def");
        page.truncate_html(9);
        assert_eq!(page.render_html(), "abc");
    }

    #[test]
    fn test_trim_end_removes_blank_lines() {
        let mut page = ReportPage::new();
        page.bold("Header").newline().newline();
        page.trim_end();
        assert_eq!(page.render_html(), "<b>Header</b>");
    }
}
