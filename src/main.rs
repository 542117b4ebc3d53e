#![allow(clippy::non_std_lazy_statics)]

use dotenvy::dotenv;
use lazy_regex::{lazy_regex, Lazy};
use osint_lookup_bot::bot;
use osint_lookup_bot::config::Settings;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Telegram bot URL path: `https://api.telegram.org/bot<token>/`
static RE_BOT_URL: Lazy<Regex> = lazy_regex!(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)");
/// Bare Telegram bot token
static RE_BOT_TOKEN: Lazy<Regex> = lazy_regex!(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})");
/// `"token": "..."` inside a logged JSON body
static RE_JSON_TOKEN: Lazy<Regex> = lazy_regex!(r#""token"\s*:\s*"[^"]*""#);

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    api_token: Option<Regex>,
}

impl RedactionPatterns {
    /// Builds the patterns; the API credential is masked verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the escaped credential does not compile.
    fn new(api_token: &str) -> Result<Self, regex::Error> {
        let api_token = if api_token.trim().is_empty() {
            None
        } else {
            Some(Regex::new(&regex::escape(api_token))?)
        };
        Ok(Self { api_token })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = RE_BOT_URL
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = RE_BOT_TOKEN
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = RE_JSON_TOKEN
            .replace_all(&output, r#""token": "[MASKED]""#)
            .to_string();
        if let Some(api_token) = &self.api_token {
            output = api_token.replace_all(&output, "[API_TOKEN]").to_string();
        }
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer was consumed in full even if the redacted
        // text differs in length.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Settings come first: the redaction patterns need the API credential
    let settings = Settings::new();
    let api_token = settings
        .as_ref()
        .map(|s| s.leakosint_api_token.clone())
        .unwrap_or_default();

    let patterns = Arc::new(RedactionPatterns::new(&api_token).map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Leakosint Telegram Bot...");

    let settings = match settings {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if settings.leakosint_api_token.trim().is_empty() {
        error!("LEAKOSINT_API_TOKEN is not set; every search will be rejected by the API.");
    }
    if settings.allowed_users().is_empty() {
        info!("ALLOWED_USERS is empty, the bot is open to everybody.");
    }

    if let Err(e) = bot::run_bot(settings).await {
        error!("Bot stopped with error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}
