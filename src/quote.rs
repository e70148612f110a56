use std::time::Duration;

use itertools::Itertools;
use serde::Deserialize;

use crate::config::Config;
use crate::error::QuoteError;

/// Environment variable holding the API Ninjas credential.
pub const API_KEY_ENV: &str = "API_NINJAS_KEY";

/// The words the player has to type, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    words: Vec<String>,
    author: Option<String>,
}

impl Quote {
    /// Splits on single spaces. Runs of spaces would otherwise yield empty
    /// words that can never be shown to the player, so those are dropped.
    pub fn from_text(text: &str) -> Self {
        Self {
            words: text
                .split(' ')
                .filter(|w| !w.is_empty())
                .map(str::to_owned)
                .collect(),
            author: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        let author = author.into();
        self.author = (!author.trim().is_empty()).then_some(author);
        self
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn text(&self) -> String {
        self.words.iter().join(" ")
    }
}

/// Source of quotes. Implementations block; callers run them off the UI thread.
pub trait QuoteProvider: Send + Sync + 'static {
    fn fetch_quote(&self, category: &str) -> Result<Quote, QuoteError>;
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    quote: String,
    #[serde(default)]
    author: String,
}

/// Parses an API Ninjas `/v1/quotes` body: a JSON array whose first entry is used.
pub fn parse_quote_response(body: &str) -> Result<Quote, QuoteError> {
    let entries: Vec<QuoteEntry> = serde_json::from_str(body)?;
    let entry = entries.into_iter().next().ok_or(QuoteError::Empty)?;

    let quote = Quote::from_text(&entry.quote).with_author(entry.author);
    if quote.is_empty() {
        return Err(QuoteError::Empty);
    }

    Ok(quote)
}

/// Fetches quotes over HTTP from API Ninjas.
#[derive(Debug, Clone)]
pub struct ApiNinjasProvider {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: Option<String>,
}

impl ApiNinjasProvider {
    pub fn new(config: &Config, api_key: Option<String>) -> Result<Self, QuoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Reads the credential from the environment.
    pub fn from_env(config: &Config) -> Result<Self, QuoteError> {
        Self::new(config, std::env::var(API_KEY_ENV).ok())
    }
}

impl QuoteProvider for ApiNinjasProvider {
    fn fetch_quote(&self, category: &str) -> Result<Quote, QuoteError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(QuoteError::MissingApiKey(API_KEY_ENV))?;

        let mut request = self.client.get(&self.api_url).header("X-Api-Key", key);
        if !category.is_empty() {
            request = request.query(&[("category", category)]);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        parse_quote_response(&response.text()?)
    }
}

/// Always serves the same text; backs the `--prompt` flag.
#[derive(Debug, Clone)]
pub struct StaticQuoteProvider {
    text: String,
}

impl StaticQuoteProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl QuoteProvider for StaticQuoteProvider {
    fn fetch_quote(&self, _category: &str) -> Result<Quote, QuoteError> {
        let quote = Quote::from_text(&self.text);
        if quote.is_empty() {
            Err(QuoteError::Empty)
        } else {
            Ok(quote)
        }
    }
}
