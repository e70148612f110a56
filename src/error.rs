use thiserror::Error;

/// Failures while obtaining a quote. None of these are fatal: the race shows
/// the message and offers a retry.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("quote request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("quote service answered with status {0}")]
    Status(u16),

    #[error("could not read quote response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("quote service returned no words")]
    Empty,

    #[error("no API key set (export {0})")]
    MissingApiKey(&'static str),
}
