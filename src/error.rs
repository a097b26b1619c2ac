use thiserror::Error;

/// Why a single symbol could not be refreshed during a fetch cycle.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("quote request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("quote response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("quote provider returned a notice instead of a quote: {0}")]
    ProviderNotice(String),

    #[error("quote response has no quote object")]
    MissingQuote,

    #[error("quote response is missing field '{0}'")]
    MissingField(&'static str),

    #[error("quote price '{0}' is not a finite number")]
    InvalidPrice(String),
}

/// Why the mail relay did not accept an alert email.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail relay rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
