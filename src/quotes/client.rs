// =============================================================================
// Alpha Vantage REST Client — GLOBAL_QUOTE lookups
// =============================================================================
//
// One GET per symbol:
//   {base}/query?function=GLOBAL_QUOTE&symbol=<S>&apikey=<K>
//
// The provider answers HTTP 200 for most failures and puts the reason in the
// body ("Note", "Information" or "Error Message"), so the body is always
// decoded and inspected. Any deviation from the expected shape is a failure
// for that symbol only.
// =============================================================================

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::QuoteApiConfig;
use crate::error::QuoteError;

/// A price for one symbol, as stored in the price cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Canonical symbol as reported by the provider.
    pub symbol: String,
    /// Price rounded to two decimals.
    pub price: String,
}

/// Anything that can produce a current quote for a symbol.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

// -----------------------------------------------------------------------------
// Wire format
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}

/// Decode a GLOBAL_QUOTE response body into a cache-ready [`Quote`].
pub fn parse_global_quote(body: &str) -> Result<Quote, QuoteError> {
    let resp: GlobalQuoteResponse = serde_json::from_str(body)?;

    let Some(quote) = resp.global_quote else {
        return Err(match resp.error_message.or(resp.note).or(resp.information) {
            Some(notice) => QuoteError::ProviderNotice(notice),
            None => QuoteError::MissingQuote,
        });
    };

    let symbol = quote
        .symbol
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(QuoteError::MissingField("01. symbol"))?;
    let raw_price = quote.price.ok_or(QuoteError::MissingField("05. price"))?;

    let price: f64 = raw_price
        .trim()
        .parse()
        .map_err(|_| QuoteError::InvalidPrice(raw_price.clone()))?;
    if !price.is_finite() {
        return Err(QuoteError::InvalidPrice(raw_price));
    }

    Ok(Quote {
        symbol,
        price: format!("{price:.2}"),
    })
}

// -----------------------------------------------------------------------------
// Client
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    pub fn new(config: &QuoteApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build quote HTTP client")?;

        debug!(base_url = %config.base_url, "AlphaVantageClient initialised");

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageClient {
    #[instrument(skip(self), name = "alphavantage::global_quote")]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let url = format!("{}/query", self.base_url);

        let body = self
            .client
            .get(&url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let quote = parse_global_quote(&body)?;
        debug!(symbol = %quote.symbol, price = %quote.price, "quote received");
        Ok(quote)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_rounds_price() {
        let body = r#"{
            "Global Quote": {
                "01. symbol": "SPY",
                "02. open": "498.1000",
                "05. price": "500.4567",
                "07. latest trading day": "2024-05-17"
            }
        }"#;
        let quote = parse_global_quote(body).unwrap();
        assert_eq!(quote.symbol, "SPY");
        assert_eq!(quote.price, "500.46");
    }

    #[test]
    fn whole_number_price_gets_two_decimals() {
        let body = r#"{"Global Quote": {"01. symbol": "VT", "05. price": "112"}}"#;
        assert_eq!(parse_global_quote(body).unwrap().price, "112.00");
    }

    #[test]
    fn canonical_symbol_comes_from_response() {
        let body = r#"{"Global Quote": {"01. symbol": "BRK-B", "05. price": "410.1"}}"#;
        assert_eq!(parse_global_quote(body).unwrap().symbol, "BRK-B");
    }

    #[test]
    fn empty_quote_object_is_missing_symbol() {
        let err = parse_global_quote(r#"{"Global Quote": {}}"#).unwrap_err();
        assert!(matches!(err, QuoteError::MissingField("01. symbol")));
    }

    #[test]
    fn missing_price_is_an_error() {
        let err = parse_global_quote(r#"{"Global Quote": {"01. symbol": "SPY"}}"#).unwrap_err();
        assert!(matches!(err, QuoteError::MissingField("05. price")));
    }

    #[test]
    fn garbage_price_is_an_error() {
        let body = r#"{"Global Quote": {"01. symbol": "SPY", "05. price": "n/a"}}"#;
        assert!(matches!(
            parse_global_quote(body).unwrap_err(),
            QuoteError::InvalidPrice(p) if p == "n/a"
        ));
    }

    #[test]
    fn provider_notice_is_surfaced() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        match parse_global_quote(body).unwrap_err() {
            QuoteError::ProviderNotice(msg) => assert!(msg.contains("call frequency")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unrelated_object_is_missing_quote() {
        assert!(matches!(
            parse_global_quote(r#"{"foo": 1}"#).unwrap_err(),
            QuoteError::MissingQuote
        ));
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        assert!(matches!(
            parse_global_quote("<html>busy</html>").unwrap_err(),
            QuoteError::Decode(_)
        ));
    }
}
