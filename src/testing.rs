// Test doubles for the external providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::app_state::AppState;
use crate::error::{QuoteError, RelayError};
use crate::notifier::{MailRelay, Notifier, OutboundMail};
use crate::quotes::{Quote, QuoteSource};

/// Quote source backed by a mutable price table. Symbols without an entry
/// fail the way an unknown ticker does at the real provider.
#[derive(Default)]
pub struct StaticQuotes {
    prices: RwLock<HashMap<String, f64>>,
    failing: RwLock<Vec<String>>,
    calls: AtomicUsize,
}

impl StaticQuotes {
    pub fn with_prices(pairs: &[(&str, f64)]) -> Self {
        let quotes = Self::default();
        for (sym, price) in pairs {
            quotes.set_price(sym, *price);
        }
        quotes
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.write().insert(symbol.to_string(), price);
    }

    /// Make every request for `symbol` fail with a transport-style error.
    pub fn fail(&self, symbol: &str) {
        self.failing.write().push(symbol.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for StaticQuotes {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().iter().any(|s| s == symbol) {
            return Err(QuoteError::ProviderNotice(format!("connection reset for {symbol}")));
        }
        let price = self
            .prices
            .read()
            .get(symbol)
            .copied()
            .ok_or(QuoteError::MissingField("01. symbol"))?;
        Ok(Quote {
            symbol: symbol.to_string(),
            price: format!("{price:.2}"),
        })
    }
}

/// Quote source whose first request for one symbol never completes. Every
/// other request is answered by the wrapped [`StaticQuotes`].
pub struct HangingQuotes {
    inner: StaticQuotes,
    symbol: String,
    hung: AtomicBool,
}

impl HangingQuotes {
    pub fn new(inner: StaticQuotes, symbol: &str) -> Self {
        Self {
            inner,
            symbol: symbol.to_string(),
            hung: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl QuoteSource for HangingQuotes {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        if symbol == self.symbol && !self.hung.swap(true, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.inner.fetch_quote(symbol).await
    }
}

/// Mail relay that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingRelay {
    sent: RwLock<Vec<OutboundMail>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingRelay {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundMail> {
        self.sent.read().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailRelay for RecordingRelay {
    async fn send(&self, mail: &OutboundMail) -> Result<(), RelayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RelayError::Rejected {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        self.sent.write().push(mail.clone());
        Ok(())
    }
}

/// State wired to in-memory providers, tracking the default symbol set.
pub fn test_state(
    quotes: Arc<dyn QuoteSource>,
    relay: Arc<RecordingRelay>,
) -> Arc<AppState> {
    let notifier = Notifier::new(relay, "alerts@example.com");
    Arc::new(AppState::new(
        vec!["VT".into(), "SPY".into(), "QQQ".into()],
        quotes,
        notifier,
    ))
}
