// =============================================================================
// Central Application State — ETF Snapshot
// =============================================================================
//
// The single owner of everything the service keeps in memory: the tracked
// symbol list, the price cache and the pending alerts. The fetch loop, the
// alert evaluator and every WebSocket connection hold an `Arc<AppState>`;
// nothing is reachable as a global.
//
// Thread safety:
//   - parking_lot::RwLock around each collection. Guards are never held
//     across an `.await`.
//   - A tokio broadcast channel fans server events out to all connections.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::alerts::{AlertBook, TriggeredAlert};
use crate::notifier::Notifier;
use crate::quotes::{Quote, QuoteSource};
use crate::types::{Alert, InitialData, PriceMap, ServerEvent};

/// Capacity of the broadcast channel. A connection that falls further behind
/// than this skips the missed events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of an add-symbol request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddSymbol {
    /// Newly tracked; carries the normalised symbol and the full list.
    Added { symbol: String, symbols: Vec<String> },
    AlreadyTracked(String),
    Empty,
}

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Tracked data ────────────────────────────────────────────────────
    tracked_symbols: RwLock<Vec<String>>,
    prices: RwLock<PriceMap>,
    alerts: RwLock<AlertBook>,

    // ── Fan-out ─────────────────────────────────────────────────────────
    events: broadcast::Sender<ServerEvent>,

    // ── Providers ───────────────────────────────────────────────────────
    pub quote_source: Arc<dyn QuoteSource>,
    pub notifier: Notifier,

    // ── Bookkeeping ─────────────────────────────────────────────────────
    fetch_cycles: AtomicU64,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        symbols: Vec<String>,
        quote_source: Arc<dyn QuoteSource>,
        notifier: Notifier,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = Self {
            tracked_symbols: RwLock::new(Vec::new()),
            prices: RwLock::new(PriceMap::new()),
            alerts: RwLock::new(AlertBook::new()),
            events,
            quote_source,
            notifier,
            fetch_cycles: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        };
        for symbol in symbols {
            let _ = state.add_symbol(&symbol);
        }
        state
    }

    // ── Symbols ─────────────────────────────────────────────────────────

    pub fn symbols(&self) -> Vec<String> {
        self.tracked_symbols.read().clone()
    }

    /// Uppercase `raw` and append it unless it is blank or already tracked.
    pub fn add_symbol(&self, raw: &str) -> AddSymbol {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return AddSymbol::Empty;
        }

        let mut tracked = self.tracked_symbols.write();
        if tracked.contains(&symbol) {
            return AddSymbol::AlreadyTracked(symbol);
        }
        tracked.push(symbol.clone());
        info!(symbol = %symbol, count = tracked.len(), "symbol added to tracked set");

        AddSymbol::Added {
            symbol,
            symbols: tracked.clone(),
        }
    }

    // ── Prices ──────────────────────────────────────────────────────────

    pub fn prices(&self) -> PriceMap {
        self.prices.read().clone()
    }

    /// Write fresh quotes into the cache and return the whole cache.
    pub fn merge_prices(&self, quotes: impl IntoIterator<Item = Quote>) -> PriceMap {
        let mut prices = self.prices.write();
        for quote in quotes {
            prices.insert(quote.symbol, quote.price);
        }
        prices.clone()
    }

    // ── Alerts ──────────────────────────────────────────────────────────

    pub fn push_alert(&self, alert: Alert) {
        self.alerts.write().push(alert);
    }

    pub fn pending_alerts(&self) -> Vec<Alert> {
        self.alerts.read().pending().to_vec()
    }

    /// One evaluation pass of the alert book against the current cache.
    pub fn evaluate_alerts(&self) -> Vec<TriggeredAlert> {
        let mut book = self.alerts.write();
        if book.is_empty() {
            return Vec::new();
        }
        book.evaluate(&self.prices())
    }

    // ── Events ──────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Send `event` to every connected client.
    pub fn broadcast(&self, event: ServerEvent) {
        match self.events.send(event) {
            Ok(receivers) => debug!(receivers, "event broadcast"),
            Err(_) => debug!("event dropped: no connected clients"),
        }
    }

    // ── Fetch cycles ────────────────────────────────────────────────────

    /// Allocate the next fetch-cycle number (starting at 1).
    pub fn next_cycle(&self) -> u64 {
        self.fetch_cycles.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn fetch_cycle_count(&self) -> u64 {
        self.fetch_cycles.load(Ordering::SeqCst)
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    pub fn initial_data(&self) -> InitialData {
        InitialData {
            symbols: self.symbols(),
            prices: self.prices(),
        }
    }

    /// Serialisable view of the whole state for the REST endpoint.
    pub fn build_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            symbols: self.symbols(),
            prices: self.prices(),
            pending_alerts: self.alerts.read().len(),
            fetch_cycles: self.fetch_cycle_count(),
            uptime_s: self.start_time.elapsed().as_secs(),
            server_time: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub symbols: Vec<String>,
    pub prices: PriceMap,
    pub pending_alerts: usize,
    pub fetch_cycles: u64,
    pub uptime_s: u64,
    pub server_time: i64,
}
