// =============================================================================
// Quote Fetcher — periodic and on-demand fetch cycles
// =============================================================================
//
// A fetch cycle:
//   1. Snapshots the tracked symbol list.
//   2. Requests every symbol concurrently (one request per symbol).
//   3. Merges the successful quotes into the price cache in one step.
//   4. Broadcasts the full cache as `price_update`, even when some or all
//      symbols failed.
//   5. Runs the alert evaluator and spawns one delivery per triggered alert.
//
// Cycles are not mutually exclusive: an add-symbol command can start one
// while the periodic cycle is still in flight.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::error::RelayError;
use crate::types::ServerEvent;

/// Outcome of one fetch cycle.
#[derive(Debug)]
pub struct FetchCycleReport {
    pub cycle: u64,
    /// Canonical symbols written into the cache.
    pub updated: Vec<String>,
    /// Requested symbols whose fetch failed.
    pub failed: Vec<String>,
    /// One delivery task per alert that fired in this cycle.
    pub deliveries: Vec<JoinHandle<Result<(), RelayError>>>,
}

/// Run one complete fetch cycle against the shared state.
pub async fn run_fetch_cycle(state: &AppState) -> FetchCycleReport {
    let cycle = state.next_cycle();
    let symbols = state.symbols();
    info!(cycle, count = symbols.len(), "fetching latest prices");

    let results = join_all(symbols.iter().map(|symbol| async move {
        (symbol, state.quote_source.fetch_quote(symbol).await)
    }))
    .await;

    let mut quotes = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (symbol, result) in results {
        match result {
            Ok(quote) => quotes.push(quote),
            Err(e) => {
                warn!(cycle, symbol = %symbol, error = %e, "quote fetch failed — skipping symbol");
                failed.push(symbol.clone());
            }
        }
    }

    let updated: Vec<String> = quotes.iter().map(|q| q.symbol.clone()).collect();
    let prices = state.merge_prices(quotes);
    state.broadcast(ServerEvent::PriceUpdate(prices));

    let deliveries: Vec<_> = state
        .evaluate_alerts()
        .into_iter()
        .map(|triggered| state.notifier.notify(triggered))
        .collect();

    info!(
        cycle,
        updated = updated.len(),
        failed = failed.len(),
        alerts_fired = deliveries.len(),
        "fetch cycle complete"
    );

    FetchCycleReport {
        cycle,
        updated,
        failed,
        deliveries,
    }
}

/// Start an out-of-band fetch cycle without waiting for it.
pub fn spawn_fetch_cycle(state: Arc<AppState>) -> JoinHandle<FetchCycleReport> {
    tokio::spawn(async move { run_fetch_cycle(&state).await })
}

/// Start a fetch cycle immediately and then once every `period`, forever.
///
/// Each tick spawns its own cycle, so a request that never completes stalls
/// only the cycle it belongs to.
pub async fn run_poll_loop(state: Arc<AppState>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        spawn_fetch_cycle(state.clone());
        debug!("scheduled fetch cycle started");
    }
}
