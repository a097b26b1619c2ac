// =============================================================================
// Alert Evaluator — one-shot price threshold alerts
// =============================================================================
//
// Alerts live only in memory. A pass over the book marks every alert whose
// symbol has a cached price at or above its target, hands the triggered
// alerts back to the caller for delivery, and compacts them out of the live
// list before returning. Alerts for symbols with no cached price stay pending.
// =============================================================================

use tracing::{debug, info};

use crate::types::{Alert, PriceMap};

/// An alert that fired, paired with the cached price that fired it.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAlert {
    pub alert: Alert,
    pub price: String,
}

/// The live list of pending alerts.
#[derive(Debug, Default)]
pub struct AlertBook {
    alerts: Vec<Alert>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, alert: Alert) {
        debug!(symbol = %alert.symbol, target = alert.target, "alert queued");
        self.alerts.push(alert);
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn pending(&self) -> &[Alert] {
        &self.alerts
    }

    /// Run one evaluation pass against `prices`.
    pub fn evaluate(&mut self, prices: &PriceMap) -> Vec<TriggeredAlert> {
        let mut fired = Vec::new();

        for alert in self.alerts.iter_mut().filter(|a| !a.triggered) {
            let Some(cached) = prices.get(&alert.symbol) else {
                continue;
            };
            let Ok(current) = cached.parse::<f64>() else {
                continue;
            };
            if current >= alert.target {
                alert.triggered = true;
                info!(
                    symbol = %alert.symbol,
                    target = alert.target,
                    price = %cached,
                    "price alert triggered"
                );
                fired.push(TriggeredAlert {
                    alert: alert.clone(),
                    price: cached.clone(),
                });
            }
        }

        self.alerts.retain(|a| !a.triggered);
        fired
    }
}
