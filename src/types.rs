// =============================================================================
// Shared types used across the ETF Snapshot service
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ticker → last-known price formatted with two decimals.
pub type PriceMap = BTreeMap<String, String>;

/// A pending one-shot price alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Uppercase ticker.
    pub symbol: String,
    /// Fires once the cached price is at or above this value.
    pub target: f64,
    /// The target exactly as the user entered it, for display.
    pub target_text: String,
    pub email: String,
    pub triggered: bool,
}

impl Alert {
    pub fn new(symbol: &str, target: f64, email: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            target,
            target_text: target.to_string(),
            email: email.trim().to_string(),
            triggered: false,
        }
    }

    /// Replace the display form of the target with the user's own text.
    pub fn with_target_text(mut self, text: impl Into<String>) -> Self {
        self.target_text = text.into();
        self
    }
}

// =============================================================================
// Push channel protocol
// =============================================================================
//
// Every WebSocket text frame is a JSON object `{"event": NAME, "data": ...}`.
// =============================================================================

/// Full state sent once to a freshly connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialData {
    pub symbols: Vec<String>,
    pub prices: PriceMap,
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    InitialData(InitialData),
    PriceUpdate(PriceMap),
    SymbolsUpdate(Vec<String>),
    AlertConfirmation(String),
    ActionFeedback(String),
}

/// Client → server commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    AddStock(String),
    SetAlert(AlertRequest),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertRequest {
    pub symbol: String,
    pub price: PriceInput,
    pub email: String,
}

/// Target price as typed by the user; browsers send form values as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    /// The numeric target, if it is a finite number.
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

impl std::fmt::Display for PriceInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_events_use_event_and_data_keys() {
        let mut prices = PriceMap::new();
        prices.insert("SPY".into(), "500.00".into());
        let json = serde_json::to_value(ServerEvent::PriceUpdate(prices)).unwrap();
        assert_eq!(json, json!({ "event": "price_update", "data": { "SPY": "500.00" } }));

        let json = serde_json::to_value(ServerEvent::ActionFeedback("nope".into())).unwrap();
        assert_eq!(json, json!({ "event": "action_feedback", "data": "nope" }));
    }

    #[test]
    fn initial_data_carries_symbols_and_prices() {
        let event = ServerEvent::InitialData(InitialData {
            symbols: vec!["VT".into()],
            prices: PriceMap::new(),
        });
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(
            json,
            json!({ "event": "initial_data", "data": { "symbols": ["VT"], "prices": {} } })
        );
    }

    #[test]
    fn parses_add_stock_command() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"event":"add_stock","data":"vti"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::AddStock("vti".into()));
    }

    #[test]
    fn parses_set_alert_with_string_or_number_price() {
        let cmd: ClientCommand = serde_json::from_str(
            r#"{"event":"set_alert","data":{"symbol":"spy","price":"500","email":"a@b.com"}}"#,
        )
        .unwrap();
        let ClientCommand::SetAlert(req) = cmd else {
            panic!("expected set_alert");
        };
        assert_eq!(req.price.value(), Some(500.0));
        assert_eq!(req.price.to_string(), "500");

        let cmd: ClientCommand = serde_json::from_str(
            r#"{"event":"set_alert","data":{"symbol":"spy","price":412.5,"email":"a@b.com"}}"#,
        )
        .unwrap();
        let ClientCommand::SetAlert(req) = cmd else {
            panic!("expected set_alert");
        };
        assert_eq!(req.price.value(), Some(412.5));
    }

    #[test]
    fn non_numeric_price_has_no_value() {
        assert_eq!(PriceInput::Text("abc".into()).value(), None);
        assert_eq!(PriceInput::Text("".into()).value(), None);
        assert_eq!(PriceInput::Text("inf".into()).value(), None);
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientCommand>(r#"{"event":"remove_stock","data":"VT"}"#)
            .is_err());
    }

    #[test]
    fn alert_normalises_symbol_and_email() {
        let alert = Alert::new(" spy ", 500.0, " a@b.com ");
        assert_eq!(alert.symbol, "SPY");
        assert_eq!(alert.email, "a@b.com");
        assert_eq!(alert.target_text, "500");
        assert!(!alert.triggered);
    }
}
