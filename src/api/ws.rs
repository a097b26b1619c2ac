// =============================================================================
// Realtime Gateway — WebSocket push channel
// =============================================================================
//
// Clients connect to `/ws`. Every frame in either direction is a JSON text
// message `{"event": NAME, "data": ...}`.
//
// Per connection:
//   1. `initial_data` (tracked symbols + price cache) is sent to this client.
//   2. Broadcast events (`price_update`, `symbols_update`) are forwarded as
//      they are published.
//   3. Client commands (`add_stock`, `set_alert`) are applied to the shared
//      state; notices go back to the requesting client only.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::app_state::{AddSymbol, AppState};
use crate::quotes::spawn_fetch_cycle;
use crate::types::{Alert, AlertRequest, ClientCommand, ServerEvent};

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

// =============================================================================
// Connection handler
// =============================================================================

/// Manages a single WebSocket connection lifecycle.
///
/// Forwards broadcast events and processes client frames concurrently via
/// `tokio::select!` until either side goes away.
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    info!("client connected");

    // Subscribe before the initial snapshot so no broadcast falls in between.
    let mut events = state.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let initial = ServerEvent::InitialData(state.initial_data());
    if let Err(e) = send_event(&mut sender, &initial).await {
        warn!(error = %e, "failed to send initial data");
        return;
    }

    loop {
        tokio::select! {
            // ── Broadcasts ──────────────────────────────────────────────
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Err(e) = send_event(&mut sender, &event).await {
                            debug!(error = %e, "WebSocket send failed — disconnecting");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "client lagging behind broadcasts — events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // ── Client frames ───────────────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_text(&state, &text) {
                            if let Err(e) = send_event(&mut sender, &reply).await {
                                debug!(error = %e, "WebSocket send failed — disconnecting");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Binary(_))) => {
                        debug!("WebSocket binary message ignored");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                }
            }
        }
    }

    info!("client disconnected");
}

// =============================================================================
// Commands
// =============================================================================

/// Decode one client frame and apply it.
fn handle_text(state: &Arc<AppState>, text: &str) -> Option<ServerEvent> {
    match serde_json::from_str::<ClientCommand>(text) {
        Ok(cmd) => handle_command(state, cmd),
        Err(e) => {
            warn!(error = %e, frame = %text, "ignoring malformed client frame");
            None
        }
    }
}

/// Apply a client command. Returns the notice for the requesting client, if
/// any; state changes everyone should see are broadcast from here.
pub fn handle_command(state: &Arc<AppState>, cmd: ClientCommand) -> Option<ServerEvent> {
    match cmd {
        ClientCommand::AddStock(raw) => match state.add_symbol(&raw) {
            AddSymbol::Added { symbol, symbols } => {
                info!(symbol = %symbol, "tracking new symbol — fetching now");
                state.broadcast(ServerEvent::SymbolsUpdate(symbols));
                spawn_fetch_cycle(Arc::clone(state));
                None
            }
            AddSymbol::AlreadyTracked(symbol) => Some(ServerEvent::ActionFeedback(format!(
                "The symbol {symbol} is already being tracked."
            ))),
            AddSymbol::Empty => Some(ServerEvent::ActionFeedback(
                "Please enter a symbol to track.".to_string(),
            )),
        },
        ClientCommand::SetAlert(req) => Some(set_alert(state, req)),
    }
}

fn set_alert(state: &AppState, req: AlertRequest) -> ServerEvent {
    if req.symbol.trim().is_empty() || req.email.trim().is_empty() {
        return ServerEvent::ActionFeedback(
            "Please fill out all fields for the price alert.".to_string(),
        );
    }
    let Some(target) = req.price.value() else {
        return ServerEvent::ActionFeedback(format!(
            "'{}' is not a valid target price.",
            req.price
        ));
    };

    let alert =
        Alert::new(&req.symbol, target, &req.email).with_target_text(req.price.to_string());
    info!(symbol = %alert.symbol, target, email = %alert.email, "new price alert set");
    state.push_alert(alert);

    ServerEvent::AlertConfirmation(format!(
        "Alert set for {} at ${}.",
        req.symbol.trim(),
        req.price
    ))
}

// =============================================================================
// Helpers
// =============================================================================

async fn send_event<S>(sender: &mut S, event: &ServerEvent) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            // Serialisation errors are not network errors; don't disconnect.
            warn!(error = %e, "failed to serialise event");
            Ok(())
        }
    }
}
