//! WebSocket endpoint for print jobs.
//!
//! Each text frame from the client is one print request. Requests on a
//! connection run one at a time, and every status event of the running job
//! is forwarded to the client as a JSON frame.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use proxysheet_core::{CardRequest, PrintJobRequest, PrintJobRunner, StatusEvent};

use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_RECEIVED, WS_MESSAGES_SENT,
};
use crate::state::AppState;

/// Capacity of the per-connection event channel.
const EVENT_BUFFER_SIZE: usize = 64;

/// Message sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Print the given cards, optionally split into files of `split` pages.
    Print {
        cards: Vec<CardRequest>,
        #[serde(default)]
        split: Option<usize>,
    },
}

/// Message sent to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Progress {
        message: String,
    },
    /// A finished PDF, base64 encoded.
    Success {
        data: String,
        part: Option<usize>,
    },
    Failed {
        message: String,
    },
}

impl ServerMessage {
    fn type_label(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
        }
    }
}

impl From<StatusEvent> for ServerMessage {
    fn from(event: StatusEvent) -> Self {
        match event {
            StatusEvent::Progress { message } => Self::Progress { message },
            StatusEvent::Success { pdf, part } => Self::Success {
                data: STANDARD.encode(pdf),
                part,
            },
            StatusEvent::Failed { message } => Self::Failed { message },
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (event_tx, mut event_rx) = mpsc::channel::<StatusEvent>(EVENT_BUFFER_SIZE);
    let mut runner = state.create_runner();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("Print client connected");

    // Forward job events to the client. Events are drained even after the
    // client went away so a running job never blocks on a full channel.
    let send_task = tokio::spawn(async move {
        let mut connected = true;
        while let Some(event) = event_rx.recv().await {
            if !connected {
                continue;
            }
            let msg = ServerMessage::from(event);
            WS_MESSAGES_SENT.with_label_values(&[msg.type_label()]).inc();

            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        connected = false;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize ServerMessage: {}", e);
                }
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_text(&mut runner, text.as_str(), &event_tx).await;
            }
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(_) => {
                // Pings are answered by axum; binary frames are not part of the protocol
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    drop(event_tx);
    if let Err(e) = send_task.await {
        error!("WebSocket send task failed: {}", e);
    }
    WS_CONNECTIONS_ACTIVE.dec();
    info!("Print client disconnected");
}

/// Handle one text frame, running the print job it carries to completion.
///
/// Malformed frames are answered with a `failed` message. Requests the
/// runner rejects get a `failed` message too, except an empty card list,
/// which is silently ignored.
pub async fn handle_text(
    runner: &mut PrintJobRunner,
    text: &str,
    events: &mpsc::Sender<StatusEvent>,
) {
    let request = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Print { cards, split }) => {
            WS_MESSAGES_RECEIVED.with_label_values(&["accepted"]).inc();
            PrintJobRequest { cards, split }
        }
        Err(e) => {
            WS_MESSAGES_RECEIVED.with_label_values(&["malformed"]).inc();
            debug!(error = %e, "Malformed print message");
            let _ = events
                .send(StatusEvent::failed(format!("Error: malformed request: {}", e)))
                .await;
            return;
        }
    };

    match runner.run(&request, events).await {
        Ok(summary) => {
            debug!(job_id = %summary.job_id, parts = summary.parts, "Print request finished");
        }
        Err(e) if !e.was_reported() && !request.cards.is_empty() => {
            let _ = events.send(StatusEvent::failed(format!("Error: {}", e))).await;
        }
        Err(_) => {}
    }
}
