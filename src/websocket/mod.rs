/// Realtime channel
/// One duplex websocket per client carrying JSON command frames in and
/// event frames out.
///
/// Features:
/// - Commands decoded into a typed enum, malformed frames answered with an
///   `error` event on the same connection
/// - Process output routed only to the connection that started the process
/// - Status broadcasts to every open connection through the hub

pub mod hub;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

pub use hub::{ConnectionHub, EventSink};

use crate::process::SupervisorHandle;
use crate::protocol::{parse_command, salvage_project_path, ServerEvent};
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Handles a single WebSocket connection
/// Pumps queued events out on one task while reading commands on this one
async fn handle_connection(socket: WebSocket, state: AppState) {
    let (sink, mut events) = EventSink::channel();
    let connection_id = sink.id();
    info!("New WebSocket connection {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {} event: {}", event.kind(), e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    state.hub().register(sink.clone());
    debug!("{} open connections", state.hub().connection_count());
    sink.emit(ServerEvent::Status {
        processes: state.supervisor().running().await,
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => handle_frame(text.as_str(), state.supervisor(), &sink),
            Ok(Message::Binary(_)) => {
                sink.emit(ServerEvent::error("", "Binary frames are not supported"));
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket connection {} closed", connection_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Processes this client started keep running, their output is dropped
    state.hub().unregister(connection_id);
    debug!("{} open connections", state.hub().connection_count());
    send_task.abort();
}

/// Decodes one text frame and hands it to the supervisor. Anything that
/// does not decode is answered on this connection only.
pub fn handle_frame(text: &str, supervisor: &SupervisorHandle, sink: &EventSink) {
    match parse_command(text) {
        Ok(command) => supervisor.dispatch(command, sink.clone()),
        Err(e) => {
            warn!("Rejected frame: {}", e);
            sink.emit(ServerEvent::error(&salvage_project_path(text), e.to_string()));
        }
    }
}
