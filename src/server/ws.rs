//! WebSocket transport
//!
//! One task per socket: the reader turns text frames into client events
//! for the session actor, a writer task drains the connection's hub queue.

use super::hub::Outgoing;
use super::AppState;
use crate::protocol::{ClientEvent, ConnectionId};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info};

/// `GET /ws`
pub(super) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::new();
    let mut outgoing = state.hub.register(connection.clone());
    let (mut sink, mut stream) = socket.split();
    info!(connection = %connection, "client connected");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outgoing.recv().await {
            match frame {
                Outgoing::Text(text) => {
                    if sink.send(Message::Text(text.as_ref().into())).await.is_err() {
                        break;
                    }
                }
                Outgoing::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientEvent::parse(text.as_str()) {
                    Ok(event) => state.session.dispatch(connection.clone(), event),
                    Err(err) => {
                        debug!(connection = %connection, error = %err, "ignoring malformed frame");
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(connection = %connection, error = %err, "socket error");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    state.hub.unregister(&connection);
    state.session.disconnect(connection.clone());
    writer.abort();
    info!(connection = %connection, "client disconnected");
}
