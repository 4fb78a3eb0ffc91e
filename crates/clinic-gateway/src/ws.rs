//! WebSocket endpoint for consultation rooms.
//!
//! The caller joins the room before the upgrade; a non-participant is
//! rejected with a plain HTTP error and no socket is opened. After the
//! upgrade the persisted history is replayed, then the connection relays
//! both directions: incoming text frames become posts, broker broadcasts
//! become outgoing frames. A lagged receiver misses messages and recovers
//! via the history endpoint.

use crate::domain::error::ApiError;
use crate::router::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use clinic_core::{ChatMessageView, EntityId, Principal, RoomSubscription};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

pub async fn room_ws(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<EntityId>,
    ws: WebSocketUpgrade,
) -> Response {
    match state.broker.join(&principal, appointment_id).await {
        Ok(subscription) => ws.on_upgrade(move |socket| {
            run_room(socket, state, principal, appointment_id, subscription)
        }),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn run_room(
    socket: WebSocket,
    state: AppState,
    principal: Principal,
    room: EntityId,
    subscription: RoomSubscription,
) {
    info!(room = %room, participant = %principal.id, "websocket joined room");
    let RoomSubscription {
        history,
        mut receiver,
    } = subscription;
    let (mut sink, mut stream) = socket.split();

    for view in history {
        if send_view(&mut sink, &view).await.is_err() {
            state.broker.release(room);
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    // Membership is re-checked inside the broker per send.
                    if let Err(e) = state.broker.post(&principal, room, &text).await {
                        let frame = json!({ "error": e.to_string() }).to_string();
                        if sink.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Pings are answered by axum; other frames are ignored.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(room = %room, error = %e, "websocket read error");
                    break;
                }
            },
            broadcasted = receiver.recv() => match broadcasted {
                Ok(view) => {
                    if send_view(&mut sink, &view).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // The durable log is authoritative; the client refetches.
                    warn!(room = %room, missed, "websocket receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    state.broker.release(room);
    info!(room = %room, participant = %principal.id, "websocket left room");
}

async fn send_view(
    sink: &mut SplitSink<WebSocket, Message>,
    view: &ChatMessageView,
) -> Result<(), axum::Error> {
    match serde_json::to_string(view) {
        Ok(frame) => sink.send(Message::Text(frame)).await,
        Err(e) => {
            warn!(error = %e, "failed to encode chat message frame");
            Ok(())
        }
    }
}
