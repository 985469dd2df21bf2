//! WebSocket gateway.
//!
//! One socket is one registry session. Outbound envelopes are forwarded as
//! JSON text frames; inbound frames other than close are ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use nestly_core::events::{DomainEvent, EventPayload, PresenceEvent};
use nestly_core::types::id::{GroupId, UserId};
use nestly_realtime::connection::UserSnapshot;

use crate::extractors::AuthenticatedUser;
use crate::state::AppState;

/// GET /ws
pub async fn ws_upgrade(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(state, user, socket))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, user: AuthenticatedUser, socket: WebSocket) {
    let user_id = user.user_id;
    let group_id = match state.groups.group_of(user_id).await {
        Ok(group_id) => group_id,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Group lookup failed, connecting without room");
            None
        }
    };

    let registry = Arc::clone(&state.engine.registry);
    let (handle, mut outbound_rx) = state.engine.new_connection();
    let conn_id = handle.id();

    // The registry owns the only handle, so closing it there ends the forwarder.
    let online = registry.register(
        UserSnapshot {
            user_id,
            group_id,
            display_name: user.display_name,
        },
        Arc::new(handle),
    );
    broadcast_presence(&state, group_id, user_id, online);
    state.engine.bus.publish(DomainEvent::new(
        Some(user_id),
        EventPayload::Presence(PresenceEvent::Online { user_id, group_id }),
    ));

    let (mut ws_tx, mut ws_rx) = socket.split();

    let outbound_task = tokio::spawn(async move {
        while let Some(envelope) = outbound_rx.recv().await {
            let text = match envelope.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize outbound message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Text(text)) => {
                debug!(conn_id = %conn_id, len = text.len(), "Ignoring inbound text frame");
            }
            Ok(_) => {}
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();

    if let Some(offline) = registry.unregister(conn_id) {
        broadcast_presence(&state, group_id, user_id, offline);
        state.engine.bus.publish(DomainEvent::new(
            Some(user_id),
            EventPayload::Presence(PresenceEvent::Offline { user_id, group_id }),
        ));
    }

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}

fn broadcast_presence(
    state: &AppState,
    group_id: Option<GroupId>,
    user_id: UserId,
    message: nestly_realtime::OutboundMessage,
) {
    if let Some(group_id) = group_id {
        state
            .engine
            .registry
            .broadcast_to_group(group_id, message, Some(user_id));
    }
}
