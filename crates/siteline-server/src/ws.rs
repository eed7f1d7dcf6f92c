use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::{debug, warn};

use siteline_fanout::{ConnectionId, EventStream};
use siteline_protocol::RealtimeFrame;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /v1/events` — upgrade to the realtime channel.
///
/// The connection is registered in the fanout before the upgrade
/// completes; everything the fanout routes to this user (and, for
/// supervisors, to the supervisor audience) is serialized as a
/// [`RealtimeFrame`] and pushed down the socket.
pub async fn events(
    State(state): State<AppState>,
    identity: Identity,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let (connection, stream) = state
        .fanout
        .register(identity.user, identity.role)
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    debug!(user = %identity.user, role = %identity.role, %connection, "realtime connection opened");
    Ok(upgrade.on_upgrade(move |socket| pump(socket, state, connection, stream)))
}

/// Forward routed events until either side goes away, then clean up the
/// registry entry. Clients do not speak on this channel; inbound
/// frames other than close are ignored.
async fn pump(
    mut socket: WebSocket,
    state: AppState,
    connection: ConnectionId,
    mut stream: EventStream,
) {
    loop {
        tokio::select! {
            event = stream.recv() => {
                let Some(event) = event else {
                    // Fanout shut down; close the socket.
                    break;
                };
                let frame = RealtimeFrame::from(&event);
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(%error, "dropping unserializable frame");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.fanout.unregister(&connection);
    debug!(%connection, "realtime connection closed");
}
