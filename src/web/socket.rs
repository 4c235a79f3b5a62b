use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;
use warp::ws::{Message, WebSocket};

use crate::pipeline::PollService;

/// Drive one viewer session: register with the broadcaster, forward
/// every event as a JSON text frame, and deregister when either side of
/// the socket goes away. The viewer is expected to have pulled the full
/// poll list before connecting here.
pub async fn viewer_connected(socket: WebSocket, service: Arc<PollService>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let broadcaster = service.broadcaster().clone();
    let (session_id, events) = broadcaster.register();
    let mut events = UnboundedReceiverStream::new(events);

    let forward = tokio::task::spawn(async move {
        while let Some(event) = events.next().await {
            let frame = match serde_json::to_string(&event) {
                Ok(text) => Message::text(text),
                Err(err) => {
                    debug!(%err, "dropping unserializable event");
                    continue;
                }
            };
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Viewers only listen; drain their side until they hang up.
    while let Some(result) = ws_rx.next().await {
        if result.is_err() {
            break;
        }
    }

    broadcaster.remove(session_id);
    forward.abort();
    debug!(%session_id, "viewer disconnected");
}
