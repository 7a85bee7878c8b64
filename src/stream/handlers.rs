use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use tracing::{info, instrument};

use super::events::ChatEvent;
use crate::broadcast::ListenerHandle;
use crate::shared::{AppError, AppState};

/// HTTP handler for a room's live message stream
///
/// GET /rooms/{room_id}/stream
/// Opens a listener on the room and forwards each delivered message as one
/// SSE event of type `message`. The stream ends when the room is deleted.
/// A client disconnect drops the stream, which deregisters the listener, so
/// the room never retains a stale subscriber.
#[instrument(name = "stream_room", skip(state))]
pub async fn stream_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Sse<MessageStream>, AppError> {
    info!(room_id = %room_id, "Opening stream listener");

    let handle = state.rooms.open_listener(room_id).await?;

    Ok(Sse::new(MessageStream { handle }).keep_alive(KeepAlive::default()))
}

/// Bridges a `ListenerHandle` into an SSE response body. Never polls: it
/// suspends until the next message or the close signal.
pub struct MessageStream {
    handle: ListenerHandle,
}

impl Stream for MessageStream {
    type Item = Result<Event, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.handle.poll_recv(cx) {
            Poll::Ready(Some(message)) => {
                let event = Event::default()
                    .event("message")
                    .json_data(ChatEvent::from(message));
                Poll::Ready(Some(event))
            }
            // Queue closed: the room is gone, end the response.
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::RoomManager;
    use crate::config::BrokerConfig;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_yields_events_until_room_is_deleted() {
        let rooms = RoomManager::new(BrokerConfig::default());
        let handle = rooms.open_listener("r1").await.unwrap();
        let mut stream = MessageStream { handle };

        rooms.submit("u1", "r1", "hello").await.unwrap();
        let event = stream.next().await.expect("stream ended early");
        assert!(event.is_ok());

        rooms.delete_broadcast("r1").await;
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_the_stream_deregisters_the_listener() {
        let rooms = RoomManager::new(BrokerConfig::default());
        let handle = rooms.open_listener("r1").await.unwrap();
        let stream = MessageStream { handle };

        drop(stream);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(rooms.room("r1").await.unwrap().listeners, 0);
    }
}
