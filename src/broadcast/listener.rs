use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tracing::debug;

use super::broadcaster::Subscriber;
use super::manager::Command;
use super::message::Message;

/// One subscriber's view of a room: the delivery queue plus the registration
/// identity needed to leave again.
///
/// `recv` suspends until the next message; `None` is the close signal (the
/// room was deleted or the manager shut down). Dropping the handle without
/// an explicit `close_listener` fires a best-effort deregistration, so a
/// stream adapter torn down by a client disconnect never leaves a stale
/// entry in the room's subscriber set.
pub struct ListenerHandle {
    queue: mpsc::Receiver<Message>,
    guard: CloseGuard,
}

impl ListenerHandle {
    pub(crate) fn new(
        room_id: String,
        queue: mpsc::Receiver<Message>,
        endpoint: Subscriber,
        manager: mpsc::WeakSender<Command>,
    ) -> Self {
        Self {
            queue,
            guard: CloseGuard {
                room_id,
                // Weak, so this handle never keeps its own queue open: the
                // queue closes exactly when the broadcaster lets go of it.
                endpoint: endpoint.downgrade(),
                manager,
                armed: true,
            },
        }
    }

    /// Receives the next message, suspending until one arrives. Returns
    /// `None` once the queue has been closed on the broker side.
    pub async fn recv(&mut self) -> Option<Message> {
        self.queue.recv().await
    }

    /// Poll-based receive for bridging into a `Stream` adapter.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.queue.poll_recv(cx)
    }

    /// The room this listener was opened against.
    pub fn room_id(&self) -> &str {
        &self.guard.room_id
    }

    /// Dismantles the handle for an explicit close: disarms the drop guard
    /// and hands back the registration identity together with the queue, so
    /// the caller can have the queue torn down after deregistration. The
    /// endpoint comes back `None` when the room is already gone.
    pub(crate) fn into_parts(self) -> (Option<Subscriber>, mpsc::Receiver<Message>) {
        let ListenerHandle { queue, mut guard } = self;
        guard.armed = false;
        (guard.endpoint.upgrade(), queue)
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("room_id", &self.guard.room_id)
            .finish_non_exhaustive()
    }
}

/// Fires the deregistration for a handle that is dropped instead of closed.
struct CloseGuard {
    room_id: String,
    endpoint: mpsc::WeakSender<Message>,
    manager: mpsc::WeakSender<Command>,
    armed: bool,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // If either upgrade fails the room or the manager is already gone
        // and there is nothing left to deregister from.
        let Some(endpoint) = self.endpoint.upgrade() else {
            return;
        };
        let Some(commands) = self.manager.upgrade() else {
            return;
        };
        let command = Command::Close {
            room_id: std::mem::take(&mut self.room_id),
            endpoint,
            queue: None,
        };
        if commands.try_send(command).is_err() {
            debug!("Dropped listener could not enqueue its deregistration");
        }
    }
}
