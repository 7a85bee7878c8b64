// The broker core: per-room fan-out engines behind a single room registry.
//
// Nothing in here holds a lock. Each broadcaster and the room manager run as
// a dedicated task that exclusively owns its mutable state; callers talk to
// them over message-passing queues, so every state transition is atomic with
// respect to its owning loop.

// Public API - what other modules can use
pub use broadcaster::{Broadcaster, Subscriber};
pub use listener::ListenerHandle;
pub use manager::{RoomInfo, RoomManager};
pub use message::Message;

// Internal modules
mod broadcaster;
mod listener;
mod manager;
mod message;

use thiserror::Error;

/// Failures the broker signals through return values. No broker operation
/// panics or blocks indefinitely on a congested room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The room's bounded inbound queue is full; the message was dropped.
    #[error("room queue is full")]
    QueueFull,

    /// The operation reached a broadcaster that has already been closed.
    #[error("broadcaster is closed")]
    BroadcasterClosed,

    /// The room is not active.
    #[error("room not found: {0}")]
    RoomNotFound(String),
}
