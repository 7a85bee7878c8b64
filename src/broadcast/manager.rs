use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

use super::broadcaster::{Broadcaster, Subscriber};
use super::listener::ListenerHandle;
use super::message::Message;
use super::BrokerError;
use crate::config::BrokerConfig;

/// Point-in-time view of one active room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: String,
    pub listeners: usize,
}

pub(crate) enum Command {
    Open {
        room_id: String,
        reply: oneshot::Sender<ListenerHandle>,
    },
    Close {
        room_id: String,
        endpoint: Subscriber,
        queue: Option<mpsc::Receiver<Message>>,
    },
    Submit {
        message: Message,
        reply: oneshot::Sender<Result<(), BrokerError>>,
    },
    Delete {
        room_id: String,
    },
    Rooms {
        reply: oneshot::Sender<Vec<RoomInfo>>,
    },
}

/// Registry owning at most one live broadcaster per room.
///
/// A single task drains one request queue and exclusively owns the
/// room-to-broadcaster map, so find-or-create is race-free: two concurrent
/// first subscribers to the same room can never create two broadcasters.
/// The loop only routes; fan-out happens inside each room's own loop, so a
/// slow room does not drag down manager throughput.
///
/// This is an explicit instance, constructed once at startup and passed by
/// handle to every consumer. Handles are cheap clones of the request queue.
#[derive(Clone)]
pub struct RoomManager {
    commands: mpsc::Sender<Command>,
}

impl RoomManager {
    pub fn new(config: BrokerConfig) -> Self {
        let (commands, inbox) = mpsc::channel(config.command_buffer.max(1));
        let registry = Registry {
            rooms: HashMap::new(),
            commands: commands.downgrade(),
            config,
        };
        tokio::spawn(registry.run(inbox));
        Self { commands }
    }

    /// Registers a new listener on the room, lazily creating the room's
    /// broadcaster if it is not yet active.
    pub async fn open_listener(
        &self,
        room_id: impl Into<String>,
    ) -> Result<ListenerHandle, BrokerError> {
        let (reply, handle) = oneshot::channel();
        self.commands
            .send(Command::Open {
                room_id: room_id.into(),
                reply,
            })
            .await
            .map_err(|_| BrokerError::BroadcasterClosed)?;
        handle.await.map_err(|_| BrokerError::BroadcasterClosed)
    }

    /// Deregisters `handle` from the room. Safe when the room has already
    /// been deleted: the call is a no-op. The listener's queue is torn down
    /// strictly after its endpoint has left the room's subscriber set.
    pub async fn close_listener(&self, room_id: &str, handle: ListenerHandle) {
        let (endpoint, queue) = handle.into_parts();
        let Some(endpoint) = endpoint else {
            // Room already gone; the registration died with it.
            return;
        };
        let command = Command::Close {
            room_id: room_id.to_string(),
            endpoint,
            queue: Some(queue),
        };
        let _ = self.commands.send(command).await;
    }

    /// Constructs a message and enqueues it to the room's broadcaster,
    /// creating the room if it is not yet active. Delivery to a room with
    /// zero listeners discards the message without error. Never suspends on
    /// a congested room: a full room queue surfaces as `QueueFull`.
    pub async fn submit(
        &self,
        user_id: impl Into<String>,
        room_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), BrokerError> {
        let message = Message::new(user_id, room_id, text);
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Submit { message, reply })
            .await
            .map_err(|_| BrokerError::BroadcasterClosed)?;
        outcome.await.map_err(|_| BrokerError::BroadcasterClosed)?
    }

    /// Closes and removes the room's broadcaster. Idempotent: deleting an
    /// absent room is a no-op. Listeners still attached observe their queue
    /// closing; they are not moved to any recreated room.
    pub async fn delete_broadcast(&self, room_id: &str) {
        let _ = self
            .commands
            .send(Command::Delete {
                room_id: room_id.to_string(),
            })
            .await;
    }

    /// Lists the currently active rooms.
    pub async fn rooms(&self) -> Vec<RoomInfo> {
        let (reply, listing) = oneshot::channel();
        if self
            .commands
            .send(Command::Rooms { reply })
            .await
            .is_err()
        {
            return Vec::new();
        }
        listing.await.unwrap_or_default()
    }

    /// Looks up a single active room.
    pub async fn room(&self, room_id: &str) -> Result<RoomInfo, BrokerError> {
        self.rooms()
            .await
            .into_iter()
            .find(|room| room.room_id == room_id)
            .ok_or_else(|| BrokerError::RoomNotFound(room_id.to_string()))
    }
}

struct RoomEntry {
    broadcaster: Broadcaster,
    listeners: usize,
    idle_since: Option<Instant>,
}

struct Registry {
    rooms: HashMap<String, RoomEntry>,
    commands: mpsc::WeakSender<Command>,
    config: BrokerConfig,
}

impl Registry {
    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        let sweep_every = self
            .config
            .reaper
            .sweep_interval
            .max(Duration::from_millis(1));
        let mut sweep = interval(sweep_every);

        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = sweep.tick() => self.reap_idle_rooms(),
            }
        }

        // Last manager handle dropped: shut every room down so consumers
        // observe their close signal.
        for (room_id, entry) in self.rooms.drain() {
            debug!(room_id = %room_id, "Closing broadcaster on manager shutdown");
            entry.broadcaster.close();
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Open { room_id, reply } => self.open(room_id, reply).await,
            Command::Close {
                room_id,
                endpoint,
                queue,
            } => self.close(&room_id, endpoint, queue).await,
            Command::Submit { message, reply } => {
                let _ = reply.send(self.submit(message));
            }
            Command::Delete { room_id } => self.delete(&room_id),
            Command::Rooms { reply } => {
                let _ = reply.send(self.list());
            }
        }
    }

    async fn open(&mut self, room_id: String, reply: oneshot::Sender<ListenerHandle>) {
        let listener_buffer = self.config.listener_buffer.max(1);
        let manager = self.commands.clone();

        let entry = self.entry(&room_id);
        let (endpoint, queue) = mpsc::channel(listener_buffer);
        if let Err(err) = entry.broadcaster.register(endpoint.clone()).await {
            // Dropping `reply` fails the caller's open.
            warn!(room_id = %room_id, error = %err, "Registration reached a closed broadcaster");
            return;
        }
        entry.listeners += 1;
        entry.idle_since = None;
        debug!(room_id = %room_id, listeners = entry.listeners, "Listener opened");

        let handle = ListenerHandle::new(room_id, queue, endpoint, manager);
        let _ = reply.send(handle);
    }

    async fn close(
        &mut self,
        room_id: &str,
        endpoint: Subscriber,
        queue: Option<mpsc::Receiver<Message>>,
    ) {
        let Some(entry) = self.rooms.get_mut(room_id) else {
            // Room already deleted; any queue handed in dies here, after the
            // broadcaster that fed it.
            return;
        };
        if entry
            .broadcaster
            .unregister(endpoint, queue)
            .await
            .is_err()
        {
            debug!(room_id = %room_id, "Deregistration reached a closed broadcaster");
        }
        entry.listeners = entry.listeners.saturating_sub(1);
        if entry.listeners == 0 {
            entry.idle_since = Some(Instant::now());
        }
        debug!(room_id = %room_id, listeners = entry.listeners, "Listener closed");
    }

    fn submit(&mut self, message: Message) -> Result<(), BrokerError> {
        let room_id = message.room_id.clone();
        let entry = self.entry(&room_id);
        // A submit counts as activity even while nobody is listening.
        if entry.listeners == 0 {
            entry.idle_since = Some(Instant::now());
        }
        let outcome = entry.broadcaster.submit(message);
        if let Err(err) = &outcome {
            warn!(room_id = %room_id, error = %err, "Message rejected");
        }
        outcome
    }

    fn delete(&mut self, room_id: &str) {
        if let Some(entry) = self.rooms.remove(room_id) {
            info!(room_id = %room_id, listeners = entry.listeners, "Deleting broadcaster");
            entry.broadcaster.close();
        }
    }

    fn list(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .map(|(room_id, entry)| RoomInfo {
                room_id: room_id.clone(),
                listeners: entry.listeners,
            })
            .collect()
    }

    /// Race-free find-or-create: only this loop ever touches the map.
    fn entry(&mut self, room_id: &str) -> &mut RoomEntry {
        let message_buffer = self.config.message_buffer;
        self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            info!(room_id = %room_id, "Creating broadcaster");
            RoomEntry {
                broadcaster: Broadcaster::spawn(room_id, message_buffer),
                listeners: 0,
                idle_since: Some(Instant::now()),
            }
        })
    }

    /// Deletes rooms that have sat at zero listeners past the grace period.
    fn reap_idle_rooms(&mut self) {
        let grace = self.config.reaper.idle_grace;
        let expired: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, entry)| {
                entry.listeners == 0
                    && entry
                        .idle_since
                        .is_some_and(|since| since.elapsed() >= grace)
            })
            .map(|(room_id, _)| room_id.clone())
            .collect();

        for room_id in expired {
            info!(room_id = %room_id, "Reaping idle room");
            self.delete(&room_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaperConfig;

    fn manager() -> RoomManager {
        RoomManager::new(BrokerConfig::default())
    }

    #[tokio::test]
    async fn test_open_submit_receive() {
        let rooms = manager();
        let mut listener = rooms.open_listener("r1").await.unwrap();

        rooms.submit("u1", "r1", "hello").await.unwrap();

        let message = listener.recv().await.unwrap();
        assert_eq!(message.user_id, "u1");
        assert_eq!(message.room_id, "r1");
        assert_eq!(message.text, "hello");
    }

    #[tokio::test]
    async fn test_submit_creates_room_and_discards_without_listeners() {
        let rooms = manager();

        rooms.submit("u1", "r1", "into the void").await.unwrap();

        let listing = rooms.rooms().await;
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].room_id, "r1");
        assert_eq!(listing[0].listeners, 0);
    }

    #[tokio::test]
    async fn test_lookup_of_unknown_room_reports_room_not_found() {
        let rooms = manager();

        let err = rooms.room("nowhere").await.unwrap_err();
        assert_eq!(err, BrokerError::RoomNotFound("nowhere".to_string()));
    }

    #[tokio::test]
    async fn test_close_listener_after_delete_is_noop() {
        let rooms = manager();
        let mut listener = rooms.open_listener("r1").await.unwrap();

        rooms.delete_broadcast("r1").await;
        assert!(listener.recv().await.is_none());

        rooms.close_listener("r1", listener).await;
        assert!(rooms.rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_handle_deregisters_itself() {
        let rooms = manager();
        let keep = rooms.open_listener("r1").await.unwrap();
        let fleeting = rooms.open_listener("r1").await.unwrap();

        drop(fleeting);
        // The deregistration command is processed asynchronously.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let info = rooms.room("r1").await.unwrap();
        assert_eq!(info.listeners, 1);
        drop(keep);
    }

    #[tokio::test]
    async fn test_reaper_deletes_idle_rooms_and_spares_occupied_ones() {
        let config = BrokerConfig {
            reaper: ReaperConfig {
                sweep_interval: Duration::from_millis(20),
                idle_grace: Duration::from_millis(40),
            },
            ..Default::default()
        };
        let rooms = RoomManager::new(config);

        let occupied = rooms.open_listener("occupied").await.unwrap();
        rooms.submit("u1", "idle", "creates the room").await.unwrap();
        assert_eq!(rooms.rooms().await.len(), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;

        let listing = rooms.rooms().await;
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].room_id, "occupied");
        drop(occupied);
    }

    #[tokio::test]
    async fn test_room_returns_after_reap_on_next_use() {
        let config = BrokerConfig {
            reaper: ReaperConfig {
                sweep_interval: Duration::from_millis(10),
                idle_grace: Duration::from_millis(10),
            },
            ..Default::default()
        };
        let rooms = RoomManager::new(config);

        rooms.submit("u1", "r1", "first life").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rooms.rooms().await.is_empty());

        // Unlimited re-entry: absent -> active again on the next operation.
        let mut listener = rooms.open_listener("r1").await.unwrap();
        rooms.submit("u1", "r1", "second life").await.unwrap();
        assert_eq!(listener.recv().await.unwrap().text, "second life");
    }
}
