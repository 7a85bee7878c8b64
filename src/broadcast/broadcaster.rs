use tokio::sync::mpsc;
use tracing::debug;

use super::message::Message;
use super::BrokerError;

/// A subscriber's delivery queue endpoint. Registration identity is the
/// endpoint itself: two endpoints are the same listener exactly when
/// `Sender::same_channel` says so.
pub type Subscriber = mpsc::Sender<Message>;

/// Capacity of the register/unregister queues. Control traffic is rare
/// compared to messages, so a small bound is plenty.
const CONTROL_QUEUE: usize = 16;

/// A deregistration event. Carrying the listener's receiver through the
/// event lets the loop drop the queue only after the endpoint has left the
/// subscriber set, so delivery never races queue teardown.
struct Deregister {
    endpoint: Subscriber,
    queue: Option<mpsc::Receiver<Message>>,
}

/// Per-room fan-out engine.
///
/// One spawned task reads three sources (pending messages, registrations,
/// deregistrations) and applies exactly one event per iteration, so the
/// subscriber set is never mutated concurrently and no broadcast is observed
/// partially applied.
#[derive(Clone)]
pub struct Broadcaster {
    input: mpsc::Sender<Message>,
    reg: mpsc::Sender<Subscriber>,
    unreg: mpsc::Sender<Deregister>,
    shutdown: mpsc::Sender<()>,
}

impl Broadcaster {
    /// Spawns the room's processing loop and returns its handle.
    pub fn spawn(room_id: impl Into<String>, message_buffer: usize) -> Self {
        let (input, input_rx) = mpsc::channel(message_buffer.max(1));
        let (reg, reg_rx) = mpsc::channel(CONTROL_QUEUE);
        let (unreg, unreg_rx) = mpsc::channel(CONTROL_QUEUE);
        let (shutdown, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(run(room_id.into(), input_rx, reg_rx, unreg_rx, shutdown_rx));

        Self {
            input,
            reg,
            unreg,
            shutdown,
        }
    }

    /// Adds a subscriber to the room. Applied inside the room's own loop, so
    /// the registration is strictly ordered relative to concurrent submits
    /// and other registrations.
    pub async fn register(&self, endpoint: Subscriber) -> Result<(), BrokerError> {
        self.reg
            .send(endpoint)
            .await
            .map_err(|_| BrokerError::BroadcasterClosed)
    }

    /// Removes a subscriber. Removing an endpoint that was never registered
    /// (or was already removed) is a silent no-op. When `queue` is supplied
    /// it is torn down by the loop strictly after the endpoint has left the
    /// subscriber set.
    pub async fn unregister(
        &self,
        endpoint: Subscriber,
        queue: Option<mpsc::Receiver<Message>>,
    ) -> Result<(), BrokerError> {
        self.unreg
            .send(Deregister { endpoint, queue })
            .await
            .map_err(|_| BrokerError::BroadcasterClosed)
    }

    /// Attempts to enqueue a message without suspending the caller. A full
    /// inbound queue yields `QueueFull` immediately; the submitter decides
    /// whether to drop, retry, or back off.
    pub fn submit(&self, message: Message) -> Result<(), BrokerError> {
        self.input.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => BrokerError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => BrokerError::BroadcasterClosed,
        })
    }

    /// Terminates the processing loop. Subsequent operations on surviving
    /// clones of this handle fail with `BroadcasterClosed` once the loop has
    /// observed the signal and dropped its receivers.
    pub fn close(self) {
        let _ = self.shutdown.try_send(());
    }
}

async fn run(
    room_id: String,
    mut input: mpsc::Receiver<Message>,
    mut reg: mpsc::Receiver<Subscriber>,
    mut unreg: mpsc::Receiver<Deregister>,
    mut shutdown: mpsc::Receiver<()>,
) {
    let mut subscribers: Vec<Subscriber> = Vec::new();

    loop {
        // Biased so control events are applied before the next delivery
        // whenever both are pending. A submit racing a registration is still
        // resolved by arrival order at this loop; that race is inherent.
        tokio::select! {
            biased;

            _ = shutdown.recv() => break,

            endpoint = reg.recv() => match endpoint {
                Some(endpoint) => {
                    subscribers.push(endpoint);
                    debug!(room_id = %room_id, subscribers = subscribers.len(), "Listener registered");
                }
                None => break,
            },

            deregister = unreg.recv() => match deregister {
                Some(Deregister { endpoint, queue }) => {
                    subscribers.retain(|s| !s.same_channel(&endpoint));
                    debug!(room_id = %room_id, subscribers = subscribers.len(), "Listener removed");
                    // The endpoint is out of the set; only now may its queue go.
                    drop(queue);
                }
                None => break,
            },

            message = input.recv() => match message {
                Some(message) => deliver(&room_id, &subscribers, message).await,
                None => break,
            },
        }
    }

    debug!(room_id = %room_id, "Broadcaster stopped");
}

/// Delivers one message to every currently registered subscriber, in
/// registration order. A slow subscriber stalls the room: delivery blocks
/// until its bounded queue accepts the message. A subscriber whose receiver
/// is already gone is skipped; its entry stays until deregistration arrives.
async fn deliver(room_id: &str, subscribers: &[Subscriber], message: Message) {
    for subscriber in subscribers {
        if subscriber.send(message.clone()).await.is_err() {
            debug!(room_id = %room_id, "Listener queue gone before deregistration, skipping");
        }
    }
}
