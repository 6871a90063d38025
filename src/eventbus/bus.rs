use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::EventBusError;
use crate::eventbus::events::{Event, EventPayload};

const CHANNEL_CAPACITY: usize = 64;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub type SubscriberId = u64;

/// Delivered to a subscriber's channel: either a real event or an empty
/// keep-alive (§4.5 Heartbeat).
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(Event),
    Heartbeat,
}

enum Command {
    Subscribe(oneshot::Sender<(SubscriberId, mpsc::Receiver<Delivery>)>),
    Unsubscribe(SubscriberId),
    Broadcast(Event),
}

/// A heartbeat tick fires roughly every [`HEARTBEAT_INTERVAL`]; two
/// consecutive failed deliveries (≈ [`DEAD_SUBSCRIBER_TIMEOUT`]) marks a
/// subscriber dead. A broadcast overflow evicts immediately regardless
/// of this counter — the two eviction paths are independent (§4.5).
const MAX_MISSED_HEARTBEATS: u32 = 2;

struct Subscriber {
    sender: mpsc::Sender<Delivery>,
    missed_heartbeats: u32,
}

/// Fan-out event bus (C5): a single dispatcher task owns the subscriber
/// map; `subscribe`/`unsubscribe`/`broadcast` are serialized through it
/// over an unbounded command channel (§4.5, §9 "coroutine-style event
/// fan-out"). Delivery is strictly non-blocking — a full subscriber
/// channel is evicted rather than awaited.
pub struct EventBus {
    commands: mpsc::UnboundedSender<Command>,
    _dispatcher: JoinHandle<()>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatcher_loop(rx));
        Self {
            commands: tx,
            _dispatcher: dispatcher,
        }
    }

    /// Register a new subscriber with a bounded channel of capacity 64.
    ///
    /// Fails with [`EventBusError::DispatcherUnavailable`] only if the
    /// dispatcher task has already terminated (e.g. the runtime is
    /// shutting down) — ordinary operation always succeeds.
    pub async fn subscribe(&self) -> Result<(SubscriberId, mpsc::Receiver<Delivery>), EventBusError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Subscribe(reply_tx))
            .map_err(|_| EventBusError::DispatcherUnavailable)?;
        reply_rx.await.map_err(|_| EventBusError::DispatcherUnavailable)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> Result<(), EventBusError> {
        self.commands
            .send(Command::Unsubscribe(id))
            .map_err(|_| EventBusError::DispatcherUnavailable)
    }

    /// Stamp `payload` with the current time and hand it to the
    /// dispatcher. Never blocks the caller (§4.5, §9 "non-blocking
    /// broadcast"); the only failure mode is a dead dispatcher.
    pub fn broadcast(&self, payload: EventPayload) -> Result<(), EventBusError> {
        let event = Event {
            payload,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.commands
            .send(Command::Broadcast(event))
            .map_err(|_| EventBusError::DispatcherUnavailable)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn dispatcher_loop(mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut subscribers: HashMap<SubscriberId, Subscriber> = HashMap::new();
    let mut next_id: SubscriberId = 0;
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(Command::Subscribe(reply)) => {
                        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
                        let id = next_id;
                        next_id += 1;
                        subscribers.insert(
                            id,
                            Subscriber {
                                sender: tx,
                                missed_heartbeats: 0,
                            },
                        );
                        let _ = reply.send((id, rx));
                    }
                    Some(Command::Unsubscribe(id)) => {
                        subscribers.remove(&id);
                    }
                    Some(Command::Broadcast(event)) => {
                        let mut slow = Vec::new();
                        for (id, sub) in subscribers.iter_mut() {
                            match sub.sender.try_send(Delivery::Event(event.clone())) {
                                Ok(()) => sub.missed_heartbeats = 0,
                                Err(_) => slow.push(*id),
                            }
                        }
                        for id in slow {
                            log::warn!("evicting slow subscriber {id}: channel full on broadcast");
                            subscribers.remove(&id);
                        }
                    }
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                let mut dead = Vec::new();
                for (id, sub) in subscribers.iter_mut() {
                    if sub.sender.try_send(Delivery::Heartbeat).is_ok() {
                        sub.missed_heartbeats = 0;
                    } else {
                        sub.missed_heartbeats += 1;
                        if sub.missed_heartbeats >= MAX_MISSED_HEARTBEATS {
                            log::warn!("evicting dead subscriber {id}: missed {MAX_MISSED_HEARTBEATS} heartbeats");
                            dead.push(*id);
                        }
                    }
                }
                for id in dead {
                    subscribers.remove(&id);
                }
            }
        }
    }
}
