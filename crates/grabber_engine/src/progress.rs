use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use grabber_logging::{grabber_debug, grabber_warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::TransferId;

/// Per-subscriber queue depth before events start being dropped for it.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

pub type SubscriberId = u64;

/// Transfer lifecycle event. Serializes to the wire shape the browser UI reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    #[serde(rename = "download_progress")]
    Progress {
        #[serde(rename = "downloadId")]
        transfer_id: TransferId,
        /// `None` when the remote did not declare a size.
        #[serde(rename = "progress")]
        percent: Option<u8>,
        #[serde(rename = "fileName")]
        name: String,
    },
    #[serde(rename = "download_complete")]
    Complete {
        #[serde(rename = "downloadId")]
        transfer_id: TransferId,
        #[serde(rename = "fileName")]
        name: String,
        #[serde(rename = "filePath")]
        path: String,
    },
    #[serde(rename = "download_error")]
    Failed {
        #[serde(rename = "downloadId")]
        transfer_id: TransferId,
        #[serde(rename = "fileName")]
        name: String,
        error: String,
    },
}

impl ProgressEvent {
    pub fn transfer_id(&self) -> &TransferId {
        match self {
            ProgressEvent::Progress { transfer_id, .. }
            | ProgressEvent::Complete { transfer_id, .. }
            | ProgressEvent::Failed { transfer_id, .. } => transfer_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

struct Registry {
    next_id: AtomicU64,
    buffer: usize,
    subscribers: Mutex<BTreeMap<SubscriberId, mpsc::Sender<ProgressEvent>>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriberId, mpsc::Sender<ProgressEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: SubscriberId) {
        if self.lock().remove(&id).is_some() {
            grabber_debug!("progress subscriber {id} removed");
        }
    }
}

/// Broadcast of transfer events to any number of subscribers.
///
/// Each subscriber owns a bounded queue. Publishing never waits: a full queue
/// loses that one event for that one subscriber, and a queue whose receiver is
/// gone is pruned. Registration, removal and publishing all go through the
/// same lock, so a removed subscriber never sees a later event.
#[derive(Clone)]
pub struct ProgressChannel {
    registry: Arc<Registry>,
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressChannel {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.registry.buffer);
        self.registry.lock().insert(id, tx);
        grabber_debug!("progress subscriber {id} added");
        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to every live subscriber; returns how many got it.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        let mut subscribers = self.registry.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    grabber_warn!(
                        "progress subscriber {id} is lagging; dropped event for transfer {}",
                        event.transfer_id()
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            subscribers.remove(&id);
            grabber_debug!("progress subscriber {id} pruned after disconnect");
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }
}

impl ProgressSink for ProgressChannel {
    fn emit(&self, event: ProgressEvent) {
        self.publish(event);
    }
}

/// Receiving end of one subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<ProgressEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event; `None` once the channel itself is gone.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
