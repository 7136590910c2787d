// ── Single-writer device store ──
//
// The store task is the only code that touches the collection. Every
// producer (sweep, live feeds, seeding) goes through a `Dispatcher`.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace};

use super::collection::{DeviceCollection, Snapshot, StoreAction};
use crate::error::CoreError;
use crate::model::Device;
use crate::stream::DeviceStream;

const ACTION_CHANNEL_SIZE: usize = 256;

/// Handle to a running store task.
///
/// Dropping the store and every [`Dispatcher`] ends the task; readers
/// keep the last published snapshot.
pub struct DeviceStore {
    dispatcher: Dispatcher,
    snapshot: watch::Receiver<Snapshot>,
    version: watch::Receiver<u64>,
}

impl DeviceStore {
    /// Spawn the store task with an empty collection.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(ACTION_CHANNEL_SIZE);
        let (snapshot_tx, snapshot) = watch::channel(Arc::new(Vec::new()));
        let (version_tx, version) = watch::channel(0);

        tokio::spawn(store_task(rx, snapshot_tx, version_tx));

        Self {
            dispatcher: Dispatcher { tx },
            snapshot,
            version,
        }
    }

    /// A new producer handle.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Latest published snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Version of the latest published snapshot.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> DeviceStream {
        DeviceStream::new(self.snapshot.clone())
    }
}

// ── Dispatcher ──────────────────────────────────────────────────────

/// Cloneable producer handle. Actions from one dispatcher are applied in
/// the order they were sent.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<StoreAction>,
}

impl Dispatcher {
    /// Queue one action. Fails only if the store task is gone.
    pub async fn dispatch(&self, action: StoreAction) -> Result<(), CoreError> {
        self.tx
            .send(action)
            .await
            .map_err(|_| CoreError::SessionInactive)
    }

    pub async fn set(&self, devices: Vec<Arc<Device>>) -> Result<(), CoreError> {
        self.dispatch(StoreAction::Set(devices)).await
    }

    pub async fn add(&self, devices: Vec<Arc<Device>>) -> Result<(), CoreError> {
        self.dispatch(StoreAction::Add(devices)).await
    }

    /// Resolve once every action queued before this call has been
    /// applied. Returns the collection version at that point.
    pub async fn barrier(&self) -> Result<u64, CoreError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.dispatch(StoreAction::Barrier(ack_tx)).await?;
        ack_rx.await.map_err(|_| CoreError::SessionInactive)
    }
}

// ── Store task ──────────────────────────────────────────────────────

async fn store_task(
    mut rx: mpsc::Receiver<StoreAction>,
    snapshot_tx: watch::Sender<Snapshot>,
    version_tx: watch::Sender<u64>,
) {
    let mut collection = DeviceCollection::new();

    // Apply whatever is already queued before publishing, so a burst of
    // actions costs one snapshot instead of one per action.
    while let Some(first) = rx.recv().await {
        let mut next = Some(first);
        let mut dirty = false;

        while let Some(action) = next.take() {
            if let StoreAction::Barrier(ack) = action {
                // Readers woken by the ack must see every earlier action.
                if dirty {
                    publish(&collection, &snapshot_tx, &version_tx);
                    dirty = false;
                }
                let _ = ack.send(collection.version());
            } else {
                let name = action.name();
                collection = collection.reduce(action);
                dirty = true;
                trace!(action = name, len = collection.len(), version = collection.version(), "applied");
            }
            next = rx.try_recv().ok();
        }

        if dirty {
            publish(&collection, &snapshot_tx, &version_tx);
        }
    }

    debug!(len = collection.len(), "device store closed");
}

fn publish(
    collection: &DeviceCollection,
    snapshot_tx: &watch::Sender<Snapshot>,
    version_tx: &watch::Sender<u64>,
) {
    // `send_replace` updates unconditionally, even with zero receivers.
    snapshot_tx.send_replace(collection.snapshot());
    version_tx.send_replace(collection.version());
}
