// The seam between the sync engine and the device backend.
//
// `netsight-core` talks only to `dyn DeviceBackend`; the GraphQL client
// is the production implementation and tests supply their own.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::types::{DevicePage, DeviceRecord};

/// Which live feed a subscription follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    Created,
    Updated,
}

impl SubscriptionKind {
    pub const ALL: [Self; 2] = [Self::Created, Self::Updated];

    /// Root field of the subscription document.
    pub fn field(self) -> &'static str {
        match self {
            Self::Created => "onCreateDevice",
            Self::Updated => "onUpdateDevice",
        }
    }
}

impl std::fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

/// Device inventory backend: paginated bulk query, create mutation, and
/// two live feeds.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Fetch one page of at most `limit` devices, continuing from `next_token`.
    async fn list_devices(&self, limit: u32, next_token: Option<&str>)
    -> Result<DevicePage, Error>;

    /// Create one device record and return what the backend stored.
    async fn create_device(&self, input: &DeviceRecord) -> Result<DeviceRecord, Error>;

    /// Open a live feed. The feed runs until `cancel` fires or the
    /// returned [`Subscription`] is dropped.
    async fn subscribe(
        &self,
        kind: SubscriptionKind,
        cancel: CancellationToken,
    ) -> Result<Subscription, Error>;
}

/// Receiving end of one live feed.
///
/// Dropping the handle cancels the producing task.
#[derive(Debug)]
pub struct Subscription {
    kind: SubscriptionKind,
    rx: mpsc::Receiver<DeviceRecord>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn new(
        kind: SubscriptionKind,
        rx: mpsc::Receiver<DeviceRecord>,
        cancel: CancellationToken,
    ) -> Self {
        Self { kind, rx, cancel }
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }

    /// Next device payload, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<DeviceRecord> {
        self.rx.recv().await
    }

    /// Stop the producing task without waiting for it.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
