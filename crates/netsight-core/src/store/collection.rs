// ── Device collection and its reducer ──

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::model::Device;

/// Immutable view of the collection handed to readers.
pub type Snapshot = Arc<Vec<Arc<Device>>>;

/// The only ways the collection changes.
#[derive(Debug)]
pub enum StoreAction {
    /// Replace the whole collection.
    Set(Vec<Arc<Device>>),
    /// Append to the end, in order. No de-duplication.
    Add(Vec<Arc<Device>>),
    /// Leaves the collection untouched. The store answers on the
    /// channel with the version once every earlier action is applied.
    Barrier(oneshot::Sender<u64>),
}

impl StoreAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set(_) => "set",
            Self::Add(_) => "add",
            Self::Barrier(_) => "barrier",
        }
    }
}

/// Ordered device sequence plus a version bumped by every `Set`/`Add`.
///
/// Holds the union of all `Add` payloads since the last `Set`, in
/// receipt order. Devices may repeat.
///
/// The sequence is shared with published snapshots; an `Add` copies it
/// only while an older snapshot is still held.
#[derive(Debug, Clone, Default)]
pub struct DeviceCollection {
    devices: Snapshot,
    version: u64,
}

impl DeviceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action. `Set` replaces, `Add` concatenates, anything
    /// else returns the collection unchanged.
    pub fn reduce(mut self, action: StoreAction) -> Self {
        match action {
            StoreAction::Set(devices) => {
                self.devices = Arc::new(devices);
                self.version += 1;
            }
            StoreAction::Add(devices) => {
                Arc::make_mut(&mut self.devices).extend(devices);
                self.version += 1;
            }
            StoreAction::Barrier(_) => {}
        }
        self
    }

    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.devices)
    }
}
