// ── Device store ──
//
// A single task owns the device collection. Producers hold a
// `Dispatcher` and send actions; the task applies them in arrival order
// and publishes immutable snapshots through a `watch` channel.

mod collection;
mod data_store;

pub use collection::{DeviceCollection, Snapshot, StoreAction};
pub use data_store::{DeviceStore, Dispatcher};
