// netsight-core: Device inventory sync engine between netsight-api and consumers (CLI).

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod live;
pub mod model;
pub mod report;
pub mod seed;
pub mod session;
pub mod store;
pub mod stream;
pub mod sweep;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ReconnectConfig, SessionConfig, SweepMode, SweepOptions, TlsVerification};
pub use error::CoreError;
pub use live::LiveFeed;
pub use model::{Completeness, Device, MacAddress, Reading};
pub use report::{DeviceReport, build_report};
pub use seed::{persist_device, sample_device};
pub use session::{Session, SessionState};
pub use store::{DeviceCollection, DeviceStore, Dispatcher, Snapshot, StoreAction};
pub use stream::{DeviceFilter, DeviceStream};
pub use sweep::{SweepOutcome, SweepStatus, TruncationReason, fetch_all_devices};
pub use view::{Route, View, ViewState};

// Wire types consumers need alongside the core API.
pub use netsight_api::{DeviceBackend, DeviceRecord, SubscriptionKind};
