// netsight-api: Async Rust client for the device inventory GraphQL backend

pub mod backend;
pub mod client;
pub mod error;
pub mod extract;
pub mod queries;
pub mod subscription;
pub mod transport;
pub mod types;

pub use backend::{DeviceBackend, Subscription, SubscriptionKind};
pub use client::GraphqlClient;
pub use error::Error;
pub use extract::{extract_path, extract_path_or};
pub use subscription::ReconnectConfig;
pub use transport::{TlsMode, TransportConfig};
pub use types::{DevicePage, DeviceRecord};
