// ── In-memory routes and views ──
//
// A route names a screen; `ViewState` carries the current device
// snapshot between screens so navigating never re-queries the backend.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::model::{Device, MacAddress};
use crate::report::{DeviceReport, build_report};
use crate::store::Snapshot;

/// Shown by list views while the collection is empty.
pub const EMPTY_PLACEHOLDER: &str = "No devices yet";

/// A navigable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Home,
    /// `/devices`
    Devices,
    /// `/devices/:mac`
    Device(MacAddress),
    /// `/report`
    Report,
    /// Anything else; keeps the requested path.
    NotFound(String),
}

impl Route {
    /// Parse a path. Never fails: unknown paths become [`Route::NotFound`].
    ///
    /// Query strings, fragments, and trailing slashes are ignored.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let bare = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let segments: Vec<&str> = bare.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Home,
            ["devices"] => Self::Devices,
            ["devices", mac] => Self::Device(MacAddress::new(mac)),
            ["report"] => Self::Report,
            _ => Self::NotFound(trimmed.to_owned()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_owned(),
            Self::Devices => "/devices".to_owned(),
            Self::Device(mac) => format!("/devices/{mac}"),
            Self::Report => "/report".to_owned(),
            Self::NotFound(path) => path.clone(),
        }
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What a route resolves to against a snapshot.
#[derive(Debug, Clone)]
pub enum View {
    Home { total_devices: usize },
    /// Empty lists render [`EMPTY_PLACEHOLDER`].
    DeviceList(Snapshot),
    DeviceDetail(Arc<Device>),
    DeviceMissing(MacAddress),
    Report(Box<DeviceReport>),
    NotFound(String),
}

/// Current route plus the snapshot it is rendered against.
#[derive(Debug, Clone)]
pub struct ViewState {
    route: Route,
    devices: Snapshot,
    customer_name: Option<String>,
}

impl ViewState {
    pub fn new(route: Route, devices: Snapshot) -> Self {
        Self {
            route,
            devices,
            customer_name: None,
        }
    }

    #[must_use]
    pub fn with_customer(mut self, customer_name: Option<String>) -> Self {
        self.customer_name = customer_name;
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn devices(&self) -> &Snapshot {
        &self.devices
    }

    /// Move to `route`, keeping the snapshot.
    pub fn navigate(&mut self, route: Route) {
        self.route = route;
    }

    /// Swap in a newer snapshot, keeping the route.
    pub fn refresh(&mut self, devices: Snapshot) {
        self.devices = devices;
    }

    pub fn resolve(&self) -> View {
        match &self.route {
            Route::Home => View::Home {
                total_devices: self.devices.len(),
            },
            Route::Devices => View::DeviceList(Arc::clone(&self.devices)),
            Route::Device(mac) => find_by_mac(&self.devices, mac)
                .map_or_else(|| View::DeviceMissing(mac.clone()), View::DeviceDetail),
            Route::Report => View::Report(Box::new(build_report(
                &self.devices,
                self.customer_name.as_deref(),
            ))),
            Route::NotFound(path) => View::NotFound(path.clone()),
        }
    }
}

/// Latest entry for `mac`. Later entries come from newer deliveries.
pub fn find_by_mac(devices: &[Arc<Device>], mac: &MacAddress) -> Option<Arc<Device>> {
    devices
        .iter()
        .rev()
        .find(|d| d.mac.known() == Some(mac))
        .cloned()
}
