// ── Session facade ──
//
// Lifecycle of one backend session: activation creates an empty store,
// starts the sweep and the live feeds, and deactivation tears all of
// it down. Consumers read snapshots and resolve views through here.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use netsight_api::transport::{TlsMode, TransportConfig};
use netsight_api::{DeviceBackend, DeviceRecord, GraphqlClient};

use crate::config::{SessionConfig, TlsVerification};
use crate::error::CoreError;
use crate::live::LiveFeed;
use crate::model::{Device, MacAddress};
use crate::report::{DeviceReport, build_report};
use crate::seed::persist_device;
use crate::store::{DeviceStore, Dispatcher, Snapshot};
use crate::stream::DeviceStream;
use crate::sweep::{SweepOutcome, fetch_all_devices};
use crate::view::{Route, View, ViewState, find_by_mac};

// ── SessionState ─────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionState {
    Inactive,
    /// Store is live; the initial sweep is still running.
    Sweeping,
    /// Sweep finished (in any way); live feeds keep appending.
    Active,
}

// ── Session ──────────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable. Does nothing until [`activate`](Self::activate).
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    backend: Arc<dyn DeviceBackend>,
    state: Arc<watch::Sender<SessionState>>,
    store: watch::Sender<Option<Arc<DeviceStore>>>,
    activation: Mutex<Option<Activation>>,
}

/// Everything owned by one activation.
struct Activation {
    cancel: CancellationToken,
    sweep: JoinHandle<()>,
    outcome: watch::Receiver<Option<SweepOutcome>>,
    feed: Option<LiveFeed>,
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Session {
    /// Build a session talking to the GraphQL backend in `config`.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = GraphqlClient::new(
            config.endpoint.as_str(),
            config.realtime_endpoint.as_ref().map(url::Url::as_str),
            &transport,
        )?
        .with_reconnect(config.reconnect.clone());

        Ok(Self::with_backend(config, Arc::new(client)))
    }

    /// Build a session over any backend implementation.
    pub fn with_backend(config: SessionConfig, backend: Arc<dyn DeviceBackend>) -> Self {
        let (state, _) = watch::channel(SessionState::Inactive);
        let (store, _) = watch::channel(None);

        Self {
            inner: Arc::new(SessionInner {
                config,
                backend,
                state: Arc::new(state),
                store,
                activation: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &Arc<dyn DeviceBackend> {
        &self.inner.backend
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start an activation: a fresh empty store, the bulk sweep, and
    /// (when enabled) the live feeds. Returns immediately; use
    /// [`wait_for_sweep`](Self::wait_for_sweep) to wait for the sweep.
    ///
    /// Activating an active session is a no-op.
    pub async fn activate(&self) -> Result<(), CoreError> {
        let mut activation = self.inner.activation.lock().await;
        if activation.is_some() {
            debug!("session already active");
            return Ok(());
        }

        let store = Arc::new(DeviceStore::spawn());
        let cancel = CancellationToken::new();

        let feed = self.inner.config.live_feeds.then(|| {
            LiveFeed::start(
                Arc::clone(&self.inner.backend),
                store.dispatcher(),
                &cancel,
            )
        });

        // Publish before spawning so the sweep's final state wins.
        self.inner.store.send_replace(Some(Arc::clone(&store)));
        self.inner.state.send_replace(SessionState::Sweeping);

        let (outcome_tx, outcome) = watch::channel(None);
        let sweep = {
            // The task must not own a `Session`: dropping the last handle
            // has to drop the activation and cancel it.
            let backend = Arc::clone(&self.inner.backend);
            let options = self.inner.config.sweep.clone();
            let state = Arc::clone(&self.inner.state);
            let dispatcher = store.dispatcher();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let result =
                    fetch_all_devices(backend.as_ref(), &dispatcher, &options, &cancel).await;
                // Earlier adds must be visible before anyone sees the outcome.
                let _ = dispatcher.barrier().await;
                if !cancel.is_cancelled() {
                    state.send_replace(SessionState::Active);
                }
                outcome_tx.send_replace(Some(result));
            })
        };

        *activation = Some(Activation {
            cancel,
            sweep,
            outcome,
            feed,
        });

        info!(
            endpoint = %self.inner.config.endpoint,
            live_feeds = self.inner.config.live_feeds,
            "session activated"
        );
        Ok(())
    }

    /// Wait for the current activation's sweep to finish.
    pub async fn wait_for_sweep(&self) -> Result<SweepOutcome, CoreError> {
        let mut outcome = {
            let activation = self.inner.activation.lock().await;
            activation
                .as_ref()
                .map(|a| a.outcome.clone())
                .ok_or(CoreError::SessionInactive)?
        };

        let done = outcome
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CoreError::SessionInactive)?;
        done.clone().ok_or(CoreError::SessionInactive)
    }

    /// End the activation: cancel the sweep and both feeds, wait for
    /// them to exit, and drop the store. Readers keep whatever snapshot
    /// they already hold.
    pub async fn deactivate(&self) {
        let Some(mut activation) = self.inner.activation.lock().await.take() else {
            return;
        };

        activation.cancel.cancel();
        if let Some(feed) = activation.feed.take() {
            feed.stop().await;
        }
        let _ = (&mut activation.sweep).await;

        self.inner.store.send_replace(None);
        self.inner.state.send_replace(SessionState::Inactive);
        info!("session deactivated");
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: activate without live feeds, wait for the sweep, run
    /// the closure, deactivate.
    pub async fn oneshot<F, Fut, T>(config: SessionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Session, SweepOutcome) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.live_feeds = false;
        Self::new(cfg)?.run_once(f).await
    }

    /// Same as [`oneshot`](Self::oneshot) on an existing session.
    pub async fn run_once<F, Fut, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Session, SweepOutcome) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        self.activate().await?;
        let result = match self.wait_for_sweep().await {
            Ok(outcome) => f(self.clone(), outcome).await,
            Err(e) => Err(e),
        };
        self.deactivate().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    // ── Store access ─────────────────────────────────────────────

    /// Current snapshot; empty while inactive.
    pub fn devices_snapshot(&self) -> Snapshot {
        self.inner
            .store
            .borrow()
            .as_ref()
            .map_or_else(|| Arc::new(Vec::new()), |store| store.snapshot())
    }

    /// Subscribe to the active store.
    pub fn devices(&self) -> Result<DeviceStream, CoreError> {
        self.with_store(|store| store.subscribe())
    }

    /// Producer handle for the active store.
    pub fn dispatcher(&self) -> Result<Dispatcher, CoreError> {
        self.with_store(|store| store.dispatcher())
    }

    /// Latest entry for `mac` in the current snapshot.
    pub fn device_by_mac(&self, mac: &MacAddress) -> Option<Arc<Device>> {
        find_by_mac(&self.devices_snapshot(), mac)
    }

    pub fn report(&self) -> DeviceReport {
        build_report(
            &self.devices_snapshot(),
            self.inner.config.customer_name.as_deref(),
        )
    }

    /// Resolve `route` against the current snapshot.
    pub fn view(&self, route: Route) -> View {
        ViewState::new(route, self.devices_snapshot())
            .with_customer(self.inner.config.customer_name.clone())
            .resolve()
    }

    /// Create a device on the backend (the built-in sample when `input`
    /// is `None`). Works whether or not the session is active.
    pub async fn seed(&self, input: Option<DeviceRecord>) -> Result<Value, CoreError> {
        persist_device(self.inner.backend.as_ref(), input).await
    }

    fn with_store<T>(&self, f: impl FnOnce(&DeviceStore) -> T) -> Result<T, CoreError> {
        self.inner
            .store
            .borrow()
            .as_deref()
            .map(f)
            .ok_or(CoreError::SessionInactive)
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &SessionConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        api_key: config.api_key.clone(),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
