// Scriptable in-memory backend shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use netsight_api::{DevicePage, DeviceRecord, Error, Subscription, SubscriptionKind};
use netsight_core::DeviceBackend;

type Responder = Box<dyn Fn(u32, Option<&str>) -> Result<DevicePage, Error> + Send + Sync>;

pub struct MockBackend {
    responder: Responder,
    calls: AtomicU32,
    tokens: Mutex<Vec<Option<String>>>,
    feeds: Mutex<HashMap<SubscriptionKind, mpsc::Sender<DeviceRecord>>>,
    created: Mutex<Vec<DeviceRecord>>,
    fail_subscribe: bool,
    page_delay: Duration,
}

impl MockBackend {
    /// `responder(call_index, next_token)` answers each page request.
    pub fn new(
        responder: impl Fn(u32, Option<&str>) -> Result<DevicePage, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: AtomicU32::new(0),
            tokens: Mutex::new(Vec::new()),
            feeds: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            fail_subscribe: false,
            page_delay: Duration::ZERO,
        }
    }

    /// Serve `pages` in order, then empty final pages.
    pub fn paged(pages: Vec<DevicePage>) -> Self {
        Self::new(move |call, _| {
            let idx = usize::try_from(call).unwrap();
            Ok(pages.get(idx).cloned().unwrap_or_default())
        })
    }

    pub fn failing_subscriptions(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    /// Make every page request take `delay`.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<DeviceRecord> {
        self.created.lock().unwrap().clone()
    }

    pub fn is_subscribed(&self, kind: SubscriptionKind) -> bool {
        self.feeds
            .lock()
            .unwrap()
            .get(&kind)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Wait until a live `kind` subscription is open.
    pub async fn wait_subscribed(&self, kind: SubscriptionKind) {
        for _ in 0..200 {
            if self.is_subscribed(kind) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{kind} never subscribed");
    }

    /// Push one record into an open feed. `false` when nobody listens.
    pub async fn push(&self, kind: SubscriptionKind, record: DeviceRecord) -> bool {
        let tx = self.feeds.lock().unwrap().get(&kind).cloned();
        match tx {
            Some(tx) => tx.send(record).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl DeviceBackend for MockBackend {
    async fn list_devices(
        &self,
        _limit: u32,
        next_token: Option<&str>,
    ) -> Result<DevicePage, Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .push(next_token.map(str::to_owned));
        if self.page_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.page_delay).await;
        }
        (self.responder)(call, next_token)
    }

    async fn create_device(&self, input: &DeviceRecord) -> Result<DeviceRecord, Error> {
        self.created.lock().unwrap().push(input.clone());
        let mut stored = input.clone();
        stored.id = Some(format!("dev-{}", self.created.lock().unwrap().len()));
        Ok(stored)
    }

    async fn subscribe(
        &self,
        kind: SubscriptionKind,
        cancel: CancellationToken,
    ) -> Result<Subscription, Error> {
        if self.fail_subscribe {
            return Err(Error::WebSocketConnect("refused".into()));
        }
        let (tx, rx) = mpsc::channel(16);
        self.feeds.lock().unwrap().insert(kind, tx);
        Ok(Subscription::new(kind, rx, cancel.child_token()))
    }
}

pub fn record(mac: &str) -> DeviceRecord {
    DeviceRecord {
        mac_address: Some(mac.to_owned()),
        ..DeviceRecord::default()
    }
}

pub fn page(macs: &[&str], next: Option<&str>) -> DevicePage {
    DevicePage {
        items: macs.iter().map(|m| record(m)).collect(),
        next_token: next.map(str::to_owned),
    }
}

pub fn rejection(message: &str) -> Error {
    Error::GraphQl {
        messages: vec![message.to_owned()],
        error_type: Some("DynamoDB:ProvisionedThroughputExceededException".into()),
    }
}
