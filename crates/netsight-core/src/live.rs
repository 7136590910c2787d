// ── Live device feeds ──
//
// One task per subscription kind, each turning every pushed record into
// a single `Add` on the store. Feeds live exactly as long as the
// `LiveFeed` that started them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netsight_api::{DeviceBackend, SubscriptionKind};

use crate::model::Device;
use crate::store::Dispatcher;

/// The create and update feeds of one activation.
///
/// Dropping a `LiveFeed` cancels its tasks without waiting; call
/// [`stop`](Self::stop) to also wait for them to finish.
pub struct LiveFeed {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl LiveFeed {
    /// Open both feeds. Cancelling `parent` stops them too.
    pub fn start(
        backend: Arc<dyn DeviceBackend>,
        dispatcher: Dispatcher,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let handles = SubscriptionKind::ALL
            .into_iter()
            .map(|kind| {
                tokio::spawn(feed_task(
                    Arc::clone(&backend),
                    dispatcher.clone(),
                    kind,
                    cancel.clone(),
                ))
            })
            .collect();

        Self { cancel, handles }
    }

    /// `true` while at least one feed task is still running.
    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|h| !h.is_finished())
    }

    /// Cancel both feeds and wait for their tasks to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn feed_task(
    backend: Arc<dyn DeviceBackend>,
    dispatcher: Dispatcher,
    kind: SubscriptionKind,
    cancel: CancellationToken,
) {
    let mut subscription = match backend.subscribe(kind, cancel.clone()).await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(feed = %kind, error = %e, "live feed unavailable");
            return;
        }
    };
    info!(feed = %kind, "live feed started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            record = subscription.next() => {
                let Some(record) = record else {
                    debug!(feed = %kind, "live feed ended");
                    break;
                };
                let device = Arc::new(Device::from(record));
                if dispatcher.add(vec![device]).await.is_err() {
                    debug!(feed = %kind, "store closed, stopping feed");
                    break;
                }
            }
        }
    }
}
