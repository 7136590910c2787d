// ── Reactive device streams ──
//
// Read side of the store: snapshot access plus change notification.

mod filter;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub use filter::{DeviceFilter, ParseFilterError};

use crate::store::Snapshot;

/// A subscription to the device collection.
///
/// Provides point-in-time snapshot access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct DeviceStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl DeviceStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the store task has exited.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Devices in the current snapshot matching `filter`.
    pub fn filtered(&self, filter: &DeviceFilter) -> Snapshot {
        filter.apply(&self.current)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> DeviceWatchStream {
        DeviceWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over the snapshot channel. Yields the current
/// snapshot first, then one per published change.
pub struct DeviceWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for DeviceWatchStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream<Arc<_>> is Unpin.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
