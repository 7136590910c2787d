// ── Paginated device sweep ──
//
// Walks the backend's cursor-paginated device list, dispatching each page
// into the store as it arrives so partial progress is visible.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netsight_api::DeviceBackend;

use crate::config::{SweepMode, SweepOptions};
use crate::error::CoreError;
use crate::model::Device;
use crate::store::Dispatcher;

/// Why a sweep stopped before the backend ran out of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TruncationReason {
    PageLimit,
    TimeBudget,
}

/// How a sweep ended.
#[derive(Debug, Clone)]
pub enum SweepStatus {
    /// The backend stopped returning a cursor.
    Complete,
    Truncated { reason: TruncationReason },
    Cancelled,
    /// A page request failed. Pages appended before it stay in the store.
    Failed(CoreError),
}

/// Result of one sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub status: SweepStatus,
    /// Pages successfully fetched.
    pub pages: u32,
    /// Devices dispatched across all pages.
    pub devices: usize,
    pub elapsed: Duration,
}

impl SweepOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, SweepStatus::Complete)
    }

    pub fn error(&self) -> Option<&CoreError> {
        match &self.status {
            SweepStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Fetch every device page and dispatch it into the store.
///
/// Each page becomes one `Add` as soon as it arrives. The loop ends when
/// the backend omits the cursor, when `max_pages` or the time budget is
/// reached, on cancellation, or on the first failed request. Failures
/// are logged and reported in the outcome; nothing is retried.
///
/// In [`SweepMode::AppendThenReplace`] a final `Set` with every fetched
/// device follows a complete or truncated sweep.
pub async fn fetch_all_devices(
    backend: &dyn DeviceBackend,
    dispatcher: &Dispatcher,
    options: &SweepOptions,
    cancel: &CancellationToken,
) -> SweepOutcome {
    let started = Instant::now();
    let deadline = options.budget.map(|budget| started + budget);
    let replace = options.mode == SweepMode::AppendThenReplace;

    let mut accumulated: Vec<Arc<Device>> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages: u32 = 0;
    let mut devices: usize = 0;

    let status = loop {
        if pages >= options.max_pages {
            break SweepStatus::Truncated {
                reason: TruncationReason::PageLimit,
            };
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break SweepStatus::Truncated {
                reason: TruncationReason::TimeBudget,
            };
        }

        let request = backend.list_devices(options.page_size, cursor.as_deref());
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break SweepStatus::Cancelled,
            () = sleep_until(deadline) => break SweepStatus::Truncated {
                reason: TruncationReason::TimeBudget,
            },
            result = request => result,
        };

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                log_failure(&err, pages);
                break SweepStatus::Failed(err.into());
            }
        };

        pages += 1;
        let next = page.next_cursor().map(str::to_owned);
        let batch: Vec<Arc<Device>> = page
            .items
            .into_iter()
            .map(|record| Arc::new(Device::from(record)))
            .collect();
        devices += batch.len();
        debug!(page = pages, items = batch.len(), more = next.is_some(), "device page");

        if replace {
            accumulated.extend(batch.iter().cloned());
        }
        if let Err(err) = dispatcher.add(batch).await {
            break SweepStatus::Failed(err);
        }

        match next {
            Some(token) => cursor = Some(token),
            None => break SweepStatus::Complete,
        }
    };

    match &status {
        SweepStatus::Complete => info!(pages, devices, "device sweep complete"),
        SweepStatus::Truncated { reason } => {
            warn!(pages, devices, %reason, "device sweep truncated");
        }
        SweepStatus::Cancelled => debug!(pages, devices, "device sweep cancelled"),
        SweepStatus::Failed(_) => {}
    }

    if replace && matches!(status, SweepStatus::Complete | SweepStatus::Truncated { .. }) {
        if let Err(err) = dispatcher.set(accumulated).await {
            warn!(error = %err, "final replace not applied");
        }
    }

    SweepOutcome {
        status,
        pages,
        devices,
        elapsed: started.elapsed(),
    }
}

/// Structured GraphQL errors log their message list; everything else
/// logs its display string.
fn log_failure(err: &netsight_api::Error, pages: u32) {
    match err {
        netsight_api::Error::GraphQl {
            messages,
            error_type,
        } => warn!(
            pages,
            ?messages,
            error_type = error_type.as_deref().unwrap_or("-"),
            "device sweep rejected by backend"
        ),
        other => warn!(pages, error = %other, "device sweep failed"),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
