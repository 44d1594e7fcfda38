// ── Scan tracking ──
//
// A started scan is followed by polling `/api/scan/status` until the
// backend reports a terminal state (`done`, `error`, `canceled`) or the
// caller's deadline passes.

use std::time::Duration;

use idsdash_api::ApiClient;
use idsdash_api::models::{ScanRequest, ScanStarted, ScanStatus};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Polling cadence and deadline.
#[derive(Debug, Clone)]
pub struct ScanPollConfig {
    /// Delay between status requests. Default: 800ms.
    pub interval: Duration,
    /// Give up after this long. Default: 90s.
    pub timeout: Duration,
}

impl Default for ScanPollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(800),
            timeout: Duration::from_secs(90),
        }
    }
}

/// Poll until the scan reaches a terminal state.
///
/// `on_progress` sees every status fetched, including the terminal one.
/// A scan that ends in `error` or `canceled` is still `Ok`; inspect
/// [`ScanStatus::state`]. Transient transport failures are retried
/// until the deadline; any other API error aborts the wait. A status
/// request still in flight at the deadline is abandoned.
pub async fn wait_for_scan<F>(
    api: &ApiClient,
    config: &ScanPollConfig,
    mut on_progress: F,
) -> Result<ScanStatus, CoreError>
where
    F: FnMut(&ScanStatus),
{
    let deadline = Instant::now() + config.timeout;
    let mut last_progress = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Ok(polled) = tokio::time::timeout(remaining, api.scan_status()).await else {
            return Err(CoreError::ScanTimeout {
                timeout: config.timeout,
                last_progress,
            });
        };
        match polled {
            Ok(status) => {
                on_progress(&status);
                if status.state.is_terminal() {
                    debug!(state = %status.state, progress = status.progress, "scan finished");
                    return Ok(status);
                }
                last_progress = status.progress;
            }
            Err(e) if e.is_transient() => warn!(error = %e, "scan status poll failed, retrying"),
            Err(e) => return Err(e.into()),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(CoreError::ScanTimeout {
                timeout: config.timeout,
                last_progress,
            });
        }
        tokio::time::sleep(config.interval.min(deadline - now)).await;
    }
}

/// Start a scan and wait for it to finish.
pub async fn run_scan<F>(
    api: &ApiClient,
    request: &ScanRequest,
    config: &ScanPollConfig,
    on_progress: F,
) -> Result<(ScanStarted, ScanStatus), CoreError>
where
    F: FnMut(&ScanStatus),
{
    let started = api.start_scan(request).await?;
    debug!(targets = ?started.targets, "scan started");
    let status = wait_for_scan(api, config, on_progress).await?;
    Ok((started, status))
}
