//! Periodic cleanup of idle badge provisioning sessions.
//!
//! Abandoned wizards would otherwise hold their broker link open forever.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::badge::BadgeSessionManager;

/// How often idle sessions are looked for.
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the reaper loop until `cancel` is triggered.
pub async fn run(sessions: Arc<BadgeSessionManager>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = REAP_INTERVAL.as_secs(),
        "Badge session reaper started"
    );

    let mut interval = tokio::time::interval(REAP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Badge session reaper stopping");
                break;
            }
            _ = interval.tick() => {
                let reaped = sessions.reap_idle().await;
                if reaped > 0 {
                    tracing::info!(reaped, "Badge session reaper: closed idle sessions");
                } else {
                    tracing::debug!("Badge session reaper: nothing to close");
                }
            }
        }
    }
}
