//! PostgreSQL change listener.
//!
//! [`ChangeListener`] holds a dedicated `LISTEN` connection on
//! [`EVENTS_CHANNEL`] (fed by the `trg_events_changed` trigger) and publishes
//! a [`ChangeNotice`] on the [`ChangeBus`] for every notification. It runs as
//! a long-lived background task until its [`CancellationToken`] fires.

use std::sync::Arc;
use std::time::Duration;

use ensemble_db::DbPool;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;

use crate::bus::{ChangeBus, ChangeNotice};

/// Notification channel raised by the `events` table trigger.
pub const EVENTS_CHANNEL: &str = "events_changed";

/// Table name reported in notices from [`EVENTS_CHANNEL`].
const EVENTS_TABLE: &str = "events";

/// Delay before re-establishing a failed listener connection.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Background service bridging `NOTIFY` to the in-process bus.
pub struct ChangeListener;

impl ChangeListener {
    /// Run the listener loop until `cancel` is triggered.
    ///
    /// Connection failures are logged and retried after a fixed delay.
    pub async fn run(pool: DbPool, bus: Arc<ChangeBus>, cancel: CancellationToken) {
        loop {
            match Self::listen(&pool, &bus, &cancel).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_secs = RETRY_DELAY.as_secs(),
                        "Change listener failed, retrying"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RETRY_DELAY) => {}
            }
        }

        tracing::info!("Change listener stopped");
    }

    /// Listen until cancelled (`Ok`) or the connection fails (`Err`).
    async fn listen(
        pool: &DbPool,
        bus: &ChangeBus,
        cancel: &CancellationToken,
    ) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(EVENTS_CHANNEL).await?;
        tracing::info!(channel = EVENTS_CHANNEL, "Change listener subscribed");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                received = listener.try_recv() => match received? {
                    Some(notification) => {
                        tracing::debug!(
                            operation = notification.payload(),
                            "Events table changed"
                        );
                        bus.publish(ChangeNotice::new(EVENTS_TABLE, notification.payload()));
                    }
                    None => {
                        // The connection dropped and was re-established;
                        // notifications in between are lost, so force a refresh.
                        tracing::warn!("Change listener reconnected, forcing refresh");
                        bus.publish(ChangeNotice::new(EVENTS_TABLE, ""));
                    }
                },
            }
        }
    }
}
