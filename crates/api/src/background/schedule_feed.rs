//! Live schedule feed.
//!
//! Turns change notices from the [`ChangeBus`](ensemble_events::ChangeBus)
//! into `schedule.updated` pushes to every WebSocket client. A single task
//! handles notices one at a time and publishes through
//! [`WsManager::publish_snapshot`], so an older fetch can never be broadcast
//! after a newer one and clients joining later start from the latest copy.

use std::sync::Arc;

use axum::extract::ws::Message;
use ensemble_events::ChangeNotice;
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::handlers::schedule::load_schedule;
use crate::ws::WsManager;

/// Message type pushed to clients.
pub const SCHEDULE_UPDATED: &str = "schedule.updated";

/// Build the `schedule.updated` message for the current schedule.
pub async fn schedule_message(pool: &PgPool) -> Result<Message, sqlx::Error> {
    let view = load_schedule(pool).await?;
    let payload = json!({ "type": SCHEDULE_UPDATED, "data": view });
    Ok(Message::Text(payload.to_string().into()))
}

/// Run the feed until `cancel` fires or the bus closes.
pub async fn run(
    pool: PgPool,
    ws_manager: Arc<WsManager>,
    mut notices: broadcast::Receiver<ChangeNotice>,
    cancel: CancellationToken,
) {
    tracing::info!("Schedule feed started");
    refresh(&pool, &ws_manager, 0).await;

    loop {
        let notice = tokio::select! {
            _ = cancel.cancelled() => break,
            received = notices.recv() => received,
        };

        match notice {
            Ok(notice) => {
                tracing::debug!(
                    table = %notice.table,
                    operation = %notice.operation,
                    "Schedule change received"
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Schedule feed lagged, refreshing");
            }
            Err(RecvError::Closed) => break,
        }

        // A burst of changes only needs one refresh.
        let mut coalesced = 0usize;
        loop {
            match notices.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => coalesced += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        refresh(&pool, &ws_manager, coalesced).await;
    }

    tracing::info!("Schedule feed stopped");
}

/// Load the schedule and publish it as the latest snapshot.
async fn refresh(pool: &PgPool, ws_manager: &WsManager, coalesced: usize) {
    match schedule_message(pool).await {
        Ok(message) => {
            let clients = ws_manager.connection_count().await;
            ws_manager.publish_snapshot(message).await;
            tracing::info!(clients, coalesced, "Broadcast schedule update");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to refresh schedule for live feed");
        }
    }
}
