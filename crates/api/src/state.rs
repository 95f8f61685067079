use std::sync::Arc;

use crate::badge::BadgeSessionManager;
use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: ensemble_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (live schedule clients).
    pub ws_manager: Arc<WsManager>,
    /// Open badge provisioning sessions and their broker links.
    pub badge_sessions: Arc<BadgeSessionManager>,
}
