use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ensemble_api::background::{badge_reaper, schedule_feed};
use ensemble_api::badge::BadgeSessionManager;
use ensemble_api::config::ServerConfig;
use ensemble_api::router::build_app_router;
use ensemble_api::state::AppState;
use ensemble_api::ws;
use ensemble_broker::MqttConnector;
use ensemble_events::{ChangeBus, ChangeListener};

/// How long each background task gets to finish after shutdown starts.
const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ensemble_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        broker = %config.broker.url,
        topic = %config.broker.topic,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = ensemble_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    ensemble_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    ensemble_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let cancel = CancellationToken::new();

    // --- WebSocket manager + heartbeat ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager), cancel.clone());

    // --- Change feed ---
    let change_bus = Arc::new(ChangeBus::default());
    let listener_handle = tokio::spawn(ChangeListener::run(
        pool.clone(),
        Arc::clone(&change_bus),
        cancel.clone(),
    ));
    let feed_handle = tokio::spawn(schedule_feed::run(
        pool.clone(),
        Arc::clone(&ws_manager),
        change_bus.subscribe(),
        cancel.clone(),
    ));
    tracing::info!("Schedule change feed started");

    // --- Badge sessions ---
    let badge_sessions = Arc::new(BadgeSessionManager::new(
        Arc::new(MqttConnector::new(config.broker.clone())),
        config.broker.topic.clone(),
        config.page_base_url.clone(),
        Duration::from_secs(config.badge_session_idle_secs),
        config.badge_max_sessions_per_owner,
    ));
    let reaper_handle = tokio::spawn(badge_reaper::run(
        Arc::clone(&badge_sessions),
        cancel.clone(),
    ));

    // --- App state + router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        badge_sessions: Arc::clone(&badge_sessions),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Release every broker link before anything else.
    badge_sessions.shutdown_all().await;

    cancel.cancel();
    let _ = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, reaper_handle).await;
    let _ = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, listener_handle).await;
    let _ = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, feed_handle).await;
    let _ = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, heartbeat_handle).await;
    tracing::info!("Background tasks stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
