#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use ensemble_api::auth::jwt::JwtConfig;
use ensemble_api::badge::BadgeSessionManager;
use ensemble_api::config::ServerConfig;
use ensemble_api::router::build_app_router;
use ensemble_api::state::AppState;
use ensemble_api::ws::WsManager;
use ensemble_broker::{BrokerConfig, BrokerError, LinkConnector, MessageLink};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const PAGE_BASE_URL: &str = "https://ensemble.rodeo/meta";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        page_base_url: PAGE_BASE_URL.to_string(),
        badge_session_idle_secs: 900,
        badge_max_sessions_per_owner: 3,
        broker: BrokerConfig::default(),
    }
}

// ---------------------------------------------------------------------------
// In-memory broker link
// ---------------------------------------------------------------------------

/// Shared view of every link the [`FakeConnector`] hands out.
#[derive(Default)]
pub struct FakeBroker {
    pub healthy: AtomicBool,
    pub published: Mutex<Vec<(String, String)>>,
}

impl FakeBroker {
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

struct FakeLink(Arc<FakeBroker>);

#[async_trait]
impl MessageLink for FakeLink {
    fn is_healthy(&self) -> bool {
        self.0.healthy.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, body: &str) -> Result<(), BrokerError> {
        if !self.is_healthy() {
            return Err(BrokerError::NotConnected);
        }
        self.0
            .published
            .lock()
            .unwrap()
            .push((topic.to_string(), body.to_string()));
        Ok(())
    }

    async fn close(&self) {}
}

struct FakeConnector(Arc<FakeBroker>);

#[async_trait]
impl LinkConnector for FakeConnector {
    async fn open(&self) -> Result<Box<dyn MessageLink>, BrokerError> {
        Ok(Box::new(FakeLink(Arc::clone(&self.0))))
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Build the full application router with a connected fake broker.
pub fn build_test_app(pool: PgPool) -> Router {
    let broker = Arc::new(FakeBroker::default());
    broker.set_healthy(true);
    build_test_app_with_broker(pool, broker)
}

/// Build the full application router backed by the given fake broker.
pub fn build_test_app_with_broker(pool: PgPool, broker: Arc<FakeBroker>) -> Router {
    let config = test_config();
    let badge_sessions = Arc::new(BadgeSessionManager::new(
        Arc::new(FakeConnector(broker)),
        config.broker.topic.clone(),
        config.page_base_url.clone(),
        Duration::from_secs(config.badge_session_idle_secs),
        config.badge_max_sessions_per_owner,
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
        badge_sessions,
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Sign in anonymously and return `(access_token, user_id)`.
pub async fn sign_in(app: Router) -> (String, String) {
    let response = send(app, Method::POST, "/api/v1/auth/anonymous", None, None).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["access_token"].as_str().unwrap().to_string(),
        json["user"]["id"].as_str().unwrap().to_string(),
    )
}
