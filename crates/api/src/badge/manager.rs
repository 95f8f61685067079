//! Registry of open badge provisioning sessions.
//!
//! Every session is bound to the identity that opened it; lookups by any
//! other identity behave as if the session did not exist. The broker link is
//! opened with the session and closed when the session is closed, reaped for
//! inactivity, or torn down at shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ensemble_broker::{BrokerError, LinkConnector, MessageLink};
use ensemble_core::badge::{BadgeSession, ProvisioningMessage, SendRejection};
use ensemble_core::error::CoreError;
use ensemble_core::types::EntityId;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Errors returned by [`BadgeSessionManager`] operations.
#[derive(Debug, thiserror::Error)]
pub enum BadgeSessionError {
    /// No session with this id is visible to the caller.
    #[error("Badge session {0} not found")]
    NotFound(EntityId),

    /// The wizard refused the transition.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Sending was refused before anything was published.
    #[error(transparent)]
    Rejected(#[from] SendRejection),

    /// The owner already holds the maximum number of open sessions.
    #[error("At most {limit} badge sessions may be open at once")]
    LimitReached { limit: usize },

    /// The broker link failed to open or publish.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Snapshot of a session returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeSessionView {
    pub id: EntityId,
    #[serde(flatten)]
    pub session: BadgeSession,
    /// Whether the session's broker link is currently up.
    pub connected: bool,
}

/// Bookkeeping for one open session.
struct ManagedSession {
    owner: EntityId,
    session: BadgeSession,
    link: Arc<dyn MessageLink>,
    last_active: Instant,
}

impl ManagedSession {
    fn view(&self, id: EntityId) -> BadgeSessionView {
        BadgeSessionView {
            id,
            session: self.session.clone(),
            connected: self.link.is_healthy(),
        }
    }
}

/// Owns all open badge sessions and their broker links.
///
/// Created once at startup and shared through `AppState`.
pub struct BadgeSessionManager {
    sessions: Mutex<HashMap<EntityId, ManagedSession>>,
    connector: Arc<dyn LinkConnector>,
    topic: String,
    page_base_url: String,
    idle_timeout: Duration,
    max_per_owner: usize,
}

impl BadgeSessionManager {
    pub fn new(
        connector: Arc<dyn LinkConnector>,
        topic: impl Into<String>,
        page_base_url: impl Into<String>,
        idle_timeout: Duration,
        max_per_owner: usize,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            connector,
            topic: topic.into(),
            page_base_url: page_base_url.into(),
            idle_timeout,
            max_per_owner,
        }
    }

    /// Open a new session for `owner`, establishing its broker link.
    ///
    /// Fails with [`BadgeSessionError::LimitReached`] once the owner holds
    /// `max_per_owner` sessions; no link is kept in that case.
    pub async fn open(&self, owner: EntityId) -> Result<BadgeSessionView, BadgeSessionError> {
        self.ensure_capacity(&*self.sessions.lock().await, owner)?;

        let link: Arc<dyn MessageLink> = Arc::from(self.connector.open().await?);
        let id = Uuid::new_v4();

        let managed = ManagedSession {
            owner,
            session: BadgeSession::new(),
            link,
            last_active: Instant::now(),
        };
        let view = managed.view(id);

        {
            // Another open for the same owner may have finished while the
            // link was connecting.
            let mut sessions = self.sessions.lock().await;
            if let Err(err) = self.ensure_capacity(&sessions, owner) {
                drop(sessions);
                managed.link.close().await;
                return Err(err);
            }
            sessions.insert(id, managed);
        }

        tracing::info!(session_id = %id, owner_id = %owner, "Badge session opened");
        Ok(view)
    }

    /// Current state of a session.
    pub async fn get(
        &self,
        id: EntityId,
        owner: EntityId,
    ) -> Result<BadgeSessionView, BadgeSessionError> {
        self.update(id, owner, |_, _| Ok(())).await
    }

    /// Intro -> SelectDestination.
    pub async fn start(
        &self,
        id: EntityId,
        owner: EntityId,
    ) -> Result<BadgeSessionView, BadgeSessionError> {
        self.update(id, owner, |session, _| session.start()).await
    }

    /// Choose a stored page as destination.
    pub async fn select_page(
        &self,
        id: EntityId,
        owner: EntityId,
        page_id: EntityId,
    ) -> Result<BadgeSessionView, BadgeSessionError> {
        self.update(id, owner, |session, _| session.select_page(page_id))
            .await
    }

    /// Choose a literal URL as destination.
    pub async fn enter_url(
        &self,
        id: EntityId,
        owner: EntityId,
        url: &str,
    ) -> Result<BadgeSessionView, BadgeSessionError> {
        self.update(id, owner, |session, _| session.enter_url(url))
            .await
    }

    /// Confirm the destination, resolving the final URL.
    pub async fn confirm_destination(
        &self,
        id: EntityId,
        owner: EntityId,
    ) -> Result<BadgeSessionView, BadgeSessionError> {
        self.update(id, owner, |session, base| {
            session.confirm_destination(base).map(|_| ())
        })
        .await
    }

    /// Choose the target device.
    pub async fn select_device(
        &self,
        id: EntityId,
        owner: EntityId,
        device_id: &str,
    ) -> Result<BadgeSessionView, BadgeSessionError> {
        self.update(id, owner, |session, _| session.select_device(device_id))
            .await
    }

    /// SelectDevice -> SelectDestination.
    pub async fn back(
        &self,
        id: EntityId,
        owner: EntityId,
    ) -> Result<BadgeSessionView, BadgeSessionError> {
        self.update(id, owner, |session, _| session.back()).await
    }

    /// Publish the provisioning message for the session's device and URL.
    ///
    /// The session stays on its step, so the caller may send again.
    pub async fn send(
        &self,
        id: EntityId,
        owner: EntityId,
    ) -> Result<ProvisioningMessage, BadgeSessionError> {
        let (message, link) = {
            let mut sessions = self.sessions.lock().await;
            let managed = find_owned(&mut sessions, id, owner)?;
            managed.last_active = Instant::now();
            let message = managed.session.prepare_send(managed.link.is_healthy())?;
            (message, Arc::clone(&managed.link))
        };

        link.publish(&self.topic, &message.body).await?;

        tracing::info!(
            session_id = %id,
            device_id = %message.device_id,
            url = %message.url,
            topic = %self.topic,
            "Badge provisioning message sent"
        );
        Ok(message)
    }

    /// Close a session and release its broker link.
    pub async fn close(&self, id: EntityId, owner: EntityId) -> Result<(), BadgeSessionError> {
        let managed = {
            let mut sessions = self.sessions.lock().await;
            find_owned(&mut sessions, id, owner)?;
            sessions.remove(&id)
        };

        if let Some(managed) = managed {
            managed.link.close().await;
            tracing::info!(session_id = %id, "Badge session closed");
        }
        Ok(())
    }

    /// Close every session idle for longer than the configured timeout.
    ///
    /// Returns the number of sessions reaped.
    pub async fn reap_idle(&self) -> usize {
        let expired: Vec<(EntityId, ManagedSession)> = {
            let mut sessions = self.sessions.lock().await;
            let ids: Vec<EntityId> = sessions
                .iter()
                .filter(|(_, managed)| managed.last_active.elapsed() >= self.idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|managed| (id, managed)))
                .collect()
        };

        for (id, managed) in &expired {
            managed.link.close().await;
            tracing::info!(session_id = %id, "Idle badge session reaped");
        }
        expired.len()
    }

    /// Close every session. Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let drained: Vec<ManagedSession> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, managed)| managed).collect()
        };

        let count = drained.len();
        for managed in drained {
            managed.link.close().await;
        }
        tracing::info!(count, "Closed all badge sessions");
    }

    /// Number of open sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn ensure_capacity(
        &self,
        sessions: &HashMap<EntityId, ManagedSession>,
        owner: EntityId,
    ) -> Result<(), BadgeSessionError> {
        let held = sessions.values().filter(|m| m.owner == owner).count();
        if held >= self.max_per_owner {
            tracing::warn!(owner_id = %owner, held, "Badge session limit reached");
            return Err(BadgeSessionError::LimitReached {
                limit: self.max_per_owner,
            });
        }
        Ok(())
    }

    /// Apply `f` to an owned session and return its new state.
    ///
    /// Activity is recorded even when `f` rejects the transition.
    async fn update<F>(
        &self,
        id: EntityId,
        owner: EntityId,
        f: F,
    ) -> Result<BadgeSessionView, BadgeSessionError>
    where
        F: FnOnce(&mut BadgeSession, &str) -> Result<(), CoreError>,
    {
        let mut sessions = self.sessions.lock().await;
        let managed = find_owned(&mut sessions, id, owner)?;
        managed.last_active = Instant::now();
        f(&mut managed.session, &self.page_base_url)?;
        Ok(managed.view(id))
    }
}

/// Look up a session, hiding sessions that belong to someone else.
fn find_owned(
    sessions: &mut HashMap<EntityId, ManagedSession>,
    id: EntityId,
    owner: EntityId,
) -> Result<&mut ManagedSession, BadgeSessionError> {
    match sessions.get_mut(&id) {
        Some(managed) if managed.owner == owner => Ok(managed),
        _ => Err(BadgeSessionError::NotFound(id)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use ensemble_core::badge::WizardStep;

    use super::*;

    const BASE: &str = "https://ensemble.rodeo/meta";

    #[derive(Default)]
    struct Recorder {
        healthy: AtomicBool,
        published: std::sync::Mutex<Vec<(String, String)>>,
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    struct RecordingLink(Arc<Recorder>);

    #[async_trait]
    impl MessageLink for RecordingLink {
        fn is_healthy(&self) -> bool {
            self.0.healthy.load(Ordering::SeqCst)
        }

        async fn publish(&self, topic: &str, body: &str) -> Result<(), BrokerError> {
            self.0
                .published
                .lock()
                .unwrap()
                .push((topic.to_string(), body.to_string()));
            Ok(())
        }

        async fn close(&self) {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct RecordingConnector(Arc<Recorder>);

    #[async_trait]
    impl LinkConnector for RecordingConnector {
        async fn open(&self) -> Result<Box<dyn MessageLink>, BrokerError> {
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingLink(Arc::clone(&self.0))))
        }
    }

    fn manager(healthy: bool, idle: Duration) -> (BadgeSessionManager, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        recorder.healthy.store(healthy, Ordering::SeqCst);
        let manager = BadgeSessionManager::new(
            Arc::new(RecordingConnector(Arc::clone(&recorder))),
            "esp32/nfc",
            BASE,
            idle,
            3,
        );
        (manager, recorder)
    }

    #[tokio::test]
    async fn full_flow_publishes_device_and_url() {
        let (manager, recorder) = manager(true, Duration::from_secs(60));
        let owner = Uuid::new_v4();

        let session = manager.open(owner).await.unwrap();
        assert_eq!(session.session.step(), WizardStep::Intro);
        assert!(session.connected);

        manager.start(session.id, owner).await.unwrap();
        manager
            .enter_url(session.id, owner, "https://example.com")
            .await
            .unwrap();
        let view = manager
            .confirm_destination(session.id, owner)
            .await
            .unwrap();
        assert_eq!(view.session.final_url(), Some("https://example.com"));

        manager
            .select_device(session.id, owner, "AA:BB:CC")
            .await
            .unwrap();
        let message = manager.send(session.id, owner).await.unwrap();

        assert_eq!(message.body, "AA:BB:CC-https://example.com");
        let published = recorder.published.lock().unwrap().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "esp32/nfc");
        assert_eq!(published[0].1, "AA:BB:CC-https://example.com");
    }

    #[tokio::test]
    async fn send_with_unhealthy_link_publishes_nothing() {
        let (manager, recorder) = manager(false, Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let session = manager.open(owner).await.unwrap();
        manager.start(session.id, owner).await.unwrap();
        manager
            .enter_url(session.id, owner, "https://example.com")
            .await
            .unwrap();
        manager
            .confirm_destination(session.id, owner)
            .await
            .unwrap();
        manager
            .select_device(session.id, owner, "AA")
            .await
            .unwrap();

        assert_matches!(
            manager.send(session.id, owner).await,
            Err(BadgeSessionError::Rejected(SendRejection::NotConnected))
        );
        assert!(recorder.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_owner_cannot_see_session() {
        let (manager, _recorder) = manager(true, Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let session = manager.open(owner).await.unwrap();

        assert_matches!(
            manager.get(session.id, Uuid::new_v4()).await,
            Err(BadgeSessionError::NotFound(_))
        );
        assert_matches!(
            manager.close(session.id, Uuid::new_v4()).await,
            Err(BadgeSessionError::NotFound(_))
        );
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn close_releases_link_once() {
        let (manager, recorder) = manager(true, Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let session = manager.open(owner).await.unwrap();

        manager.close(session.id, owner).await.unwrap();
        assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
        assert_matches!(
            manager.close(session.id, owner).await,
            Err(BadgeSessionError::NotFound(_))
        );
        assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn idle_sessions_are_reaped() {
        let (manager, recorder) = manager(true, Duration::ZERO);
        let owner = Uuid::new_v4();
        manager.open(owner).await.unwrap();
        manager.open(owner).await.unwrap();

        assert_eq!(manager.reap_idle().await, 2);
        assert_eq!(manager.session_count().await, 0);
        assert_eq!(recorder.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn active_sessions_survive_reaping() {
        let (manager, _recorder) = manager(true, Duration::from_secs(3600));
        manager.open(Uuid::new_v4()).await.unwrap();

        assert_eq!(manager.reap_idle().await, 0);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn shutdown_closes_everything() {
        let (manager, recorder) = manager(true, Duration::from_secs(60));
        manager.open(Uuid::new_v4()).await.unwrap();
        manager.open(Uuid::new_v4()).await.unwrap();

        manager.shutdown_all().await;
        assert_eq!(manager.session_count().await, 0);
        assert_eq!(recorder.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn open_stops_at_per_owner_limit() {
        let (manager, recorder) = manager(true, Duration::from_secs(60));
        let owner = Uuid::new_v4();

        for _ in 0..3 {
            manager.open(owner).await.unwrap();
        }
        for _ in 0..50 {
            assert_matches!(
                manager.open(owner).await,
                Err(BadgeSessionError::LimitReached { limit: 3 })
            );
        }
        assert_eq!(manager.session_count().await, 3);
        assert_eq!(recorder.opened.load(Ordering::SeqCst), 3);

        // Other identities have their own allowance.
        manager.open(Uuid::new_v4()).await.unwrap();
        assert_eq!(manager.session_count().await, 4);
    }

    #[tokio::test]
    async fn closing_a_session_frees_a_slot() {
        let (manager, _recorder) = manager(true, Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let first = manager.open(owner).await.unwrap();
        manager.open(owner).await.unwrap();
        manager.open(owner).await.unwrap();

        manager.close(first.id, owner).await.unwrap();
        manager.open(owner).await.unwrap();
        assert_eq!(manager.session_count().await, 3);
    }

    #[tokio::test]
    async fn concurrent_opens_respect_limit() {
        let (manager, recorder) = manager(true, Duration::from_secs(60));
        let manager = Arc::new(manager);
        let owner = Uuid::new_v4();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.open(owner).await.is_ok() })
            })
            .collect();
        let mut opened = 0;
        for handle in handles {
            if handle.await.unwrap() {
                opened += 1;
            }
        }

        assert_eq!(opened, 3);
        assert_eq!(manager.session_count().await, 3);
        // Links opened past the limit were released again.
        let live = recorder.opened.load(Ordering::SeqCst) - recorder.closed.load(Ordering::SeqCst);
        assert_eq!(live, 3);
    }

    #[tokio::test]
    async fn rejected_transition_leaves_state_unchanged() {
        let (manager, _recorder) = manager(true, Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let session = manager.open(owner).await.unwrap();

        assert_matches!(
            manager.confirm_destination(session.id, owner).await,
            Err(BadgeSessionError::Core(CoreError::Validation(_)))
        );
        let view = manager.get(session.id, owner).await.unwrap();
        assert_eq!(view.session.step(), WizardStep::Intro);
    }
}
