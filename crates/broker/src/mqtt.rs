//! MQTT implementation of [`MessageLink`].
//!
//! [`MqttLink::connect`] creates the client and spawns a task that drives
//! the `rumqttc` event loop. The task flips the link's health flag on
//! ConnAck and on every drop, and after a drop waits a fixed
//! `reconnect_delay` before polling again (which makes `rumqttc` redial).
//! The task stops once a DISCONNECT has been written on close, or when the
//! link is cancelled or dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{BrokerAddress, BrokerConfig, BrokerTransport};
use crate::error::BrokerError;
use crate::link::{LinkConnector, MessageLink};

/// Capacity of the client -> event loop request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// How long [`MqttLink::close`] lets a connected link flush its DISCONNECT.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// How long [`MqttLink::close`] waits for the cancelled task to exit.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A single MQTT connection with automatic fixed-delay reconnection.
#[derive(Debug)]
pub struct MqttLink {
    client: AsyncClient,
    client_id: String,
    health: watch::Receiver<bool>,
    cancel: CancellationToken,
    closed: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttLink {
    /// Open a link to the configured broker.
    ///
    /// Returns immediately; the link reports unhealthy until the broker
    /// acknowledges the connection. Must be called within a Tokio runtime.
    pub fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let address = BrokerAddress::parse(&config.url)?;
        let client_id = format!("{}-{}", config.client_id_prefix, uuid::Uuid::new_v4());

        let mut options = match address.transport {
            // WebSocket transport dials the full URL.
            BrokerTransport::WebSocket => {
                let mut options = MqttOptions::new(&client_id, &address.url, address.port);
                options.set_transport(Transport::Ws);
                options
            }
            BrokerTransport::Tcp => MqttOptions::new(&client_id, &address.host, address.port),
        };
        options.set_keep_alive(config.keep_alive);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let (health_tx, health_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        tracing::info!(
            client_id = %client_id,
            broker = %address.url,
            "Opening MQTT broker link"
        );

        let task = tokio::spawn(drive_event_loop(
            eventloop,
            health_tx,
            config.reconnect_delay,
            cancel.clone(),
            client_id.clone(),
        ));

        Ok(Self {
            client,
            client_id,
            health: health_rx,
            cancel,
            closed: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
        })
    }

    /// Client id this link registered with the broker.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Watch the health flag (e.g. to wait for the first connection).
    pub fn health(&self) -> watch::Receiver<bool> {
        self.health.clone()
    }
}

#[async_trait]
impl MessageLink for MqttLink {
    fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && *self.health.borrow()
    }

    async fn publish(&self, topic: &str, body: &str) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }
        if !*self.health.borrow() {
            return Err(BrokerError::NotConnected);
        }

        self.client
            .publish(topic, QoS::AtLeastOnce, false, body.as_bytes().to_vec())
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        tracing::info!(client_id = %self.client_id, topic, body, "Published provisioning message");
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut task = self.task.lock().await.take();

        // A link without a session has nothing to flush.
        let connected = *self.health.borrow();
        if connected && self.client.try_disconnect().is_ok() {
            if let Some(mut handle) = task.take() {
                let flushed = tokio::time::timeout(DISCONNECT_GRACE, &mut handle).await;
                if flushed.is_err() {
                    tracing::debug!(client_id = %self.client_id, "DISCONNECT not flushed in time");
                    task = Some(handle);
                }
            }
        }

        self.cancel.cancel();
        if let Some(handle) = task {
            let _ = tokio::time::timeout(CLOSE_TIMEOUT, handle).await;
        }
        tracing::info!(client_id = %self.client_id, "MQTT broker link closed");
    }
}

impl Drop for MqttLink {
    fn drop(&mut self) {
        // Covers every exit path that skipped `close`.
        self.cancel.cancel();
    }
}

/// Poll the event loop until cancelled, maintaining the health flag.
async fn drive_event_loop(
    mut eventloop: EventLoop,
    health: watch::Sender<bool>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
    client_id: String,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            polled = eventloop.poll() => match polled {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!(client_id = %client_id, "Connected to MQTT broker");
                    health.send_replace(true);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    tracing::warn!(client_id = %client_id, "MQTT broker sent disconnect");
                    health.send_replace(false);
                }
                // Only produced by `close`; the packet has been written.
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::debug!(client_id = %client_id, "Sent DISCONNECT to MQTT broker");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    let was_connected = health.send_replace(false);
                    if was_connected {
                        tracing::warn!(client_id = %client_id, error = %e, "MQTT link dropped");
                    } else {
                        tracing::debug!(
                            client_id = %client_id,
                            error = %e,
                            "MQTT connect attempt failed"
                        );
                    }
                    tracing::info!(
                        client_id = %client_id,
                        delay_ms = reconnect_delay.as_millis() as u64,
                        "Reconnecting to MQTT broker"
                    );

                    // Wait before the next attempt, respecting cancellation.
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(reconnect_delay) => {}
                    }
                }
            },
        }
    }

    health.send_replace(false);
    tracing::debug!(client_id = %client_id, "MQTT event loop stopped");
}

/// Opens one [`MqttLink`] per call using a shared [`BrokerConfig`].
pub struct MqttConnector {
    config: BrokerConfig,
}

impl MqttConnector {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LinkConnector for MqttConnector {
    async fn open(&self) -> Result<Box<dyn MessageLink>, BrokerError> {
        Ok(Box::new(MqttLink::connect(&self.config)?))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Accept one client, acknowledge its CONNECT, and return every byte it
    /// sends afterwards until the socket closes.
    async fn accept_and_record(listener: TcpListener) -> Vec<u8> {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut connect = [0u8; 256];
        let n = socket.read(&mut connect).await.unwrap();
        assert!(n > 0);
        assert_eq!(connect[0] >> 4, 1, "first packet should be CONNECT");
        socket.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

        let mut after = Vec::new();
        let _ = socket.read_to_end(&mut after).await;
        after
    }

    /// A broker address nothing listens on.
    fn unreachable_config() -> BrokerConfig {
        BrokerConfig {
            url: "mqtt://127.0.0.1:1".to_string(),
            reconnect_delay: Duration::from_millis(50),
            ..BrokerConfig::default()
        }
    }

    #[tokio::test]
    async fn link_to_unreachable_broker_is_unhealthy() {
        let link = MqttLink::connect(&unreachable_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!link.is_healthy());
        assert_matches!(
            link.publish("esp32/nfc", "AA-https://x").await,
            Err(BrokerError::NotConnected)
        );
        link.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_publish() {
        let link = MqttLink::connect(&unreachable_config()).unwrap();
        link.close().await;
        link.close().await;

        assert!(!link.is_healthy());
        assert_matches!(
            link.publish("t", "b").await,
            Err(BrokerError::Closed)
        );
    }

    #[tokio::test]
    async fn close_sends_disconnect_before_dropping_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let broker = tokio::spawn(accept_and_record(listener));

        let config = BrokerConfig {
            url: format!("mqtt://127.0.0.1:{port}"),
            reconnect_delay: Duration::from_millis(50),
            ..BrokerConfig::default()
        };
        let link = MqttLink::connect(&config).unwrap();
        let mut health = link.health();
        tokio::time::timeout(Duration::from_secs(5), health.wait_for(|up| *up))
            .await
            .expect("link should connect to the local broker")
            .unwrap();
        assert!(link.is_healthy());

        link.close().await;

        let after = tokio::time::timeout(Duration::from_secs(5), broker)
            .await
            .expect("socket should close after DISCONNECT")
            .unwrap();
        assert_eq!(after, vec![0xE0, 0x00]);
        assert!(!link.is_healthy());
    }

    #[tokio::test]
    async fn close_of_unconnected_link_returns_promptly() {
        let link = MqttLink::connect(&unreachable_config()).unwrap();
        tokio::time::timeout(Duration::from_millis(500), link.close())
            .await
            .expect("close should not wait for a DISCONNECT that cannot be sent");
    }

    #[tokio::test]
    async fn invalid_address_fails_fast() {
        let config = BrokerConfig {
            url: "http://nope".to_string(),
            ..BrokerConfig::default()
        };
        assert_matches!(
            MqttLink::connect(&config),
            Err(BrokerError::InvalidAddress { .. })
        );
    }

    #[tokio::test]
    async fn connector_opens_independent_links() {
        let connector = MqttConnector::new(unreachable_config());
        let a = connector.open().await.unwrap();
        let b = connector.open().await.unwrap();
        assert!(!a.is_healthy());
        assert!(!b.is_healthy());
        a.close().await;
        b.close().await;
    }

    #[tokio::test]
    async fn client_ids_are_unique() {
        let config = unreachable_config();
        let a = MqttLink::connect(&config).unwrap();
        let b = MqttLink::connect(&config).unwrap();
        assert_ne!(a.client_id(), b.client_id());
        assert!(a.client_id().starts_with("ensemble-badge-"));
    }
}
