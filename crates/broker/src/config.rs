//! Broker link configuration and address parsing.

use std::time::Duration;

use crate::error::BrokerError;

/// Default broker the badge firmware listens on.
pub const DEFAULT_BROKER_URL: &str = "ws://srv1.ensemble.rodeo:9001";

/// Default topic for provisioning messages.
pub const DEFAULT_TOPIC: &str = "esp32/nfc";

/// Default delay between reconnect attempts, in seconds.
const DEFAULT_RECONNECT_SECS: u64 = 5;

/// Default MQTT keep-alive interval, in seconds.
const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;

/// Broker link configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker URL, e.g. `ws://host:9001` or `mqtt://host:1883`.
    pub url: String,
    /// Topic provisioning messages are published on.
    pub topic: String,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// MQTT keep-alive interval.
    pub keep_alive: Duration,
    /// Prefix for generated MQTT client ids.
    pub client_id_prefix: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BROKER_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_SECS),
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
            client_id_prefix: "ensemble-badge".to_string(),
        }
    }
}

impl BrokerConfig {
    /// Load broker configuration from environment variables.
    ///
    /// | Env Var               | Default                         |
    /// |-----------------------|---------------------------------|
    /// | `MQTT_BROKER_URL`     | `ws://srv1.ensemble.rodeo:9001` |
    /// | `MQTT_TOPIC`          | `esp32/nfc`                     |
    /// | `MQTT_RECONNECT_SECS` | `5`                             |
    ///
    /// # Panics
    ///
    /// Panics if `MQTT_RECONNECT_SECS` is not a valid u64 or the broker URL
    /// cannot be parsed.
    pub fn from_env() -> Self {
        let url = std::env::var("MQTT_BROKER_URL").unwrap_or_else(|_| DEFAULT_BROKER_URL.into());
        if let Err(e) = BrokerAddress::parse(&url) {
            panic!("MQTT_BROKER_URL is invalid: {e}");
        }

        let topic = std::env::var("MQTT_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC.into());

        let reconnect_secs: u64 = std::env::var("MQTT_RECONNECT_SECS")
            .unwrap_or_else(|_| DEFAULT_RECONNECT_SECS.to_string())
            .parse()
            .expect("MQTT_RECONNECT_SECS must be a valid u64");

        Self {
            url,
            topic,
            reconnect_delay: Duration::from_secs(reconnect_secs),
            ..Self::default()
        }
    }
}

/// How the MQTT session is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerTransport {
    /// Plain MQTT over TCP (`mqtt://`, `tcp://`).
    Tcp,
    /// MQTT over WebSocket (`ws://`).
    WebSocket,
}

/// A parsed broker URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub transport: BrokerTransport,
    pub host: String,
    pub port: u16,
    /// The URL as configured; WebSocket connections dial it verbatim.
    pub url: String,
}

impl BrokerAddress {
    /// Parse `scheme://host[:port][/path]`.
    ///
    /// Accepted schemes are `ws`, `mqtt` and `tcp`. Ports default to 80 for
    /// WebSocket and 1883 for TCP.
    pub fn parse(url: &str) -> Result<Self, BrokerError> {
        let invalid = |reason: &str| BrokerError::InvalidAddress {
            address: url.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;

        let (transport, default_port) = match scheme.to_ascii_lowercase().as_str() {
            "ws" => (BrokerTransport::WebSocket, 80),
            "mqtt" | "tcp" => (BrokerTransport::Tcp, 1883),
            "wss" | "mqtts" | "ssl" => return Err(invalid("TLS brokers are not supported")),
            _ => return Err(invalid("unsupported scheme")),
        };

        let authority = rest.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            return Err(invalid("missing host"));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
                (host, port)
            }
            None => (authority, default_port),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            transport,
            host: host.to_string(),
            port,
            url: url.to_string(),
        })
    }
}
