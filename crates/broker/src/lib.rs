//! Message broker link used to deliver badge provisioning messages.
//!
//! Provides address parsing and configuration, the [`MessageLink`] /
//! [`LinkConnector`] abstractions, and their MQTT implementation
//! ([`MqttLink`], [`MqttConnector`]) with a health flag and fixed-delay
//! reconnection.

pub mod config;
pub mod error;
pub mod link;
pub mod mqtt;

pub use config::{BrokerAddress, BrokerConfig, BrokerTransport};
pub use error::BrokerError;
pub use link::{LinkConnector, MessageLink};
pub use mqtt::{MqttConnector, MqttLink};
