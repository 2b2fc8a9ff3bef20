// vaultwatch-api: Async clients for the vault-room backends (Firebase RTDB, REST gateway, MQTT)

pub mod error;
pub mod firebase;
pub mod gateway;
pub mod models;
pub mod mqtt;
pub mod transport;

pub use error::Error;
pub use firebase::RtdbClient;
pub use gateway::{GatewayClient, GatewayPaths};
pub use models::{Keyed, RawAccessLog, RawEnvReading, RecordSet};
pub use mqtt::{LinkState, MqttPublisher, MqttSettings};
pub use transport::{TlsMode, TransportConfig};
