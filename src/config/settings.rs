use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server front end, the broker core and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the bind address and how long a single receive may wait.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub session_timeout_ms: u64,
}

/// Configuration settings for the broker.
///
/// Controls inbox sizing, the delivery wait bound, the sweep cadence and the
/// default lifetimes of subscriptions and messages.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub inbox_capacity: usize,
    /// How long a message may wait behind a full inbox before it is dropped.
    /// Kept below the default subscription TTL: a reader that polls at least
    /// once per session timeout drains well within it.
    pub publish_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    /// Messages that may wait behind full inboxes across the whole registry.
    pub max_in_flight_deliveries: usize,
    pub subscription_ttl_ms: u64,
    pub message_ttl_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl ServerSettings {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

impl BrokerSettings {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn subscription_ttl(&self) -> Duration {
        Duration::from_millis(self.subscription_ttl_ms)
    }

    pub fn message_ttl(&self) -> Duration {
        Duration::from_millis(self.message_ttl_ms)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

/// Partial server settings.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub session_timeout_ms: Option<u64>,
}

/// Partial broker settings.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub inbox_capacity: Option<usize>,
    pub publish_timeout_ms: Option<u64>,
    pub sweep_interval_ms: Option<u64>,
    pub max_in_flight_deliveries: Option<usize>,
    pub subscription_ttl_ms: Option<u64>,
    pub message_ttl_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                session_timeout_ms: 20_000,
            },
            broker: BrokerSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            inbox_capacity: 100,
            publish_timeout_ms: 30_000,
            sweep_interval_ms: 30_000,
            max_in_flight_deliveries: 1024,
            subscription_ttl_ms: 60_000,
            message_ttl_ms: 60_000,
        }
    }
}
