//! The `config` module loads server, broker and logging settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `config/default.{toml,json,yaml}` file, then `TTLSUB__`-prefixed
//! environment variables (`TTLSUB__BROKER__INBOX_CAPACITY=50`). A `.env`
//! file is read into the environment before anything else.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, LoggingSettings, ServerSettings, Settings};

const ENV_PREFIX: &str = "TTLSUB";

/// Loads the configuration from the default file and environment variables
/// and merges it over `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let server = partial.server.as_ref();
    let broker = partial.broker.as_ref();
    let logging = partial.logging.as_ref();

    Settings {
        server: ServerSettings {
            host: server
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server.and_then(|s| s.port).unwrap_or(default.server.port),
            session_timeout_ms: server
                .and_then(|s| s.session_timeout_ms)
                .unwrap_or(default.server.session_timeout_ms),
        },
        broker: BrokerSettings {
            inbox_capacity: broker
                .and_then(|b| b.inbox_capacity)
                .unwrap_or(default.broker.inbox_capacity),
            publish_timeout_ms: broker
                .and_then(|b| b.publish_timeout_ms)
                .unwrap_or(default.broker.publish_timeout_ms),
            sweep_interval_ms: broker
                .and_then(|b| b.sweep_interval_ms)
                .unwrap_or(default.broker.sweep_interval_ms),
            max_in_flight_deliveries: broker
                .and_then(|b| b.max_in_flight_deliveries)
                .unwrap_or(default.broker.max_in_flight_deliveries),
            subscription_ttl_ms: broker
                .and_then(|b| b.subscription_ttl_ms)
                .unwrap_or(default.broker.subscription_ttl_ms),
            message_ttl_ms: broker
                .and_then(|b| b.message_ttl_ms)
                .unwrap_or(default.broker.message_ttl_ms),
        },
        logging: LoggingSettings {
            level: logging
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
    }
}

#[cfg(test)]
mod tests;
