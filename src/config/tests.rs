use super::load_config;
use super::settings::Settings;

use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Runs `f` with a fresh, empty working directory so no stray
/// `config/default.*` or `.env` file leaks into the test.
fn in_temp_dir<F: FnOnce(&TempDir)>(f: F) {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");
    f(&tmp);
    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.server.session_timeout(), Duration::from_secs(20));
    assert_eq!(settings.broker.inbox_capacity, 100);
    assert_eq!(settings.broker.publish_timeout(), Duration::from_secs(30));
    assert_eq!(settings.broker.sweep_interval(), Duration::from_secs(30));
    assert_eq!(settings.broker.max_in_flight_deliveries, 1024);
    assert_eq!(settings.broker.subscription_ttl(), Duration::from_secs(60));
    assert_eq!(settings.broker.message_ttl(), Duration::from_secs(60));
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn load_config_without_sources_yields_defaults() {
    in_temp_dir(|_| {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.broker.inbox_capacity, 100);
    });
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    in_temp_dir(|_| {
        fs::create_dir_all("config").expect("create config dir");
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [broker]
            inbox_capacity = 10
            sweep_interval_ms = 500
        "#;
        fs::write("config/default.toml", toml).expect("write config file");

        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.session_timeout_ms, 20_000);
        assert_eq!(cfg.broker.inbox_capacity, 10);
        assert_eq!(cfg.broker.sweep_interval_ms, 500);
        assert_eq!(cfg.broker.publish_timeout_ms, 30_000);
    });
}

#[test]
#[serial]
fn load_config_env_overrides_file() {
    in_temp_dir(|_| {
        fs::create_dir_all("config").expect("create config dir");
        fs::write("config/default.toml", "[broker]\ninbox_capacity = 10\n")
            .expect("write config file");

        temp_env::with_vars(
            [
                ("TTLSUB__BROKER__INBOX_CAPACITY", Some("42")),
                ("TTLSUB__LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let cfg = load_config().expect("load_config failed");
                assert_eq!(cfg.broker.inbox_capacity, 42);
                assert_eq!(cfg.logging.level, "debug");
            },
        );
    });
}
