//! # Service Configuration
//!
//! Purpose: Load every tunable of the service from the environment exactly
//! once at startup and hand the resulting struct to constructors by
//! reference; operation code never performs ambient lookups.
//!
//! ## Design Principles
//!
//! 1. **Explicit Wiring**: Configuration flows through constructors, not
//!    globals.
//! 2. **Forgiving Parsing**: Unparseable numeric variables fall back to
//!    their defaults instead of aborting startup.
//! 3. **Store-Agnostic Names**: Variables describe the backing store role,
//!    not a vendor.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Connection settings for the backing document store.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Store host name or address.
    pub host: String,
    /// Store TCP port.
    pub port: u16,
    /// Optional username sent alongside the password on dial.
    pub username: Option<String>,
    /// Optional password; when set, dialing authenticates first.
    pub password: Option<String>,
    /// Maximum number of idle connections retained by the pool.
    pub max_idle: usize,
    /// Idle connections older than this are discarded on next borrow.
    pub idle_timeout: Duration,
}

impl StoreSettings {
    /// Returns the `host:port` dial address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            max_idle: 3,
            idle_timeout: Duration::from_secs(240),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing store connection settings.
    pub store: StoreSettings,
    /// Deadline attached to each inbound request.
    pub request_timeout: Duration,
    /// HTTP listen address.
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreSettings::default(),
            request_timeout: Duration::from_secs(2),
            listen_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    /// Reads the configuration from the environment, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            store: StoreSettings {
                host: env::var("STORE_HOST").unwrap_or(defaults.store.host),
                port: parse_or("STORE_PORT", env::var("STORE_PORT").ok(), defaults.store.port),
                username: env::var("STORE_USERNAME").ok().filter(|v| !v.is_empty()),
                password: env::var("STORE_PASSWORD").ok().filter(|v| !v.is_empty()),
                max_idle: parse_or(
                    "STORE_MAX_IDLE_CONNECTIONS",
                    env::var("STORE_MAX_IDLE_CONNECTIONS").ok(),
                    defaults.store.max_idle,
                ),
                idle_timeout: Duration::from_secs(parse_or(
                    "STORE_IDLE_TIMEOUT_SECS",
                    env::var("STORE_IDLE_TIMEOUT_SECS").ok(),
                    defaults.store.idle_timeout.as_secs(),
                )),
            },
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                env::var("REQUEST_TIMEOUT_SECS").ok(),
                defaults.request_timeout.as_secs(),
            )),
            listen_addr: env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
        }
    }
}

/// Parses an optional variable value, keeping the default when the value is
/// absent or malformed.
fn parse_or<T: FromStr + Copy>(name: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                eprintln!("ignoring unparseable {name}={raw}");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_settings() {
        let settings = StoreSettings::default();
        assert_eq!(settings.addr(), "127.0.0.1:6379");
        assert_eq!(settings.max_idle, 3);
        assert_eq!(settings.idle_timeout, Duration::from_secs(240));
    }

    #[test]
    fn default_request_timeout() {
        let config = Config::default();
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
    }

    #[test]
    fn parses_present_value() {
        assert_eq!(parse_or("PORT", Some("9000".to_string()), 6379u16), 9000);
    }

    #[test]
    fn falls_back_on_garbage() {
        assert_eq!(parse_or("PORT", Some("not-a-port".to_string()), 6379u16), 6379);
        assert_eq!(parse_or::<u16>("PORT", None, 6379), 6379);
    }
}
