use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::origination::IntakePolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub intake: IntakePolicy,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database = DatabaseConfig {
            url: env::var("APP_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://loan-origination.db".to_string()),
            max_connections: numeric_var("APP_DATABASE_MAX_CONNECTIONS", 5)?,
        };
        if database.max_connections == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "APP_DATABASE_MAX_CONNECTIONS",
            });
        }

        let defaults = IntakePolicy::default();
        let intake = IntakePolicy {
            min_amount: numeric_var("APP_MIN_LOAN_AMOUNT", defaults.min_amount)?,
            max_amount: numeric_var("APP_MAX_LOAN_AMOUNT", defaults.max_amount)?,
            max_term_months: numeric_var("APP_MAX_TERM_MONTHS", defaults.max_term_months)?,
        };
        if intake.min_amount > intake.max_amount {
            return Err(ConfigError::InvertedAmountRange {
                min: intake.min_amount,
                max: intake.max_amount,
            });
        }

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            database,
            intake,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn numeric_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Where applications are persisted.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    InvertedAmountRange { min: u64, max: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a positive whole number")
            }
            ConfigError::InvertedAmountRange { min, max } => write!(
                f,
                "APP_MIN_LOAN_AMOUNT ({min}) must not exceed APP_MAX_LOAN_AMOUNT ({max})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvertedAmountRange { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATABASE_URL",
            "APP_DATABASE_MAX_CONNECTIONS",
            "APP_MIN_LOAN_AMOUNT",
            "APP_MAX_LOAN_AMOUNT",
            "APP_MAX_TERM_MONTHS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "sqlite://loan-origination.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.intake, IntakePolicy::default());
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_intake_limits_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MIN_LOAN_AMOUNT", "5000");
        env::set_var("APP_MAX_TERM_MONTHS", "120");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.intake.min_amount, 5000);
        assert_eq!(config.intake.max_term_months, 120);
        assert_eq!(config.intake.max_amount, IntakePolicy::default().max_amount);
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_limits() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAX_LOAN_AMOUNT", "lots");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { var }) => assert_eq!(var, "APP_MAX_LOAN_AMOUNT"),
            other => panic!("expected invalid number error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_inverted_amount_range() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MIN_LOAN_AMOUNT", "900000");
        env::set_var("APP_MAX_LOAN_AMOUNT", "1000");
        match AppConfig::load() {
            Err(ConfigError::InvertedAmountRange { min, max }) => {
                assert_eq!((min, max), (900000, 1000));
            }
            other => panic!("expected inverted range error, got {other:?}"),
        }
        reset_env();
    }
}
