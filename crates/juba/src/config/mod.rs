use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::jobs::{ApplicationPolicy, DispatchPolicy};

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

/// Top-level configuration for the marketplace service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub rate_limit: RateLimitConfig,
    pub marketplace: MarketplaceConfig,
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

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let per_minute = env::var("APP_RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(ConfigError::InvalidRateLimit)?;
        let trust_forwarded_for = read_flag("APP_TRUST_FORWARDED_FOR", false)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            rate_limit: RateLimitConfig {
                per_minute,
                trust_forwarded_for,
            },
            marketplace: MarketplaceConfig::from_env()?,
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Per-client request budget for the public browse routes.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub per_minute: NonZeroU32,
    /// Key buckets on the first `x-forwarded-for` hop. Only safe behind a
    /// proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

/// Product switches for the job lifecycle and the notification dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MarketplaceConfig {
    pub policy: ApplicationPolicy,
    pub dispatch: DispatchPolicy,
}

impl MarketplaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = ApplicationPolicy::default();
        let policy = ApplicationPolicy {
            allow_duplicate_applications: read_flag(
                "JUBA_ALLOW_DUPLICATE_APPLICATIONS",
                defaults.allow_duplicate_applications,
            )?,
            max_active_jobs_per_client: read_optional_u32("JUBA_MAX_ACTIVE_JOBS_PER_CLIENT")?,
            allow_complete_from_posted: read_flag(
                "JUBA_ALLOW_COMPLETE_FROM_POSTED",
                defaults.allow_complete_from_posted,
            )?,
        };

        let dispatch_defaults = DispatchPolicy::default();
        let attempts = read_optional_u32("JUBA_NOTIFICATION_ATTEMPTS")?
            .unwrap_or(dispatch_defaults.attempts)
            .max(1);
        let backoff = read_optional_u32("JUBA_NOTIFICATION_BACKOFF_MS")?
            .map(|millis| Duration::from_millis(u64::from(millis)))
            .unwrap_or(dispatch_defaults.backoff);

        Ok(Self {
            policy,
            dispatch: DispatchPolicy { attempts, backoff },
        })
    }
}

fn read_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidSetting { key, value: raw }),
        },
    }
}

fn read_optional_u32(key: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(None),
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidSetting { key, value: raw }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRateLimit,
    InvalidSetting { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRateLimit => {
                write!(f, "APP_RATE_LIMIT_PER_MINUTE must be a positive integer")
            }
            ConfigError::InvalidSetting { key, value } => {
                write!(f, "{key} has an unsupported value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidRateLimit
            | ConfigError::InvalidSetting { .. } => None,
        }
    }
}
