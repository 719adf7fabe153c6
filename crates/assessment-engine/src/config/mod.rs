use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::assembly::{JobFitConfig, SelectorConfig};
use crate::resilience::BreakerConfig;

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
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig::from_env()?,
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

/// Scoring and assembly tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub selector: SelectorConfig,
    pub job_fit: JobFitConfig,
    pub breaker: BreakerConfig,
    pub cache_capacity: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selector: SelectorConfig::default(),
            job_fit: JobFitConfig::default(),
            breaker: BreakerConfig::default(),
            cache_capacity: 1_000,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let probation_percentage =
            parse_var("PROBATION_PERCENTAGE", defaults.selector.probation_percentage)?;
        if probation_percentage > 100 {
            return Err(ConfigError::OutOfRange {
                key: "PROBATION_PERCENTAGE",
            });
        }
        let default_strictness =
            parse_var("DEFAULT_STRICTNESS", defaults.job_fit.default_strictness)?;
        if default_strictness > 100 {
            return Err(ConfigError::OutOfRange {
                key: "DEFAULT_STRICTNESS",
            });
        }
        let fuzzy_threshold = parse_var("FUZZY_MATCH_THRESHOLD", defaults.job_fit.fuzzy_threshold)?;
        if !(0.0..=1.0).contains(&fuzzy_threshold) {
            return Err(ConfigError::OutOfRange {
                key: "FUZZY_MATCH_THRESHOLD",
            });
        }
        let failure_rate_threshold =
            parse_var("BREAKER_FAILURE_RATE", defaults.breaker.failure_rate_threshold)?;
        if !(failure_rate_threshold > 0.0 && failure_rate_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                key: "BREAKER_FAILURE_RATE",
            });
        }
        let window_size = parse_var("BREAKER_WINDOW", defaults.breaker.window_size)?;
        if window_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "BREAKER_WINDOW",
            });
        }

        Ok(Self {
            selector: SelectorConfig {
                psychometrics_enabled: parse_bool_var(
                    "PSYCHOMETRICS_ENABLED",
                    defaults.selector.psychometrics_enabled,
                )?,
                probation_percentage,
            },
            job_fit: JobFitConfig {
                passport_max_age_days: parse_var(
                    "PASSPORT_MAX_AGE_DAYS",
                    defaults.job_fit.passport_max_age_days,
                )?,
                default_strictness,
                fuzzy_threshold,
            },
            breaker: BreakerConfig {
                failure_rate_threshold,
                window_size,
                minimum_calls: parse_var("BREAKER_MIN_CALLS", defaults.breaker.minimum_calls)?,
                open_seconds: parse_var("BREAKER_OPEN_SECONDS", defaults.breaker.open_seconds)?,
                half_open_probes: parse_var(
                    "BREAKER_HALF_OPEN_PROBES",
                    defaults.breaker.half_open_probes,
                )?,
            },
            cache_capacity: parse_var("CACHE_CAPACITY", defaults.cache_capacity)?,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

fn parse_bool_var(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    OutOfRange { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an unparseable value '{value}'")
            }
            ConfigError::OutOfRange { key } => write!(f, "{key} is outside its allowed range"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::OutOfRange { .. } => None,
        }
    }
}
