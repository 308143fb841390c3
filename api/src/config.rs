use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub host: IpAddr,
    pub port: u16,
    /// Per-IP request budget for write routes; `None` disables limiting
    pub rate_limit: Option<RateLimit>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub sql_logging: bool,
    /// Create the `users` table on startup if it does not exist
    pub init_schema: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Sustained writes allowed per second, per client IP
    pub per_second: u32,
    pub burst: u32,
}

/// Above this the replenish period would drop below a millisecond
pub const MAX_RATE_PER_SECOND: u32 = 1000;

impl RateLimit {
    /// Time after which one request of the burst is replenished
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.per_second.max(1)
    }
}

impl Config {
    /// Load `.env` (or the given file) and read configuration from the process environment.
    pub fn from_env(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32)?;
        let min_connections = parse_or(&lookup, "DB_MIN_CONNECTIONS", 1u32)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                value: max_connections.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if min_connections > max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS",
                value: min_connections.to_string(),
                reason: format!("exceeds DB_MAX_CONNECTIONS ({})", max_connections),
            });
        }

        let connect_timeout_secs = parse_or(&lookup, "DB_CONNECT_TIMEOUT_SECS", 5u64)?;

        let rate_limit = match lookup("RATE_LIMIT_PER_SECOND") {
            Some(raw) => {
                let per_second: u32 = parse_value("RATE_LIMIT_PER_SECOND", &raw)?;
                if per_second == 0 || per_second > MAX_RATE_PER_SECOND {
                    return Err(ConfigError::Invalid {
                        var: "RATE_LIMIT_PER_SECOND",
                        value: raw,
                        reason: format!("must be between 1 and {}", MAX_RATE_PER_SECOND),
                    });
                }
                let burst = parse_or(&lookup, "RATE_LIMIT_BURST", 10u32)?;
                if burst == 0 {
                    return Err(ConfigError::Invalid {
                        var: "RATE_LIMIT_BURST",
                        value: burst.to_string(),
                        reason: "must be at least 1".to_string(),
                    });
                }
                Some(RateLimit { per_second, burst })
            }
            None => None,
        };

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
                connect_timeout: Duration::from_secs(connect_timeout_secs),
                sql_logging: parse_bool_or(&lookup, "DB_SQL_LOGGING", false)?,
                init_schema: parse_bool_or(&lookup, "DB_INIT_SCHEMA", false)?,
            },
            host: parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "PORT", 8080u16)?,
            rate_limit,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => parse_value(var, &raw),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}
