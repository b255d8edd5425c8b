use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub session_duration_hours: u64,
    pub cache_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub bcrypt_cost: u32,
    pub run_migrations: bool,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_value<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

/// Whole hours, written either bare (`24`) or with an `h` suffix (`24h`).
fn parse_hours(name: &'static str, value: String) -> Result<u64, ConfigError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_suffix('h').unwrap_or(trimmed);
    match digits.parse() {
        Ok(hours) => Ok(hours),
        Err(_) => Err(ConfigError::Invalid { name, value }),
    }
}

fn optional<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_value(name, value),
        Err(_) => Ok(default),
    }
}

fn optional_hours(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_hours(name, value),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: optional("SERVER_PORT", 8080)?,
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api/v1".into()),
            session_duration_hours: optional_hours("SESSION_DURATION", 24)?,
            cache_timeout_ms: optional("CACHE_TIMEOUT_MS", 3000)?,
            request_timeout_secs: optional("REQUEST_TIMEOUT_SECS", 30)?,
            rate_limit_window_secs: optional("RATE_LIMIT_WINDOW", 60)?,
            rate_limit_requests: optional("RATE_LIMIT_REQUESTS", 100)?,
            bcrypt_cost: optional("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            run_migrations: optional("RUN_MIGRATIONS", true)?,
        })
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session_duration_hours * 3600)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_accept_suffix() {
        assert_eq!(parse_hours("SESSION_DURATION", "24".into()).unwrap(), 24);
        assert_eq!(parse_hours("SESSION_DURATION", " 48h ".into()).unwrap(), 48);
        assert!(parse_hours("SESSION_DURATION", "h".into()).is_err());
        assert!(parse_hours("SESSION_DURATION", "1d".into()).is_err());
    }

    #[test]
    fn test_plain_values_reject_suffix() {
        assert_eq!(parse_value::<u16>("SERVER_PORT", " 8080 ".into()).unwrap(), 8080);
        assert!(matches!(
            parse_value::<u16>("SERVER_PORT", "8080h".into()),
            Err(ConfigError::Invalid { name: "SERVER_PORT", .. })
        ));
        assert!(parse_value::<bool>("RUN_MIGRATIONS", "yes".into()).is_err());
    }
}
