use std::str::FromStr;

use bigdecimal::{BigDecimal, One, Zero};
use thiserror::Error;

use crate::services::ledger;

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub admin_emails: Vec<String>,
    pub platform_fee_rate: BigDecimal,
    pub google: GoogleConfig,
    pub calendar_enabled: bool,
    pub smtp: Option<SmtpConfig>,
    pub dataroom_throttle_secs: u64,
    pub meeting_throttle_secs: u64,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Comma-separated emails, lowercased.
fn email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn flag(name: &'static str) -> bool {
    var(name).map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage_backend = match var("STORAGE_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    reason: format!("'{}' is not one of postgres, memory", other),
                })
            }
        };

        let smtp = if flag("SMTP_ENABLED") {
            Some(SmtpConfig {
                host: var("SMTP_HOST").ok_or(ConfigError::Missing("SMTP_HOST"))?,
                port: parsed("SMTP_PORT", 465)?,
                username: var("SMTP_USERNAME").ok_or(ConfigError::Missing("SMTP_USERNAME"))?,
                password: var("SMTP_PASSWORD").ok_or(ConfigError::Missing("SMTP_PASSWORD"))?,
                from_email: var("SMTP_FROM_EMAIL").ok_or(ConfigError::Missing("SMTP_FROM_EMAIL"))?,
                from_name: var("SMTP_FROM_NAME").unwrap_or_else(|| "B2D Ventures".to_string()),
            })
        } else {
            None
        };

        let config = Self {
            storage_backend,
            database_url: var("DATABASE_URL"),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_ttl_hours: parsed("JWT_TTL_HOURS", 24)?,
            admin_emails: var("ADMIN_EMAILS").map(|raw| email_list(&raw)).unwrap_or_default(),
            platform_fee_rate: parsed("PLATFORM_FEE_RATE", ledger::default_fee_rate())?,
            google: GoogleConfig {
                client_id: var("GOOGLE_CLIENT_ID").unwrap_or_default(),
                client_secret: var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
                redirect_uri: var("GOOGLE_REDIRECT_URI").unwrap_or_default(),
                token_url: var("GOOGLE_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            },
            calendar_enabled: flag("CALENDAR_ENABLED"),
            smtp,
            dataroom_throttle_secs: parsed("DATAROOM_THROTTLE_SECS", 86_400)?,
            meeting_throttle_secs: parsed("MEETING_THROTTLE_SECS", 1_800)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                reason: "must be at least 1".into(),
            });
        }
        if self.jwt_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_TTL_HOURS",
                reason: "must be positive".into(),
            });
        }
        if self.platform_fee_rate < BigDecimal::zero() || self.platform_fee_rate >= BigDecimal::one() {
            return Err(ConfigError::Invalid {
                var: "PLATFORM_FEE_RATE",
                reason: "must be in [0, 1)".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            storage_backend: StorageBackend::Memory,
            database_url: None,
            bind_addr: "127.0.0.1:0".into(),
            db_max_connections: 10,
            jwt_secret: "secret".into(),
            jwt_ttl_hours: 24,
            admin_emails: Vec::new(),
            platform_fee_rate: ledger::default_fee_rate(),
            google: GoogleConfig {
                client_id: String::new(),
                client_secret: String::new(),
                redirect_uri: String::new(),
                token_url: DEFAULT_TOKEN_URL.into(),
            },
            calendar_enabled: false,
            smtp: None,
            dataroom_throttle_secs: 86_400,
            meeting_throttle_secs: 1_800,
        }
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_postgres_backend_requires_database_url() {
        let mut config = sample();
        config.storage_backend = StorageBackend::Postgres;
        assert!(matches!(config.validate(), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_fee_rate_bounds() {
        let mut config = sample();
        config.platform_fee_rate = BigDecimal::one();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var: "PLATFORM_FEE_RATE", .. })
        ));
        config.platform_fee_rate = BigDecimal::zero();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_admin_emails_are_split_and_lowercased() {
        assert_eq!(
            email_list(" Ops@B2D.example, ,cto@b2d.example "),
            vec!["ops@b2d.example".to_string(), "cto@b2d.example".to_string()]
        );
        assert!(email_list(",").is_empty());
    }
}
