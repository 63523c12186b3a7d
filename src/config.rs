use std::{env, str::FromStr};

use anyhow::{Context, Result, bail};

#[derive(Clone)]
pub struct Config {
    /// Unset means the in-process store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: tracing::Level,

    pub bootstrap_admin: Option<(String, String)>,
    /// Seconds between scheduled accrual runs; unset disables the scheduler.
    pub accrual_interval_secs: Option<u64>,
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} has invalid value {raw:?}"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 16 {
            bail!("JWT_SECRET must be at least 16 bytes");
        }

        let bootstrap_admin = match (
            optional("BOOTSTRAP_ADMIN_USERNAME"),
            optional("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(user), Some(pass)) => Some((user, pass)),
            (None, None) => None,
            _ => bail!("BOOTSTRAP_ADMIN_USERNAME and BOOTSTRAP_ADMIN_PASSWORD must be set together"),
        };

        let accrual_interval_secs = match optional("ACCRUAL_INTERVAL_SECS") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .with_context(|| format!("ACCRUAL_INTERVAL_SECS has invalid value {raw:?}"))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: optional("DATABASE_URL"),
            jwt_secret,
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", "900")?, // 15 min
            refresh_token_ttl: parsed("REFRESH_TOKEN_TTL", "604800")?, // 7 days

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: parsed("RATE_REGISTER_PER_MIN", "30")?,
            rate_refresh_per_min: parsed("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed("LOG_LEVEL", "debug")?,

            bootstrap_admin,
            accrual_interval_secs,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            jwt_secret: "test-secret-0123456789".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 1000,
            rate_register_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            log_level: tracing::Level::DEBUG,
            bootstrap_admin: None,
            accrual_interval_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: (&str, Option<&str>) = ("JWT_SECRET", Some("a-long-enough-test-secret"));

    #[test]
    fn defaults_apply_when_unset() {
        temp_env::with_vars(
            [
                SECRET,
                ("DATABASE_URL", None),
                ("ACCESS_TOKEN_TTL", None),
                ("API_PREFIX", None),
                ("LOG_LEVEL", None),
                ("ACCRUAL_INTERVAL_SECS", None),
                ("BOOTSTRAP_ADMIN_USERNAME", None),
                ("BOOTSTRAP_ADMIN_PASSWORD", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.database_url.is_none());
                assert_eq!(config.access_token_ttl, 900);
                assert_eq!(config.refresh_token_ttl, 604800);
                assert_eq!(config.api_prefix, "/api");
                assert_eq!(config.log_level, tracing::Level::DEBUG);
                assert!(config.accrual_interval_secs.is_none());
                assert!(config.bootstrap_admin.is_none());
            },
        );
    }

    #[test]
    fn missing_or_short_secret_is_an_error() {
        temp_env::with_var_unset("JWT_SECRET", || {
            assert!(Config::from_env().is_err());
        });
        temp_env::with_var("JWT_SECRET", Some("short"), || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn malformed_numbers_are_errors_not_panics() {
        temp_env::with_vars([SECRET, ("ACCESS_TOKEN_TTL", Some("soon"))], || {
            let err = Config::from_env().err().unwrap();
            assert!(err.to_string().contains("ACCESS_TOKEN_TTL"));
        });
        temp_env::with_vars([SECRET, ("ACCRUAL_INTERVAL_SECS", Some("0"))], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn bootstrap_admin_needs_both_halves() {
        temp_env::with_vars(
            [
                SECRET,
                ("BOOTSTRAP_ADMIN_USERNAME", Some("root")),
                ("BOOTSTRAP_ADMIN_PASSWORD", None),
            ],
            || assert!(Config::from_env().is_err()),
        );
        temp_env::with_vars(
            [
                SECRET,
                ("BOOTSTRAP_ADMIN_USERNAME", Some("root")),
                ("BOOTSTRAP_ADMIN_PASSWORD", Some("change-me-now")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(
                    config.bootstrap_admin,
                    Some(("root".to_string(), "change-me-now".to_string()))
                );
            },
        );
    }
}
