//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOXSET_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BOXSET_ADMIN_CREDENTIAL` - Bearer credential for the stats endpoint (min 16 chars, random)
//! - `BOXSET_SENDER_EMAIL` - From address of every email
//! - `BOXSET_BASE_LINK_URL` - Public URL the magic links point into
//! - `SMTP_HOST` - SMTP relay hostname
//! - `SMTP_USERNAME` - SMTP username
//! - `SMTP_PASSWORD` - SMTP password
//!
//! ## Optional
//! - `BOXSET_SENDER_NAME` - Sender display name and subject prefix (default: Apocalypse)
//! - `BOXSET_HOST` - Bind address (default: 127.0.0.1)
//! - `BOXSET_PORT` - Listen port (default: 3000)
//! - `BOXSET_CORS_ORIGIN` - Origin allowed to call the API from a browser
//! - `BOXSET_OUTBOX_POLL_SECS` - Outbox poll interval (default: 30)
//! - `BOXSET_OUTBOX_MAX_ATTEMPTS` - Delivery attempts per email (default: 5)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::services::credential::LinkBuilder;
use crate::state::ServiceSettings;

const OUTBOX_BATCH_SIZE: i64 = 50;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer credential for the stats endpoint
    pub admin_credential: SecretString,
    /// Public URL magic links point into
    pub base_link_url: Url,
    /// Browser origin allowed by CORS, if any
    pub cors_origin: Option<String>,
    /// SMTP and sender configuration
    pub email: EmailConfig,
    /// Outbox dispatcher tuning
    pub outbox: OutboxConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// SMTP email configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Sender display name (From header and subject prefix)
    pub from_name: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .finish()
    }
}

/// Outbox dispatcher configuration.
#[derive(Debug, Clone, Copy)]
pub struct OutboxConfig {
    /// Time between polls when nothing wakes the dispatcher
    pub poll_interval: Duration,
    /// Delivery attempts before an email is abandoned
    pub max_attempts: i32,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = database_url()?;
        let host: IpAddr = parsed_or("BOXSET_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port: u16 = parsed_or("BOXSET_PORT", 3000)?;
        let admin_credential = ADMIN_CREDENTIAL_POLICY.load("BOXSET_ADMIN_CREDENTIAL")?;
        let base_link_url =
            parse_base_link_url(&required("BOXSET_BASE_LINK_URL")?, "BOXSET_BASE_LINK_URL")?;
        let cors_origin = optional("BOXSET_CORS_ORIGIN");

        let email = EmailConfig::from_env()?;
        let outbox = OutboxConfig::from_env()?;

        let sentry_dsn = optional("SENTRY_DSN");
        let sentry_environment = optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parsed_or("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parsed_or("SENTRY_TRACES_SAMPLE_RATE", 0.1)?;

        Ok(Self {
            database_url,
            host,
            port,
            admin_credential,
            base_link_url,
            cors_origin,
            email,
            outbox,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The subset of configuration the handlers use.
    #[must_use]
    pub fn settings(&self) -> ServiceSettings {
        ServiceSettings {
            admin_credential: self.admin_credential.clone(),
            sender_name: self.email.from_name.clone(),
            links: LinkBuilder::new(self.base_link_url.clone()),
            outbox_batch_size: OUTBOX_BATCH_SIZE,
            outbox_max_attempts: self.outbox.max_attempts,
        }
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: required("SMTP_HOST")?,
            smtp_port: parsed_or("SMTP_PORT", 587)?,
            smtp_username: required("SMTP_USERNAME")?,
            smtp_password: SMTP_PASSWORD_POLICY.load("SMTP_PASSWORD")?,
            from_address: required("BOXSET_SENDER_EMAIL")?,
            from_name: optional("BOXSET_SENDER_NAME").unwrap_or_else(|| "Apocalypse".to_string()),
        })
    }
}

impl OutboxConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let poll_secs: u64 = parsed_or("BOXSET_OUTBOX_POLL_SECS", 30)?;
        let max_attempts: i32 = parsed_or("BOXSET_OUTBOX_MAX_ATTEMPTS", 5)?;

        if poll_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BOXSET_OUTBOX_POLL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if max_attempts < 1 {
            return Err(ConfigError::InvalidEnvVar(
                "BOXSET_OUTBOX_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            poll_interval: Duration::from_secs(poll_secs),
            max_attempts,
        })
    }
}

/// A required variable; blank counts as missing.
fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// An optional variable, `None` when unset or blank.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse `key` if set, else `default`.
fn parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// `BOXSET_DATABASE_URL`, then the conventional `DATABASE_URL`.
fn database_url() -> Result<SecretString, ConfigError> {
    optional("BOXSET_DATABASE_URL")
        .or_else(|| optional("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("BOXSET_DATABASE_URL".to_string()))
}

/// Magic links are absolute http(s) URLs.
fn parse_base_link_url(raw: &str, var_name: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// What a secret must satisfy before the service starts with it.
#[derive(Debug, Clone, Copy)]
struct SecretPolicy {
    min_len: usize,
    /// Shannon entropy floor in bits per character; 0 disables the check.
    min_bits_per_char: f64,
    /// Rejected when contained anywhere in the lowercased value.
    markers: &'static [&'static str],
}

/// The stats bearer credential is typed by hand into dashboards, so it
/// gets the strict policy.
const ADMIN_CREDENTIAL_POLICY: SecretPolicy = SecretPolicy {
    min_len: 16,
    min_bits_per_char: 3.0,
    markers: &["changeme", "change-me", "placeholder", "example", "your-", "boxset", "admin"],
};

/// SMTP passwords are issued by the relay; only leftovers from a sample
/// `.env` are refused.
const SMTP_PASSWORD_POLICY: SecretPolicy = SecretPolicy {
    min_len: 1,
    min_bits_per_char: 0.0,
    markers: &["changeme", "change-me", "placeholder", "your-smtp", "smtp-password"],
};

impl SecretPolicy {
    fn check(&self, var_name: &str, value: &str) -> Result<(), ConfigError> {
        let insecure =
            |reason: String| Err(ConfigError::InsecureSecret(var_name.to_string(), reason));

        let chars = value.chars().count();
        if chars < self.min_len {
            return insecure(format!("needs at least {} characters, has {chars}", self.min_len));
        }
        let lower = value.to_lowercase();
        if let Some(marker) = self.markers.iter().find(|m| lower.contains(*m)) {
            return insecure(format!("looks like a sample value (contains '{marker}')"));
        }
        let bits = bits_per_char(value);
        if bits < self.min_bits_per_char {
            return insecure(format!(
                "too predictable ({bits:.2} bits/char, want {:.1}); use `openssl rand -hex 24`",
                self.min_bits_per_char
            ));
        }
        Ok(())
    }

    /// Read `key` and hold it to this policy.
    fn load(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = required(key)?;
        self.check(key, &value)?;
        Ok(SecretString::from(value))
    }
}

/// Shannon entropy of the character distribution.
fn bits_per_char(value: &str) -> f64 {
    let mut counts: BTreeMap<char, u32> = BTreeMap::new();
    for c in value.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!(bits_per_char("zzzz").abs() < f64::EPSILON);
        assert!((bits_per_char("ab") - 1.0).abs() < 0.01);
        assert!((bits_per_char("abcd") - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_admin_credential_policy() {
        let check = |v: &str| ADMIN_CREDENTIAL_POLICY.check("BOXSET_ADMIN_CREDENTIAL", v);

        assert!(check("9f2c41d8e07ab3561c2e").is_ok());
        assert!(matches!(check("9f2c41d8"), Err(ConfigError::InsecureSecret(_, _))));
        assert!(matches!(check("changeme-9f2c41d8e07a"), Err(ConfigError::InsecureSecret(_, _))));
        assert!(matches!(check("Boxset-Stats-2026!!"), Err(ConfigError::InsecureSecret(_, _))));
        assert!(matches!(check("abababababababababab"), Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_smtp_password_policy_is_lenient() {
        let check = |v: &str| SMTP_PASSWORD_POLICY.check("SMTP_PASSWORD", v);

        assert!(check("hunter22").is_ok());
        assert!(check("abcdabcdabcdabcd").is_ok());
        assert!(check("your-smtp-password").is_err());
        assert!(check("").is_err());
    }

    #[test]
    fn test_base_link_url_must_be_http() {
        assert!(parse_base_link_url("https://boxset.example.org/", "TEST_URL").is_ok());
        assert!(parse_base_link_url("mailto:ops@example.org", "TEST_URL").is_err());
        assert!(parse_base_link_url("/relative", "TEST_URL").is_err());
    }

    #[test]
    fn test_settings_carry_sender_and_links() {
        let config = ServiceConfig {
            database_url: SecretString::from("postgres://localhost/test".to_string()),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            admin_credential: SecretString::from("aB3$xY9!mK2@nL5#".to_string()),
            base_link_url: Url::parse("https://boxset.example.org").unwrap(),
            cors_origin: None,
            email: EmailConfig {
                smtp_host: "smtp.example.org".to_string(),
                smtp_port: 587,
                smtp_username: "mailer".to_string(),
                smtp_password: SecretString::from("pw".to_string()),
                from_address: "contact@example.org".to_string(),
                from_name: "Apocalypse".to_string(),
            },
            outbox: OutboxConfig {
                poll_interval: Duration::from_secs(30),
                max_attempts: 5,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        assert_eq!(config.socket_addr().port(), 3000);
        let settings = config.settings();
        assert_eq!(settings.sender_name, "Apocalypse");
        assert_eq!(settings.outbox_max_attempts, 5);
        assert!(!format!("{:?}", config.email).contains("pw\""));
    }
}
