//! Environment-driven runtime configuration.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use linkletter_core::AppError;
use tracing_subscriber::EnvFilter;

/// Secret used when `SUBSCRIBERS_SECRET` is not configured. Fine for local
/// development, useless in production.
const FALLBACK_SECRET: &str = "SUBSCRIBERS_SECRET";

/// SMTP transport settings.
#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

/// Which email transport to wire up.
#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

/// Fully parsed API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    /// Base URL of the host CMS whose collection-auth endpoints we delegate
    /// to.
    pub server_url: String,
    /// Server secret for token hashing and unsubscribe signatures.
    pub subscribers_secret: String,
    /// Default verify-page URL embedded in emailed links.
    pub verify_url: String,
    /// Unsubscribe-page URL; unset disables the email footer.
    pub unsubscribe_url: Option<String>,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub email_provider: EmailProviderConfig,
}

impl ApiConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let server_url =
            env::var("SERVER_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let subscribers_secret = match env::var("SUBSCRIBERS_SECRET") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => {
                tracing::warn!(
                    "SUBSCRIBERS_SECRET is not set; using an insecure development default"
                );
                FALLBACK_SECRET.to_owned()
            }
        };

        let verify_url =
            env::var("VERIFY_URL").unwrap_or_else(|_| format!("{frontend_url}/verify"));
        let unsubscribe_url = env::var("UNSUBSCRIBE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let email_provider = match env::var("EMAIL_PROVIDER")
            .unwrap_or_else(|_| "console".to_owned())
            .as_str()
        {
            "console" => EmailProviderConfig::Console,
            "smtp" => {
                let port = required_non_empty_env("SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;
                EmailProviderConfig::Smtp(SmtpRuntimeConfig {
                    host: required_non_empty_env("SMTP_HOST")?,
                    port,
                    username: required_non_empty_env("SMTP_USERNAME")?,
                    password: required_non_empty_env("SMTP_PASSWORD")?,
                    from_address: required_non_empty_env("SMTP_FROM_ADDRESS")?,
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "EMAIL_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        Ok(Self {
            migrate_only,
            database_url,
            server_url,
            subscribers_secret,
            verify_url,
            unsubscribe_url,
            frontend_url,
            api_host,
            api_port,
            email_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
