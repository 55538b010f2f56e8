use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Client registration for an external identity provider.
#[derive(Debug, Clone)]
pub struct ExternalProviderConfig {
    /// Scheme name shown on the login page and used in `provider=` parameters.
    pub name: String,
    pub client_id: String,
    pub authorize_url: String,
}

impl ExternalProviderConfig {
    pub fn google(client_id: String) -> Self {
        Self {
            name: "Google".to_string(),
            client_id,
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        }
    }
}

/// Rules every new password has to satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub required_unique_chars: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 10,
            required_unique_chars: 3,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        }
    }
}

pub struct Config {
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// Scheme and authority used when building absolute links for emails.
    pub public_base_url: String,
    pub session_secret: String,
    pub token_lifetime_hours: i64,
    pub password_policy: PasswordPolicy,
    pub external_providers: Vec<ExternalProviderConfig>,
    /// Accounts registered with one of these emails are created in the Admin role.
    pub admin_emails: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let server_port = parse_var("SERVER_PORT", 8080)?;
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| AppError::Configuration("SESSION_SECRET must be set".into()))?;

        let defaults = PasswordPolicy::default();
        let password_policy = PasswordPolicy {
            required_length: parse_var("PASSWORD_REQUIRED_LENGTH", defaults.required_length)?,
            required_unique_chars: parse_var(
                "PASSWORD_REQUIRED_UNIQUE_CHARS",
                defaults.required_unique_chars,
            )?,
            ..defaults
        };

        let mut external_providers = Vec::new();
        if let Ok(client_id) = env::var("GOOGLE_CLIENT_ID") {
            external_providers.push(ExternalProviderConfig::google(client_id));
        }

        let admin_emails = env::var("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            server_port,
            server_host,
            public_base_url,
            session_secret,
            token_lifetime_hours: parse_var("TOKEN_LIFETIME_HOURS", 24)?,
            password_policy,
            external_providers,
            admin_emails,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}
