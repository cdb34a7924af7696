use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::database::service_account::ServiceAccountKey;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub enum SheetBackend {
    Google {
        spreadsheet_id: String,
        credentials: ServiceAccountKey,
        api_url: Option<String>,
    },
    /// Keeps the sheet in process memory; for local runs without credentials.
    Memory,
}

/// Header names on the attendee tab. Matching is exact.
#[derive(Debug, Clone)]
pub struct SheetColumns {
    pub name: String,
    pub contact: String,
    pub location: String,
    pub gender: String,
    pub followup_owner: String,
}

impl Default for SheetColumns {
    fn default() -> Self {
        Self {
            name: "Name".into(),
            contact: "Contact".into(),
            location: "Location".into(),
            gender: "Gender".into(),
            followup_owner: "Followup owner".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS (usually port 465); otherwise STARTTLS.
    pub secure: bool,
    pub user: String,
    pub pass: String,
    pub contact_email: String,
}

#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: SheetBackend,
    pub attendee_sheet: String,
    pub columns: SheetColumns,
    pub event_column: String,
    pub default_country_code: String,
    pub admin: Option<AdminCredentials>,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    /// Reads and validates everything once; handlers never touch the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match var("SHEETS_BACKEND").as_deref().unwrap_or("google") {
            "google" => SheetBackend::Google {
                spreadsheet_id: required("GOOGLE_SHEET_ID")?,
                credentials: load_credentials()?,
                api_url: var("SHEETS_API_URL"),
            },
            "memory" => {
                warn!("SHEETS_BACKEND=memory, attendee data will not be persisted");
                SheetBackend::Memory
            }
            other => {
                return Err(ConfigError::Invalid {
                    key: "SHEETS_BACKEND",
                    reason: format!("expected google or memory, got {other}"),
                })
            }
        };

        let admin = match (var("ADMIN_USERNAME"), var("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            _ => {
                warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set, organizer login is disabled");
                None
            }
        };

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", 587)?,
                secure: parse_or("SMTP_SECURE", false)?,
                user: required("SMTP_USER")?,
                pass: required("SMTP_PASS")?,
                contact_email: required("CONTACT_EMAIL")?,
            }),
            None => {
                info!("SMTP_HOST not set, registration mail is disabled");
                None
            }
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", 3000)?,
            backend,
            attendee_sheet: var("ATTENDEE_SHEET").unwrap_or_else(|| "MYF attendees".to_string()),
            columns: SheetColumns::default(),
            event_column: var("EVENT_COLUMN").unwrap_or_else(|| "Nov MYF".to_string()),
            default_country_code: normalize_country_code(
                &var("DEFAULT_COUNTRY_CODE").unwrap_or_else(|| "+91".to_string()),
            )
            .ok_or(ConfigError::Invalid {
                key: "DEFAULT_COUNTRY_CODE",
                reason: "expected digits, optionally prefixed with +".into(),
            })?,
            admin,
            smtp,
        })
    }

    /// A configuration for the in-memory backend with every default applied.
    pub fn local() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            backend: SheetBackend::Memory,
            attendee_sheet: "MYF attendees".into(),
            columns: SheetColumns::default(),
            event_column: "Nov MYF".into(),
            default_country_code: "+91".into(),
            admin: None,
            smtp: None,
        }
    }
}

/// `91`, `+91` and ` +91 ` all become `+91`.
pub fn normalize_country_code(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches('+');
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("+{digits}"))
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    var(key).ok_or(ConfigError::Missing(key))
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn load_credentials() -> Result<ServiceAccountKey, ConfigError> {
    let raw = match (
        var("GOOGLE_SHEETS_CREDENTIALS"),
        var("GOOGLE_SHEETS_CREDENTIALS_FILE"),
    ) {
        (Some(json), _) => json,
        (None, Some(path)) => read_to_string(&path).map_err(|e| ConfigError::Invalid {
            key: "GOOGLE_SHEETS_CREDENTIALS_FILE",
            reason: format!("{path}: {e}"),
        })?,
        (None, None) => return Err(ConfigError::Missing("GOOGLE_SHEETS_CREDENTIALS")),
    };

    ServiceAccountKey::from_json(&raw).map_err(|e| ConfigError::Invalid {
        key: "GOOGLE_SHEETS_CREDENTIALS",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_codes_are_normalized() {
        assert_eq!(normalize_country_code("91").as_deref(), Some("+91"));
        assert_eq!(normalize_country_code(" +1 ").as_deref(), Some("+1"));
        assert_eq!(normalize_country_code("+880").as_deref(), Some("+880"));
        assert_eq!(normalize_country_code(""), None);
        assert_eq!(normalize_country_code("+9a"), None);
    }

    #[test]
    fn admin_credentials_debug_hides_password() {
        let admin = AdminCredentials {
            username: "organizer".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{admin:?}");
        assert!(shown.contains("organizer"));
        assert!(!shown.contains("hunter2"));
    }
}
