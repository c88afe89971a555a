//! Configuration loading and representation.

use chrono::Duration;
use tracing::warn;

use guildhall_auth::BypassTable;
use guildhall_core::{DomainError, DomainResult};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 480;
/// Thirty days.
pub const MAX_SESSION_TTL_MINUTES: i64 = 43_200;
pub const DEFAULT_APP_BYPASS: &str = "IXN_WORKFLOW_MANAGER=MODULE_LEADER";

/// Credentials of an administrator created at startup when missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildhallConfig {
    pub bind: String,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub app_bypass: BypassTable,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for GuildhallConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            app_bypass: BypassTable::standard(),
            bootstrap_admin: None,
        }
    }
}

impl GuildhallConfig {
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind = get("GUILDHALL_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());

        let jwt_secret = get("GUILDHALL_JWT_SECRET").unwrap_or_else(|| {
            warn!("GUILDHALL_JWT_SECRET not set; using insecure dev default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let session_ttl = match get("GUILDHALL_SESSION_TTL_MINUTES") {
            None => Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            Some(raw) => match raw.parse::<i64>().ok().filter(|m| (1..=MAX_SESSION_TTL_MINUTES).contains(m)) {
                Some(minutes) => Duration::try_minutes(minutes).ok_or_else(|| {
                    DomainError::validation(format!("GUILDHALL_SESSION_TTL_MINUTES is out of range: '{raw}'"))
                })?,
                None => {
                    return Err(DomainError::validation(format!(
                        "GUILDHALL_SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}, got '{raw}'"
                    )));
                }
            },
        };

        // An explicitly empty value disables all bypasses.
        let app_bypass = match lookup("GUILDHALL_APP_BYPASS") {
            Some(raw) => BypassTable::parse(&raw)?,
            None => BypassTable::parse(DEFAULT_APP_BYPASS)?,
        };

        let bootstrap_admin = match (get("GUILDHALL_ADMIN_EMAIL"), get("GUILDHALL_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => {
                return Err(DomainError::validation(
                    "GUILDHALL_ADMIN_EMAIL and GUILDHALL_ADMIN_PASSWORD must be set together",
                ));
            }
        };

        Ok(Self {
            bind,
            jwt_secret,
            session_ttl,
            app_bypass,
            bootstrap_admin,
        })
    }
}
