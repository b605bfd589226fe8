// ⚙️ Configuration
// Everything comes from the hosting environment. Constructors take a lookup
// closure so tests never touch the real process environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 3000;

/// Read an env var, treating empty values as unset.
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Duration, ConfigError> {
    match non_empty(lookup, key) {
        None => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Target project: explicit flag, then `FIREBASE_PROJECT_ID`, then
/// `GCLOUD_PROJECT`.
pub fn resolve_project(
    explicit: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    explicit
        .filter(|p| !p.trim().is_empty())
        .or_else(|| non_empty(&lookup, "FIREBASE_PROJECT_ID"))
        .or_else(|| non_empty(&lookup, "GCLOUD_PROJECT"))
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// `host:port` of a local emulator; switches to plain HTTP.
    pub emulator_host: Option<String>,
    /// OAuth bearer token (e.g. from `gcloud auth print-access-token`).
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl FirestoreConfig {
    pub fn from_env(project: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(project, |k| std::env::var(k).ok())
    }

    pub fn from_lookup(
        project: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let project_id =
            resolve_project(project, &lookup).ok_or(ConfigError::MissingEnv("FIREBASE_PROJECT_ID"))?;
        let emulator_host = non_empty(&lookup, "FIRESTORE_EMULATOR_HOST");
        let access_token = non_empty(&lookup, "FIRESTORE_ACCESS_TOKEN")
            .or_else(|| non_empty(&lookup, "GOOGLE_OAUTH_ACCESS_TOKEN"));

        if emulator_host.is_none() && access_token.is_none() {
            return Err(ConfigError::MissingEnv("FIRESTORE_ACCESS_TOKEN"));
        }

        Ok(FirestoreConfig {
            project_id,
            emulator_host,
            access_token,
            timeout: parse_secs(&lookup, "FIRESTORE_TIMEOUT_SECS")?,
        })
    }
}

// ============================================================================
// RELAY
// ============================================================================

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Spreadsheet-backed endpoint every payload is POSTed to.
    pub script_url: String,
    pub bind_addr: SocketAddr,
    pub timeout: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let script_url = non_empty(&lookup, "SCRIPT_URL").ok_or(ConfigError::MissingEnv("SCRIPT_URL"))?;

        let port = match non_empty(&lookup, "PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
        };

        Ok(RelayConfig {
            script_url,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            timeout: parse_secs(&lookup, "RELAY_TIMEOUT_SECS")?,
        })
    }
}
