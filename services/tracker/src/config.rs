use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use barq_core::config::Config;

/// Tracker service configuration loaded from environment variables.
#[derive(Clone, Deserialize)]
pub struct TrackerConfig {
    /// Database connection URL (PostgreSQL in production, SQLite for local runs).
    pub database_url: String,
    /// Process secret the credential cipher derives its keys from. No default.
    pub encryption_key: String,
    /// Base URL of the OTP API. Env var: `OTP_API_URL`.
    #[serde(default = "default_otp_api_url")]
    pub otp_api_url: String,
    /// Base URL of the outage report API. Env var: `REPORT_API_URL`.
    #[serde(default = "default_report_api_url")]
    pub report_api_url: String,
    /// TCP port to listen on (default 3114). Env var: `TRACKER_PORT`.
    #[serde(default = "default_tracker_port")]
    pub tracker_port: u16,
    /// Mark cookies `Secure`. Disable only for plain-HTTP local development.
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,
    /// Age after which a user's outage data is refreshed on read.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

fn default_otp_api_url() -> String {
    "https://uiapi.saapa.ir/api/otp".to_owned()
}

fn default_report_api_url() -> String {
    "https://uiapi2.saapa.ir/api/ebills".to_owned()
}

fn default_tracker_port() -> u16 {
    3114
}

fn default_cookie_secure() -> bool {
    true
}

fn default_session_sweep_interval_secs() -> u64 {
    60 * 60
}

fn default_stale_after_secs() -> u64 {
    24 * 60 * 60
}

fn default_provider_timeout_secs() -> u64 {
    15
}

impl Config for TrackerConfig {}

impl TrackerConfig {
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }

    pub fn stale_after(&self) -> chrono::Duration {
        i64::try_from(self.stale_after_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

// Keeps the encryption secret out of startup logs.
impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("database_url", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .field("otp_api_url", &self.otp_api_url)
            .field("report_api_url", &self.report_api_url)
            .field("tracker_port", &self.tracker_port)
            .field("cookie_secure", &self.cookie_secure)
            .field("session_sweep_interval_secs", &self.session_sweep_interval_secs)
            .field("stale_after_secs", &self.stale_after_secs)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .finish()
    }
}
