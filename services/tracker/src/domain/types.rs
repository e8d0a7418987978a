use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use barq_core::serde::{to_rfc3339_ms, to_rfc3339_ms_opt};

/// Public projection of a user. The encrypted provider token is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub mobile: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms_opt")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(serialize_with = "to_rfc3339_ms_opt")]
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Bearer session bound to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// In-flight OTP verification, held in process memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub mobile: String,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub name: String,
    pub bill_id: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

/// Stored outage row. Dates are Gregorian; times are provider wall-clock strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blackout {
    pub id: Uuid,
    pub location_id: Uuid,
    pub outage_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
    pub address: Option<String>,
}

/// Outage row as reported by the provider, already mapped to a Gregorian date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedBlackout {
    pub outage_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
    pub address: Option<String>,
}

/// Result of one location's fetch-and-replace inside a refresh round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Replaced { rows: usize },
    Failed { kind: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationRefresh {
    pub location_id: Uuid,
    #[serde(flatten)]
    pub outcome: RefreshOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub refreshed_at: DateTime<Utc>,
    pub locations: Vec<LocationRefresh>,
}

impl RefreshSummary {
    pub fn failed(&self) -> usize {
        self.locations
            .iter()
            .filter(|l| matches!(l.outcome, RefreshOutcome::Failed { .. }))
            .count()
    }
}

/// Session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Sessions with less than this many days left are extended on access.
pub const SESSION_RENEW_THRESHOLD_DAYS: i64 = 15;

/// OTP challenge lifetime in seconds.
pub const CHALLENGE_TTL_SECS: i64 = 10 * 60;

/// Failed verifications allowed per challenge.
pub const MAX_CHALLENGE_ATTEMPTS: u32 = 5;

/// `meta` key holding a user's last completed refresh round.
pub fn watermark_key(user_id: Uuid) -> String {
    format!("lastRefresh_{user_id}")
}

/// Iranian mobile number: `09` followed by nine digits.
pub fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == 11 && mobile.starts_with("09") && mobile.bytes().all(|b| b.is_ascii_digit())
}
