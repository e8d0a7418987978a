#![allow(async_fn_in_trait)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::calendar::ReportWindow;
use crate::domain::types::{Blackout, Challenge, Location, ReportedBlackout, Session, User};
use crate::error::TrackerError;

/// Repository for users and their encrypted provider credential.
pub trait UserRepository: Send + Sync {
    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>, TrackerError>;

    /// Insert a user. If another request created the same mobile first, return that row.
    async fn insert_or_get(&self, user: &User) -> Result<User, TrackerError>;

    /// Store a freshly encrypted credential and stamp `last_login`.
    async fn update_login(
        &self,
        id: Uuid,
        encrypted_token: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TrackerError>;

    async fn encrypted_token(&self, id: Uuid) -> Result<Option<String>, TrackerError>;

    async fn touch_last_refresh(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), TrackerError>;
}

/// Repository for bearer sessions.
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), TrackerError>;

    /// Load a session together with its owner's public fields.
    async fn find_with_user(&self, id: &str) -> Result<Option<(Session, User)>, TrackerError>;

    async fn update_expiry(&self, id: &str, expires_at: DateTime<Utc>)
    -> Result<(), TrackerError>;

    async fn delete(&self, id: &str) -> Result<(), TrackerError>;

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, TrackerError>;

    /// Delete every session with `expires_at < now`. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, TrackerError>;
}

/// Repository for billing locations and their cached outage rows.
pub trait LocationRepository: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Location>, TrackerError>;

    /// Insert a location. `DuplicateResource` if the user already tracks this bill id.
    async fn create(&self, location: &Location) -> Result<(), TrackerError>;

    /// Delete a location owned by `user_id`. Returns `true` if deleted, `false` if not found.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, TrackerError>;

    /// Atomically replace every outage row of a location with `rows`.
    async fn replace_blackouts(
        &self,
        location_id: Uuid,
        rows: &[ReportedBlackout],
    ) -> Result<(), TrackerError>;

    /// Outage rows of the user's locations on or after `from`, ordered by date then start time.
    async fn list_upcoming(
        &self,
        user_id: Uuid,
        from: NaiveDate,
    ) -> Result<Vec<Blackout>, TrackerError>;
}

/// Per-user refresh watermark kept in the `meta` table.
pub trait WatermarkRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, TrackerError>;

    async fn set(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), TrackerError>;
}

/// Port for the provider's OTP API.
pub trait OtpPort: Send + Sync {
    async fn send(&self, mobile: &str) -> Result<(), TrackerError>;

    /// Verify a code. Returns the provider API token on success.
    async fn verify(&self, mobile: &str, code: &str) -> Result<String, TrackerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider rejected request: {0}")]
    Rejected(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl From<FetchError> for TrackerError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Rejected(message) => TrackerError::ExternalApiRejected(message),
            FetchError::Unavailable(detail) | FetchError::Malformed(detail) => {
                TrackerError::ExternalApiUnavailable(detail)
            }
        }
    }
}

/// Port for the provider's planned-outage report API.
pub trait ReportPort: Send + Sync {
    async fn fetch(
        &self,
        token: &str,
        bill_id: &str,
        window: &ReportWindow,
    ) -> Result<Vec<ReportedBlackout>, FetchError>;
}

/// Short-lived OTP challenges. Expired challenges read as absent.
pub trait ChallengeStore: Send + Sync {
    /// Open a challenge for `mobile` and return its id. Sweeps expired entries first.
    async fn create(&self, mobile: &str) -> Result<String, TrackerError>;

    async fn get(&self, id: &str) -> Result<Option<Challenge>, TrackerError>;

    /// Count a failed verification. Returns `false` once the attempt budget is
    /// spent (the challenge is evicted) or when the id is unknown.
    async fn record_attempt(&self, id: &str) -> Result<bool, TrackerError>;

    /// Remove and return a live challenge. Of several concurrent callers for
    /// one id, at most one gets `Some`.
    async fn take(&self, id: &str) -> Result<Option<Challenge>, TrackerError>;

    /// Evict expired challenges. Returns the number removed.
    async fn sweep_expired(&self) -> Result<usize, TrackerError>;
}

impl<T: ChallengeStore> ChallengeStore for Arc<T> {
    async fn create(&self, mobile: &str) -> Result<String, TrackerError> {
        (**self).create(mobile).await
    }

    async fn get(&self, id: &str) -> Result<Option<Challenge>, TrackerError> {
        (**self).get(id).await
    }

    async fn record_attempt(&self, id: &str) -> Result<bool, TrackerError> {
        (**self).record_attempt(id).await
    }

    async fn take(&self, id: &str) -> Result<Option<Challenge>, TrackerError> {
        (**self).take(id).await
    }

    async fn sweep_expired(&self) -> Result<usize, TrackerError> {
        (**self).sweep_expired().await
    }
}
