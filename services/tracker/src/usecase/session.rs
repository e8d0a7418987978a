use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use barq_auth_types::token::generate_opaque_token;

use crate::domain::repository::SessionRepository;
use crate::domain::types::{SESSION_RENEW_THRESHOLD_DAYS, SESSION_TTL_DAYS, Session, User};
use crate::error::TrackerError;

/// Fresh session for `user_id` expiring one full lifetime after `now`.
pub fn new_session(user_id: Uuid, now: DateTime<Utc>) -> Session {
    Session {
        id: generate_opaque_token(),
        user_id,
        expires_at: now + Duration::days(SESSION_TTL_DAYS),
    }
}

pub struct SessionUseCase<S>
where
    S: SessionRepository,
{
    pub sessions: S,
}

impl<S> SessionUseCase<S>
where
    S: SessionRepository,
{
    /// Resolve a bearer token. Expired sessions are deleted and read as `None`;
    /// sessions inside the renewal threshold are pushed to a full lifetime.
    pub async fn validate(&self, id: &str) -> Result<Option<(User, Session)>, TrackerError> {
        let Some((mut session, user)) = self.sessions.find_with_user(id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.expires_at <= now {
            self.sessions.delete(&session.id).await?;
            return Ok(None);
        }

        if session.expires_at - now < Duration::days(SESSION_RENEW_THRESHOLD_DAYS) {
            let expires_at = now + Duration::days(SESSION_TTL_DAYS);
            self.sessions.update_expiry(&session.id, expires_at).await?;
            session.expires_at = expires_at;
        }

        Ok(Some((user, session)))
    }

    pub async fn delete(&self, id: &str) -> Result<(), TrackerError> {
        self.sessions.delete(id).await
    }

    pub async fn delete_all(&self, user_id: Uuid) -> Result<u64, TrackerError> {
        self.sessions.delete_all_for_user(user_id).await
    }

    pub async fn sweep_expired(&self) -> Result<u64, TrackerError> {
        self.sessions.delete_expired(Utc::now()).await
    }
}
