use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use barq_auth_types::token::generate_opaque_token;

use crate::domain::repository::ChallengeStore;
use crate::domain::types::{CHALLENGE_TTL_SECS, Challenge, MAX_CHALLENGE_ATTEMPTS};
use crate::error::TrackerError;

/// Process-local challenge store. One map behind one mutex; every
/// check-then-evict happens inside a single lock.
pub struct InMemoryChallengeStore {
    entries: Mutex<HashMap<String, Challenge>>,
    ttl: Duration,
    max_attempts: u32,
}

impl Default for InMemoryChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(CHALLENGE_TTL_SECS),
            max_attempts: MAX_CHALLENGE_ATTEMPTS,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Challenge>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, challenge: &Challenge, now: DateTime<Utc>) -> bool {
        now - challenge.created_at > self.ttl
    }

    fn sweep_locked(&self, entries: &mut HashMap<String, Challenge>, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|_, c| !self.is_expired(c, now));
        before - entries.len()
    }
}

impl ChallengeStore for InMemoryChallengeStore {
    async fn create(&self, mobile: &str) -> Result<String, TrackerError> {
        let now = Utc::now();
        let id = generate_opaque_token();
        let mut entries = self.lock();
        self.sweep_locked(&mut entries, now);
        entries.insert(
            id.clone(),
            Challenge {
                mobile: mobile.to_owned(),
                created_at: now,
                attempts: 0,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Challenge>, TrackerError> {
        let now = Utc::now();
        let mut entries = self.lock();
        let expired = match entries.get(id) {
            Some(c) => self.is_expired(c, now),
            None => return Ok(None),
        };
        if expired {
            entries.remove(id);
            return Ok(None);
        }
        Ok(entries.get(id).cloned())
    }

    async fn record_attempt(&self, id: &str) -> Result<bool, TrackerError> {
        let now = Utc::now();
        let mut entries = self.lock();
        let Some(challenge) = entries.get_mut(id) else {
            return Ok(false);
        };
        if self.is_expired(challenge, now) {
            entries.remove(id);
            return Ok(false);
        }
        challenge.attempts += 1;
        if challenge.attempts >= self.max_attempts {
            entries.remove(id);
            return Ok(false);
        }
        Ok(true)
    }

    async fn take(&self, id: &str) -> Result<Option<Challenge>, TrackerError> {
        let now = Utc::now();
        let taken = self.lock().remove(id);
        Ok(taken.filter(|c| !self.is_expired(c, now)))
    }

    async fn sweep_expired(&self) -> Result<usize, TrackerError> {
        let now = Utc::now();
        let mut entries = self.lock();
        Ok(self.sweep_locked(&mut entries, now))
    }
}
