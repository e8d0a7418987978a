use chrono::Utc;
use uuid::Uuid;

use crate::domain::repository::{ChallengeStore, OtpPort, SessionRepository, UserRepository};
use crate::domain::types::{Session, User, is_valid_mobile};
use crate::error::TrackerError;
use crate::infra::cipher::CredentialCipher;
use crate::usecase::session::new_session;

// ── Send ─────────────────────────────────────────────────────────────────────

pub struct SendOtpUseCase<O, C>
where
    O: OtpPort,
    C: ChallengeStore,
{
    pub otp: O,
    pub challenges: C,
}

impl<O, C> SendOtpUseCase<O, C>
where
    O: OtpPort,
    C: ChallengeStore,
{
    /// Ask the provider to text a code and open a challenge. Returns the challenge id.
    pub async fn execute(&self, mobile: &str) -> Result<String, TrackerError> {
        let mobile = mobile.trim();
        if !is_valid_mobile(mobile) {
            return Err(TrackerError::InvalidMobile);
        }

        // No retry: a failed send is reported to the user as-is.
        self.otp.send(mobile).await?;
        self.challenges.create(mobile).await
    }
}

// ── Verify ───────────────────────────────────────────────────────────────────

pub struct VerifyOtpInput {
    pub challenge_id: String,
    pub code: String,
}

#[derive(Debug)]
pub struct VerifyOtpOutput {
    pub session: Session,
    pub user: User,
}

pub struct VerifyOtpUseCase<O, C, U, S>
where
    O: OtpPort,
    C: ChallengeStore,
    U: UserRepository,
    S: SessionRepository,
{
    pub otp: O,
    pub challenges: C,
    pub users: U,
    pub sessions: S,
    pub cipher: CredentialCipher,
}

impl<O, C, U, S> VerifyOtpUseCase<O, C, U, S>
where
    O: OtpPort,
    C: ChallengeStore,
    U: UserRepository,
    S: SessionRepository,
{
    pub async fn execute(&self, input: VerifyOtpInput) -> Result<VerifyOtpOutput, TrackerError> {
        // 1. Challenge must be live.
        let challenge = self
            .challenges
            .get(&input.challenge_id)
            .await?
            .ok_or(TrackerError::InvalidChallenge)?;

        let code = input.code.trim();
        if code.is_empty() {
            return Err(TrackerError::MissingData);
        }

        // 2. Provider verification. Failures spend one attempt.
        let token = match self.otp.verify(&challenge.mobile, code).await {
            Ok(token) => token,
            Err(e) => {
                if !self.challenges.record_attempt(&input.challenge_id).await? {
                    return Err(TrackerError::InvalidChallenge);
                }
                return Err(e);
            }
        };

        // 3. Consume the challenge. A concurrent verify of the same id loses here.
        let challenge = self
            .challenges
            .take(&input.challenge_id)
            .await?
            .ok_or(TrackerError::InvalidChallenge)?;

        // 4. Find or create the user.
        let now = Utc::now();
        let mut user = match self.users.find_by_mobile(&challenge.mobile).await? {
            Some(user) => user,
            None => {
                let user = User {
                    id: Uuid::now_v7(),
                    mobile: challenge.mobile.clone(),
                    created_at: now,
                    last_login: Some(now),
                    last_refresh: None,
                };
                self.users.insert_or_get(&user).await?
            }
        };

        // 5. Store the provider token encrypted. Cipher failure rejects the login.
        let sealed = self.cipher.encrypt(token).await?;
        self.users.update_login(user.id, &sealed, now).await?;
        user.last_login = Some(now);

        // 6. Issue the session.
        let session = new_session(user.id, now);
        self.sessions.create(&session).await?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(VerifyOtpOutput { session, user })
    }
}
