use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use barq_auth_types::cookie::{
    challenge_id, clear_challenge_cookie, set_challenge_cookie, set_session_cookie,
};

use crate::domain::types::User;
use crate::error::TrackerError;
use crate::state::AppState;
use crate::usecase::otp::{SendOtpUseCase, VerifyOtpInput, VerifyOtpUseCase};

// ── POST /auth/otp ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub mobile: String,
}

pub async fn send_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SendOtpRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let usecase = SendOtpUseCase {
        otp: state.provider.clone(),
        challenges: state.challenges.clone(),
    };
    let challenge_id = usecase.execute(&body.mobile).await?;
    let jar = set_challenge_cookie(jar, challenge_id, state.cookie_secure);
    Ok((StatusCode::NO_CONTENT, jar))
}

// ── POST /auth/otp/verify ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let challenge_id = challenge_id(&jar).ok_or(TrackerError::InvalidChallenge)?;

    let usecase = VerifyOtpUseCase {
        otp: state.provider.clone(),
        challenges: state.challenges.clone(),
        users: state.user_repo(),
        sessions: state.session_repo(),
        cipher: state.cipher.clone(),
    };
    let out = usecase
        .execute(VerifyOtpInput {
            challenge_id,
            code: body.code,
        })
        .await?;

    let jar = clear_challenge_cookie(jar, state.cookie_secure);
    let jar = set_session_cookie(jar, out.session.id, state.cookie_secure);
    Ok((StatusCode::CREATED, jar, Json(UserResponse { user: out.user })))
}
