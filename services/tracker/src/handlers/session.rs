use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;

use barq_auth_types::cookie::{clear_session_cookie, session_token};

use crate::error::TrackerError;
use crate::gate::CurrentSession;
use crate::handlers::otp::UserResponse;
use crate::state::AppState;
use crate::usecase::session::SessionUseCase;

// ── GET /auth/me ──────────────────────────────────────────────────────────────

pub async fn me(current: CurrentSession) -> Json<UserResponse> {
    Json(UserResponse { user: current.user })
}

// ── DELETE /auth/session ──────────────────────────────────────────────────────

/// Log out. Succeeds without a cookie so clients can always clear local state.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, TrackerError> {
    if let Some(token) = session_token(&jar) {
        let usecase = SessionUseCase {
            sessions: state.session_repo(),
        };
        usecase.delete(&token).await?;
    }
    let jar = clear_session_cookie(jar, state.cookie_secure);
    Ok((StatusCode::NO_CONTENT, jar))
}

// ── DELETE /auth/sessions ─────────────────────────────────────────────────────

pub async fn logout_everywhere(
    State(state): State<AppState>,
    current: CurrentSession,
    jar: CookieJar,
) -> Result<impl IntoResponse, TrackerError> {
    let usecase = SessionUseCase {
        sessions: state.session_repo(),
    };
    let revoked = usecase.delete_all(current.user.id).await?;
    tracing::info!(user_id = %current.user.id, revoked, "all sessions revoked");
    let jar = clear_session_cookie(jar, state.cookie_secure);
    Ok((StatusCode::NO_CONTENT, jar))
}
