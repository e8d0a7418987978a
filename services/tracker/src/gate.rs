//! Request gate: resolves the session cookie for every request and keeps the
//! periodic session sweep going.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use barq_auth_types::cookie::{SESSION_COOKIE, clear_session_cookie, session_token};
use barq_core::error::AppError;

use crate::domain::types::{Session, User};
use crate::state::AppState;
use crate::tasks::spawn_sweep;
use crate::usecase::session::SessionUseCase;

/// Authenticated caller, inserted into request extensions by [`session_gate`].
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user: User,
    pub session: Session,
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Rate limiter for the background sweep: at most one run per interval.
pub struct SweepSchedule {
    interval: Duration,
    last_run: Mutex<Option<Instant>>,
}

impl SweepSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: Mutex::new(None),
        }
    }

    /// Claim the next run if one is due. Only one caller per interval gets `true`.
    pub fn claim(&self) -> bool {
        self.claim_at(Instant::now())
    }

    fn claim_at(&self, now: Instant) -> bool {
        let mut last_run = self.last_run.lock().unwrap_or_else(|e| e.into_inner());
        match *last_run {
            Some(at) if now.duration_since(at) < self.interval => false,
            _ => {
                *last_run = Some(now);
                true
            }
        }
    }
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{SESSION_COOKIE}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .any(|v| v.to_str().is_ok_and(|v| v.starts_with(&prefix)))
}

/// Middleware resolving the `auth-session` cookie.
///
/// A valid session is attached as [`CurrentSession`]. An unknown or expired one
/// is dropped and its cookie cleared, unless the handler issued a new one.
pub async fn session_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if state.sweeps.claim() {
        spawn_sweep(state.clone());
    }

    let Some(token) = session_token(&jar) else {
        return next.run(request).await;
    };

    let sessions = SessionUseCase {
        sessions: state.session_repo(),
    };
    match sessions.validate(&token).await {
        Ok(Some((user, session))) => {
            request
                .extensions_mut()
                .insert(CurrentSession { user, session });
            next.run(request).await
        }
        Ok(None) => {
            let response = next.run(request).await;
            if sets_session_cookie(&response) {
                return response;
            }
            let jar = clear_session_cookie(CookieJar::new(), state.cookie_secure);
            (jar, response).into_response()
        }
        Err(e) => e.into_response(),
    }
}
