//! Detached background work. Outcomes go to the tracing sink; nothing here is awaited
//! by a request.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::repository::ChallengeStore;
use crate::state::AppState;
use crate::usecase::session::SessionUseCase;

/// Sweep expired sessions and OTP challenges.
pub fn spawn_sweep(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sessions = SessionUseCase {
            sessions: state.session_repo(),
        };
        match sessions.sweep_expired().await {
            Ok(removed) => tracing::info!(removed, "expired sessions swept"),
            Err(e) => tracing::error!(error = %e, "session sweep failed"),
        }
        match state.challenges.sweep_expired().await {
            Ok(removed) => tracing::debug!(removed, "expired otp challenges swept"),
            Err(e) => tracing::error!(error = %e, "challenge sweep failed"),
        }
    })
}

/// Users with a background refresh currently running.
#[derive(Default)]
pub struct InFlightRefreshes {
    users: Mutex<HashSet<Uuid>>,
}

/// Marks a user's refresh as running until dropped.
pub struct RefreshTicket {
    registry: Arc<InFlightRefreshes>,
    user_id: Uuid,
}

impl InFlightRefreshes {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `None` if a refresh for `user_id` is already running.
    pub fn try_begin(self: &Arc<Self>, user_id: Uuid) -> Option<RefreshTicket> {
        self.lock().insert(user_id).then(|| RefreshTicket {
            registry: Arc::clone(self),
            user_id,
        })
    }
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.user_id);
    }
}

/// Refresh all of a user's locations without blocking the caller.
/// Returns `None` when a refresh for this user is already in flight.
pub fn spawn_background_refresh(state: AppState, user_id: Uuid) -> Option<JoinHandle<()>> {
    let ticket = state.refreshes.try_begin(user_id)?;
    Some(tokio::spawn(async move {
        let _ticket = ticket;
        match state.sync_usecase().refresh_all(user_id).await {
            Ok(summary) => tracing::info!(
                user_id = %user_id,
                locations = summary.locations.len(),
                failed = summary.failed(),
                "background refresh finished"
            ),
            Err(e) => tracing::error!(
                user_id = %user_id,
                kind = e.kind(),
                error = %e,
                "background refresh failed"
            ),
        }
    }))
}
