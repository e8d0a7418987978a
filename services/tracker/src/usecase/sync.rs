use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use uuid::Uuid;

use crate::calendar::ReportWindow;
use crate::domain::repository::{
    LocationRepository, ReportPort, UserRepository, WatermarkRepository,
};
use crate::domain::types::{Location, LocationRefresh, RefreshOutcome, RefreshSummary};
use crate::error::TrackerError;
use crate::infra::cipher::CredentialCipher;
use crate::usecase::credential::decrypted_token;

/// Outage data is stale when it was never refreshed or is older than `stale_after`.
pub fn is_stale(
    watermark: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> bool {
    watermark.is_none_or(|at| now - at > stale_after)
}

fn current_window(now: DateTime<Utc>) -> Result<ReportWindow, TrackerError> {
    ReportWindow::starting_at(now)
        .ok_or_else(|| anyhow::anyhow!("no report window for {now}").into())
}

pub struct SyncUseCase<L, W, U, R>
where
    L: LocationRepository,
    W: WatermarkRepository,
    U: UserRepository,
    R: ReportPort,
{
    pub locations: L,
    pub watermarks: W,
    pub users: U,
    pub reports: R,
    pub cipher: CredentialCipher,
}

impl<L, W, U, R> SyncUseCase<L, W, U, R>
where
    L: LocationRepository,
    W: WatermarkRepository,
    U: UserRepository,
    R: ReportPort,
{
    async fn require_token(&self, user_id: Uuid) -> Result<String, TrackerError> {
        decrypted_token(&self.users, &self.cipher, user_id)
            .await?
            .ok_or(TrackerError::Unauthenticated)
    }

    /// Fetch one location's report and replace its rows. Failed fetches leave
    /// existing rows untouched. Returns the number of rows written.
    async fn fetch_and_replace(
        &self,
        location: &Location,
        token: &str,
        window: &ReportWindow,
    ) -> Result<usize, TrackerError> {
        let rows = self
            .reports
            .fetch(token, &location.bill_id, window)
            .await
            .map_err(TrackerError::from)?;
        self.locations.replace_blackouts(location.id, &rows).await?;
        Ok(rows.len())
    }

    /// Refresh a single location with its owner's credential.
    pub async fn refresh_location(
        &self,
        location: &Location,
        user_id: Uuid,
    ) -> Result<usize, TrackerError> {
        let window = current_window(Utc::now())?;
        let result = match self.require_token(user_id).await {
            Ok(token) => self.fetch_and_replace(location, &token, &window).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            log_location_failure(user_id, location.id, e);
        }
        result
    }

    /// Refresh every location of a user concurrently, then stamp the watermark.
    ///
    /// The credential is resolved once up front and nothing is fetched without
    /// it. A missing credential still stamps the watermark, so a logged-out
    /// user is not retried on every stale read. A corrupt one leaves it alone.
    pub async fn refresh_all(&self, user_id: Uuid) -> Result<RefreshSummary, TrackerError> {
        let window = current_window(Utc::now())?;
        let token = match self.require_token(user_id).await {
            Ok(token) => token,
            Err(TrackerError::Unauthenticated) => {
                self.stamp(user_id, Utc::now()).await?;
                tracing::warn!(user_id = %user_id, "refresh round skipped: no stored credential");
                return Err(TrackerError::Unauthenticated);
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, kind = e.kind(), "refresh round skipped");
                return Err(e);
            }
        };
        let locations = self.locations.list_by_user(user_id).await?;

        let results = join_all(locations.iter().map(|location| {
            let token = token.as_str();
            let window = &window;
            async move {
                let outcome = match self.fetch_and_replace(location, token, window).await {
                    Ok(rows) => RefreshOutcome::Replaced { rows },
                    Err(e) => {
                        log_location_failure(user_id, location.id, &e);
                        RefreshOutcome::Failed {
                            kind: e.kind(),
                            message: e.to_string(),
                        }
                    }
                };
                LocationRefresh {
                    location_id: location.id,
                    outcome,
                }
            }
        }))
        .await;

        let refreshed_at = Utc::now();
        self.stamp(user_id, refreshed_at).await?;

        let summary = RefreshSummary {
            refreshed_at,
            locations: results,
        };
        tracing::info!(
            user_id = %user_id,
            locations = summary.locations.len(),
            failed = summary.failed(),
            "refresh round finished"
        );
        Ok(summary)
    }

    pub async fn watermark(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, TrackerError> {
        self.watermarks.get(user_id).await
    }

    async fn stamp(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), TrackerError> {
        self.watermarks.set(user_id, at).await?;
        self.users.touch_last_refresh(user_id, at).await
    }
}

fn log_location_failure(user_id: Uuid, location_id: Uuid, e: &TrackerError) {
    match e {
        TrackerError::Internal(_) => tracing::error!(
            user_id = %user_id,
            location_id = %location_id,
            error = %e,
            "location refresh failed"
        ),
        TrackerError::ExternalApiUnavailable(detail) => tracing::warn!(
            user_id = %user_id,
            location_id = %location_id,
            detail = %detail,
            "location refresh failed: provider unavailable"
        ),
        _ => tracing::warn!(
            user_id = %user_id,
            location_id = %location_id,
            kind = e.kind(),
            error = %e,
            "location refresh failed"
        ),
    }
}
