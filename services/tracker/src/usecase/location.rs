use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use barq_core::serde::to_rfc3339_ms_opt;

use crate::calendar::provider_today;
use crate::domain::repository::{
    LocationRepository, ReportPort, UserRepository, WatermarkRepository,
};
use crate::domain::types::{Blackout, Location, RefreshOutcome};
use crate::error::TrackerError;
use crate::usecase::sync::{SyncUseCase, is_stale};

// ── Add ──────────────────────────────────────────────────────────────────────

pub struct AddLocationInput {
    pub user_id: Uuid,
    pub name: String,
    pub bill_id: String,
}

#[derive(Debug, Serialize)]
pub struct AddedLocation {
    pub location: Location,
    pub initial_refresh: RefreshOutcome,
}

/// Registers a location and pulls its first report. A failed first fetch is
/// logged and reported in the outcome; the location is kept either way.
pub struct AddLocationUseCase<L, W, U, R>
where
    L: LocationRepository,
    W: WatermarkRepository,
    U: UserRepository,
    R: ReportPort,
{
    pub sync: SyncUseCase<L, W, U, R>,
}

impl<L, W, U, R> AddLocationUseCase<L, W, U, R>
where
    L: LocationRepository,
    W: WatermarkRepository,
    U: UserRepository,
    R: ReportPort,
{
    pub async fn execute(&self, input: AddLocationInput) -> Result<AddedLocation, TrackerError> {
        let name = input.name.trim();
        let bill_id = input.bill_id.trim();
        if name.is_empty() || bill_id.is_empty() {
            return Err(TrackerError::MissingData);
        }

        let location = Location {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            name: name.to_owned(),
            bill_id: bill_id.to_owned(),
            created_at: Utc::now(),
        };
        self.sync.locations.create(&location).await?;

        let initial_refresh = match self.sync.refresh_location(&location, input.user_id).await {
            Ok(rows) => RefreshOutcome::Replaced { rows },
            Err(e) => RefreshOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        };
        Ok(AddedLocation {
            location,
            initial_refresh,
        })
    }
}

// ── Remove ───────────────────────────────────────────────────────────────────

pub struct RemoveLocationUseCase<L>
where
    L: LocationRepository,
{
    pub locations: L,
}

impl<L> RemoveLocationUseCase<L>
where
    L: LocationRepository,
{
    pub async fn execute(&self, user_id: Uuid, location_id: Uuid) -> Result<(), TrackerError> {
        if !self.locations.delete(location_id, user_id).await? {
            return Err(TrackerError::LocationNotFound);
        }
        Ok(())
    }
}

// ── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LocationView {
    #[serde(flatten)]
    pub location: Location,
    pub blackouts: Vec<Blackout>,
}

#[derive(Debug, Serialize)]
pub struct LocationsOverview {
    pub locations: Vec<LocationView>,
    #[serde(serialize_with = "to_rfc3339_ms_opt")]
    pub last_refresh: Option<DateTime<Utc>>,
    pub stale: bool,
}

pub struct ListLocationsUseCase<L, W>
where
    L: LocationRepository,
    W: WatermarkRepository,
{
    pub locations: L,
    pub watermarks: W,
    pub stale_after: Duration,
}

impl<L, W> ListLocationsUseCase<L, W>
where
    L: LocationRepository,
    W: WatermarkRepository,
{
    /// Locations with outages from today (provider calendar day) onwards.
    pub async fn execute(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<LocationsOverview, TrackerError> {
        let locations = self.locations.list_by_user(user_id).await?;
        let mut upcoming = self
            .locations
            .list_upcoming(user_id, provider_today(now))
            .await?;
        let last_refresh = self.watermarks.get(user_id).await?;

        let locations = locations
            .into_iter()
            .map(|location| {
                // `upcoming` is already ordered; partitioning keeps that order.
                let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut upcoming)
                    .into_iter()
                    .partition(|b| b.location_id == location.id);
                upcoming = rest;
                LocationView {
                    location,
                    blackouts: mine,
                }
            })
            .collect();

        Ok(LocationsOverview {
            locations,
            last_refresh,
            stale: is_stale(last_refresh, now, self.stale_after),
        })
    }
}
