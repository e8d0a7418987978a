use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::gate::CurrentSession;
use crate::state::AppState;
use crate::tasks::spawn_background_refresh;
use crate::usecase::location::{
    AddLocationInput, AddLocationUseCase, ListLocationsUseCase, RemoveLocationUseCase,
};

// ── GET /locations ────────────────────────────────────────────────────────────

/// Serves cached rows immediately; stale data schedules a refresh for next time.
pub async fn list_locations(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<impl IntoResponse, TrackerError> {
    let usecase = ListLocationsUseCase {
        locations: state.location_repo(),
        watermarks: state.watermark_repo(),
        stale_after: state.stale_after,
    };
    let overview = usecase.execute(current.user.id, Utc::now()).await?;
    if overview.stale {
        spawn_background_refresh(state.clone(), current.user.id);
    }
    Ok(Json(overview))
}

// ── POST /locations ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AddLocationRequest {
    pub name: String,
    pub bill_id: String,
}

pub async fn add_location(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(body): Json<AddLocationRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let usecase = AddLocationUseCase {
        sync: state.sync_usecase(),
    };
    let added = usecase
        .execute(AddLocationInput {
            user_id: current.user.id,
            name: body.name,
            bill_id: body.bill_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(added)))
}

// ── DELETE /locations/{id} ────────────────────────────────────────────────────

pub async fn remove_location(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, TrackerError> {
    let usecase = RemoveLocationUseCase {
        locations: state.location_repo(),
    };
    usecase.execute(current.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /locations/refresh ───────────────────────────────────────────────────

pub async fn refresh_locations(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<impl IntoResponse, TrackerError> {
    let summary = state.sync_usecase().refresh_all(current.user.id).await?;
    Ok(Json(summary))
}
