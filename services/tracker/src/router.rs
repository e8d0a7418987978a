use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;

use barq_core::error::not_found;
use barq_core::health::{healthz, readiness};
use barq_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::gate::session_gate;
use crate::handlers::{
    location::{add_location, list_locations, refresh_locations, remove_location},
    otp::{send_otp, verify_otp},
    session::{logout, logout_everywhere, me},
};
use crate::state::AppState;

async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.db.ping().await)
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // OTP login
        .route("/auth/otp", post(send_otp))
        .route("/auth/otp/verify", post(verify_otp))
        // Sessions
        .route("/auth/me", get(me))
        .route("/auth/session", delete(logout))
        .route("/auth/sessions", delete(logout_everywhere))
        // Locations
        .route("/locations", get(list_locations).post(add_location))
        .route("/locations/refresh", post(refresh_locations))
        .route("/locations/{id}", delete(remove_location))
        .route_layer(from_fn_with_state(state.clone(), session_gate));

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(api)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(trace_layer())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
