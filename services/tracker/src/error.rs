use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Tracker service error variants.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("external api unavailable")]
    ExternalApiUnavailable(String),
    #[error("{0}")]
    ExternalApiRejected(String),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("session expired")]
    InvalidChallenge,
    #[error("duplicate resource")]
    DuplicateResource,
    #[error("corrupt credential")]
    CorruptCredential,
    #[error("invalid mobile number")]
    InvalidMobile,
    #[error("missing data")]
    MissingData,
    #[error("location not found")]
    LocationNotFound,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl TrackerError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExternalApiUnavailable(_) => "EXTERNAL_API_UNAVAILABLE",
            Self::ExternalApiRejected(_) => "EXTERNAL_API_REJECTED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidChallenge => "INVALID_CHALLENGE",
            Self::DuplicateResource => "DUPLICATE_RESOURCE",
            Self::CorruptCredential => "CORRUPT_CREDENTIAL",
            Self::InvalidMobile => "INVALID_MOBILE",
            Self::MissingData => "MISSING_DATA",
            Self::LocationNotFound => "LOCATION_NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ExternalApiUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::ExternalApiRejected(_) | Self::InvalidMobile | Self::MissingData => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthenticated | Self::InvalidChallenge => StatusCode::UNAUTHORIZED,
            Self::DuplicateResource => StatusCode::CONFLICT,
            Self::LocationNotFound => StatusCode::NOT_FOUND,
            Self::CorruptCredential | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 4xx are expected client errors; TraceLayer already records them.
        if status.is_server_error() {
            match &self {
                Self::Internal(e) => tracing::error!(error = %e, kind = self.kind(), "internal error"),
                Self::ExternalApiUnavailable(detail) => {
                    tracing::error!(detail = %detail, kind = self.kind(), "provider unavailable")
                }
                _ => tracing::error!(kind = self.kind(), "{self}"),
            }
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
