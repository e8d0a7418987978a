use std::sync::Arc;

use anyhow::Context as _;
use sea_orm::DatabaseConnection;

use crate::config::TrackerConfig;
use crate::gate::SweepSchedule;
use crate::infra::challenge::InMemoryChallengeStore;
use crate::infra::cipher::CredentialCipher;
use crate::infra::db::{
    DbLocationRepository, DbSessionRepository, DbUserRepository, DbWatermarkRepository,
};
use crate::infra::provider::HttpProvider;
use crate::tasks::InFlightRefreshes;
use crate::usecase::sync::SyncUseCase;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub provider: HttpProvider,
    pub cipher: CredentialCipher,
    pub challenges: Arc<InMemoryChallengeStore>,
    pub sweeps: Arc<SweepSchedule>,
    pub refreshes: Arc<InFlightRefreshes>,
    pub cookie_secure: bool,
    pub stale_after: chrono::Duration,
}

impl AppState {
    pub fn from_config(db: DatabaseConnection, config: &TrackerConfig) -> anyhow::Result<Self> {
        let provider = HttpProvider::new(
            &config.otp_api_url,
            &config.report_api_url,
            config.provider_timeout(),
        )
        .context("build provider http client")?;
        Ok(Self {
            db,
            provider,
            cipher: CredentialCipher::new(&config.encryption_key),
            challenges: Arc::new(InMemoryChallengeStore::new()),
            sweeps: Arc::new(SweepSchedule::new(config.session_sweep_interval())),
            refreshes: Arc::new(InFlightRefreshes::default()),
            cookie_secure: config.cookie_secure,
            stale_after: config.stale_after(),
        })
    }

    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn session_repo(&self) -> DbSessionRepository {
        DbSessionRepository {
            db: self.db.clone(),
        }
    }

    pub fn location_repo(&self) -> DbLocationRepository {
        DbLocationRepository {
            db: self.db.clone(),
        }
    }

    pub fn watermark_repo(&self) -> DbWatermarkRepository {
        DbWatermarkRepository {
            db: self.db.clone(),
        }
    }

    pub fn sync_usecase(
        &self,
    ) -> SyncUseCase<DbLocationRepository, DbWatermarkRepository, DbUserRepository, HttpProvider>
    {
        SyncUseCase {
            locations: self.location_repo(),
            watermarks: self.watermark_repo(),
            users: self.user_repo(),
            reports: self.provider.clone(),
            cipher: self.cipher.clone(),
        }
    }
}
