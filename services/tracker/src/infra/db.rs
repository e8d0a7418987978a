use anyhow::{Context as _, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, RelationTrait, SqlErr,
    TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use barq_tracker_schema::{blackouts, locations, meta, sessions, users};

use crate::domain::repository::{
    LocationRepository, SessionRepository, UserRepository, WatermarkRepository,
};
use crate::domain::types::{Blackout, Location, ReportedBlackout, Session, User, watermark_key};
use crate::error::TrackerError;

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

/// `users` row without the encrypted credential column.
#[derive(Debug, FromQueryResult)]
struct PublicUserRow {
    id: Uuid,
    mobile: String,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    last_refresh: Option<DateTime<Utc>>,
}

impl From<PublicUserRow> for User {
    fn from(row: PublicUserRow) -> Self {
        User {
            id: row.id,
            mobile: row.mobile,
            created_at: row.created_at,
            last_login: row.last_login,
            last_refresh: row.last_refresh,
        }
    }
}

async fn find_public_user(
    db: &DatabaseConnection,
    filter: sea_orm::sea_query::SimpleExpr,
) -> Result<Option<User>, DbErr> {
    let row = users::Entity::find()
        .select_only()
        .columns([
            users::Column::Id,
            users::Column::Mobile,
            users::Column::CreatedAt,
            users::Column::LastLogin,
            users::Column::LastRefresh,
        ])
        .filter(filter)
        .into_model::<PublicUserRow>()
        .one(db)
        .await?;
    Ok(row.map(User::from))
}

impl UserRepository for DbUserRepository {
    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>, TrackerError> {
        let user = find_public_user(&self.db, users::Column::Mobile.eq(mobile))
            .await
            .context("find user by mobile")?;
        Ok(user)
    }

    async fn insert_or_get(&self, user: &User) -> Result<User, TrackerError> {
        let result = users::Entity::insert(users::ActiveModel {
            id: Set(user.id),
            mobile: Set(user.mobile.clone()),
            auth_token: Set(None),
            created_at: Set(user.created_at),
            last_login: Set(user.last_login),
            last_refresh: Set(user.last_refresh),
        })
        .exec_without_returning(&self.db)
        .await;

        match result {
            Ok(_) => Ok(user.clone()),
            // Lost a race with a concurrent first login for the same mobile.
            Err(e) if is_unique_violation(&e) => self
                .find_by_mobile(&user.mobile)
                .await?
                .ok_or_else(|| anyhow!("user {} vanished after unique violation", user.mobile).into()),
            Err(e) => Err(anyhow::Error::new(e).context("create user").into()),
        }
    }

    async fn update_login(
        &self,
        id: Uuid,
        encrypted_token: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        users::Entity::update_many()
            .col_expr(users::Column::AuthToken, Some(encrypted_token.to_owned()).into())
            .col_expr(users::Column::LastLogin, Some(at).into())
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("update user login")?;
        Ok(())
    }

    async fn encrypted_token(&self, id: Uuid) -> Result<Option<String>, TrackerError> {
        let token: Option<Option<String>> = users::Entity::find_by_id(id)
            .select_only()
            .column(users::Column::AuthToken)
            .into_tuple()
            .one(&self.db)
            .await
            .context("load encrypted token")?;
        Ok(token.flatten())
    }

    async fn touch_last_refresh(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), TrackerError> {
        users::Entity::update_many()
            .col_expr(users::Column::LastRefresh, Some(at).into())
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("touch user last_refresh")?;
        Ok(())
    }
}

// ── Session repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

impl SessionRepository for DbSessionRepository {
    async fn create(&self, session: &Session) -> Result<(), TrackerError> {
        sessions::Entity::insert(sessions::ActiveModel {
            id: Set(session.id.clone()),
            user_id: Set(session.user_id),
            expires_at: Set(session.expires_at),
        })
        .exec_without_returning(&self.db)
        .await
        .context("create session")?;
        Ok(())
    }

    async fn find_with_user(&self, id: &str) -> Result<Option<(Session, User)>, TrackerError> {
        let Some(model) = sessions::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await
            .context("find session")?
        else {
            return Ok(None);
        };
        let user = find_public_user(&self.db, users::Column::Id.eq(model.user_id))
            .await
            .context("find session owner")?;
        Ok(user.map(|user| (session_from_model(model), user)))
    }

    async fn update_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        sessions::Entity::update_many()
            .col_expr(sessions::Column::ExpiresAt, expires_at.into())
            .filter(sessions::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("extend session")?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), TrackerError> {
        sessions::Entity::delete_by_id(id.to_owned())
            .exec(&self.db)
            .await
            .context("delete session")?;
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, TrackerError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete sessions for user")?;
        Ok(result.rows_affected)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, TrackerError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await
            .context("sweep expired sessions")?;
        Ok(result.rows_affected)
    }
}

fn session_from_model(model: sessions::Model) -> Session {
    Session {
        id: model.id,
        user_id: model.user_id,
        expires_at: model.expires_at,
    }
}

// ── Location repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLocationRepository {
    pub db: DatabaseConnection,
}

impl LocationRepository for DbLocationRepository {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Location>, TrackerError> {
        let models = locations::Entity::find()
            .filter(locations::Column::UserId.eq(user_id))
            .order_by_asc(locations::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list locations by user")?;
        Ok(models.into_iter().map(location_from_model).collect())
    }

    async fn create(&self, location: &Location) -> Result<(), TrackerError> {
        let result = locations::Entity::insert(locations::ActiveModel {
            id: Set(location.id),
            user_id: Set(location.user_id),
            name: Set(location.name.clone()),
            bill_id: Set(location.bill_id.clone()),
            created_at: Set(location.created_at),
        })
        .exec_without_returning(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(TrackerError::DuplicateResource),
            Err(e) => Err(anyhow::Error::new(e).context("create location").into()),
        }
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, TrackerError> {
        let result = locations::Entity::delete_many()
            .filter(locations::Column::Id.eq(id))
            .filter(locations::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete location")?;
        Ok(result.rows_affected > 0)
    }

    async fn replace_blackouts(
        &self,
        location_id: Uuid,
        rows: &[ReportedBlackout],
    ) -> Result<(), TrackerError> {
        let models: Vec<blackouts::ActiveModel> = rows
            .iter()
            .map(|row| blackouts::ActiveModel {
                id: Set(Uuid::now_v7()),
                location_id: Set(location_id),
                outage_date: Set(row.outage_date),
                start_time: Set(row.start_time.clone()),
                end_time: Set(row.end_time.clone()),
                reason: Set(row.reason.clone()),
                address: Set(row.address.clone()),
            })
            .collect();

        self.db
            .transaction::<_, (), DbErr>(move |txn| {
                Box::pin(async move {
                    // Serialize replaces of one location. Under READ COMMITTED a bare
                    // delete misses rows a concurrent replace has not committed yet.
                    // SQLite takes the database write lock on the delete itself.
                    if txn.get_database_backend() != DbBackend::Sqlite {
                        locations::Entity::find_by_id(location_id)
                            .lock_exclusive()
                            .one(txn)
                            .await?;
                    }
                    blackouts::Entity::delete_many()
                        .filter(blackouts::Column::LocationId.eq(location_id))
                        .exec(txn)
                        .await?;
                    // insert_many rejects an empty batch.
                    if !models.is_empty() {
                        blackouts::Entity::insert_many(models)
                            .exec_without_returning(txn)
                            .await?;
                    }
                    Ok(())
                })
            })
            .await
            .context("replace blackouts")?;
        Ok(())
    }

    async fn list_upcoming(
        &self,
        user_id: Uuid,
        from: NaiveDate,
    ) -> Result<Vec<Blackout>, TrackerError> {
        let models = blackouts::Entity::find()
            .join(
                sea_orm::JoinType::InnerJoin,
                blackouts::Relation::Location.def(),
            )
            .filter(locations::Column::UserId.eq(user_id))
            .filter(blackouts::Column::OutageDate.gte(from))
            .order_by_asc(blackouts::Column::OutageDate)
            .order_by_asc(blackouts::Column::StartTime)
            .all(&self.db)
            .await
            .context("list upcoming blackouts")?;
        Ok(models.into_iter().map(blackout_from_model).collect())
    }
}

fn location_from_model(model: locations::Model) -> Location {
    Location {
        id: model.id,
        user_id: model.user_id,
        name: model.name,
        bill_id: model.bill_id,
        created_at: model.created_at,
    }
}

fn blackout_from_model(model: blackouts::Model) -> Blackout {
    Blackout {
        id: model.id,
        location_id: model.location_id,
        outage_date: model.outage_date,
        start_time: model.start_time,
        end_time: model.end_time,
        reason: model.reason,
        address: model.address,
    }
}

// ── Watermark repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbWatermarkRepository {
    pub db: DatabaseConnection,
}

impl WatermarkRepository for DbWatermarkRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, TrackerError> {
        let key = watermark_key(user_id);
        let model = meta::Entity::find_by_id(key.clone())
            .one(&self.db)
            .await
            .context("load refresh watermark")?;
        let Some(model) = model else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&model.value) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                // Unreadable watermark reads as "never refreshed".
                tracing::warn!(key = %key, error = %e, "unparseable refresh watermark");
                Ok(None)
            }
        }
    }

    async fn set(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), TrackerError> {
        meta::Entity::insert(meta::ActiveModel {
            key: Set(watermark_key(user_id)),
            value: Set(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        })
        .on_conflict(
            OnConflict::column(meta::Column::Key)
                .update_column(meta::Column::Value)
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .context("upsert refresh watermark")?;
        Ok(())
    }
}
