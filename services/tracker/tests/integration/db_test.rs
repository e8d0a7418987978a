use chrono::{Duration, NaiveDate, TimeZone, Utc};
use sea_orm::{ActiveValue::Set, EntityTrait};
use uuid::Uuid;

use barq_tracker::domain::repository::{
    LocationRepository, SessionRepository, UserRepository, WatermarkRepository,
};
use barq_tracker::domain::types::{Session, User};
use barq_tracker::error::TrackerError;
use barq_tracker::infra::db::{
    DbLocationRepository, DbSessionRepository, DbUserRepository, DbWatermarkRepository,
};
use barq_tracker_schema::meta;

use crate::helpers::{pooled_db, reported, sqlite_db, test_location};

fn new_user(mobile: &str) -> User {
    User {
        id: Uuid::now_v7(),
        mobile: mobile.to_owned(),
        created_at: Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap(),
        last_login: None,
        last_refresh: None,
    }
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
}

// ── Users ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_return_existing_user_on_duplicate_mobile() {
    let db = sqlite_db().await;
    let repo = DbUserRepository { db };
    let first = new_user("09120000000");
    let second = new_user("09120000000");

    let created = repo.insert_or_get(&first).await.unwrap();
    let raced = repo.insert_or_get(&second).await.unwrap();

    assert_eq!(created.id, first.id);
    assert_eq!(raced.id, first.id, "second insert must resolve to the first row");
}

#[tokio::test]
async fn should_store_credential_apart_from_public_user() {
    let db = sqlite_db().await;
    let repo = DbUserRepository { db };
    let user = repo.insert_or_get(&new_user("09120000000")).await.unwrap();
    let at = Utc.with_ymd_and_hms(2025, 7, 2, 9, 30, 0).unwrap();

    assert_eq!(repo.encrypted_token(user.id).await.unwrap(), None);
    repo.update_login(user.id, "aa:bb:cc:dd", at).await.unwrap();

    assert_eq!(
        repo.encrypted_token(user.id).await.unwrap().as_deref(),
        Some("aa:bb:cc:dd")
    );
    let found = repo.find_by_mobile("09120000000").await.unwrap().unwrap();
    assert_eq!(found.last_login, Some(at));
    let json = serde_json::to_value(&found).unwrap();
    assert!(json.get("auth_token").is_none());
}

#[tokio::test]
async fn should_touch_last_refresh() {
    let db = sqlite_db().await;
    let repo = DbUserRepository { db };
    let user = repo.insert_or_get(&new_user("09120000000")).await.unwrap();
    let at = Utc.with_ymd_and_hms(2025, 7, 3, 6, 0, 0).unwrap();

    repo.touch_last_refresh(user.id, at).await.unwrap();

    let found = repo.find_by_mobile("09120000000").await.unwrap().unwrap();
    assert_eq!(found.last_refresh, Some(at));
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_load_session_with_owner_and_sweep_expired() {
    let db = sqlite_db().await;
    let users = DbUserRepository { db: db.clone() };
    let sessions = DbSessionRepository { db };
    let user = users.insert_or_get(&new_user("09120000000")).await.unwrap();
    let now = Utc::now();
    let live = Session {
        id: "live".to_owned(),
        user_id: user.id,
        expires_at: now + Duration::days(30),
    };
    let dead = Session {
        id: "dead".to_owned(),
        user_id: user.id,
        expires_at: now - Duration::minutes(1),
    };
    sessions.create(&live).await.unwrap();
    sessions.create(&dead).await.unwrap();

    let (session, owner) = sessions.find_with_user("live").await.unwrap().unwrap();
    assert_eq!(session.id, "live");
    assert_eq!(owner.id, user.id);

    assert_eq!(sessions.delete_expired(now).await.unwrap(), 1);
    assert!(sessions.find_with_user("dead").await.unwrap().is_none());
    assert_eq!(sessions.delete_all_for_user(user.id).await.unwrap(), 1);
    assert!(sessions.find_with_user("live").await.unwrap().is_none());
}

// ── Locations and outages ────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_duplicate_bill_per_user() {
    let db = sqlite_db().await;
    let users = DbUserRepository { db: db.clone() };
    let locations = DbLocationRepository { db };
    let alice = users.insert_or_get(&new_user("09120000000")).await.unwrap();
    let bob = users.insert_or_get(&new_user("09120000001")).await.unwrap();

    locations.create(&test_location(alice.id, "7001")).await.unwrap();
    let duplicate = locations.create(&test_location(alice.id, "7001")).await;
    assert!(
        matches!(duplicate, Err(TrackerError::DuplicateResource)),
        "expected DuplicateResource, got {duplicate:?}"
    );

    // Same bill id under another user is fine.
    locations.create(&test_location(bob.id, "7001")).await.unwrap();
}

#[tokio::test]
async fn should_replace_outage_set_wholesale() {
    let db = sqlite_db().await;
    let users = DbUserRepository { db: db.clone() };
    let locations = DbLocationRepository { db };
    let user = users.insert_or_get(&new_user("09120000000")).await.unwrap();
    let home = test_location(user.id, "7001");
    locations.create(&home).await.unwrap();

    locations
        .replace_blackouts(
            home.id,
            &[reported(date(10), "10:00", "12:00"), reported(date(11), "08:00", "09:00")],
        )
        .await
        .unwrap();
    locations
        .replace_blackouts(home.id, &[reported(date(12), "13:00", "15:00")])
        .await
        .unwrap();

    let rows = locations.list_upcoming(user.id, date(1)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].outage_date, date(12));
    assert_eq!(rows[0].reason.as_deref(), Some("maintenance"));

    locations.replace_blackouts(home.id, &[]).await.unwrap();
    assert!(locations.list_upcoming(user.id, date(1)).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_end_with_one_complete_set_after_concurrent_replaces() {
    let (db, _dir) = pooled_db().await;
    let users = DbUserRepository { db: db.clone() };
    let locations = DbLocationRepository { db };
    let user = users.insert_or_get(&new_user("09120000000")).await.unwrap();
    let home = test_location(user.id, "7001");
    locations.create(&home).await.unwrap();
    let home_id = home.id;

    let first = vec![reported(date(10), "10:00", "12:00"), reported(date(10), "14:00", "16:00")];
    let second = vec![
        reported(date(20), "01:00", "02:00"),
        reported(date(21), "03:00", "04:00"),
        reported(date(22), "05:00", "06:00"),
    ];
    let first_dates: Vec<NaiveDate> = first.iter().map(|r| r.outage_date).collect();
    let second_dates: Vec<NaiveDate> = second.iter().map(|r| r.outage_date).collect();

    for round in 0..20 {
        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let repo = locations.clone();
                let rows = if i % 2 == 0 { first.clone() } else { second.clone() };
                tokio::spawn(async move { repo.replace_blackouts(home_id, &rows).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let dates: Vec<NaiveDate> = locations
            .list_upcoming(user.id, date(1))
            .await
            .unwrap()
            .iter()
            .map(|r| r.outage_date)
            .collect();
        assert!(
            dates == first_dates || dates == second_dates,
            "round {round}: rows mixed concurrent replace calls: {dates:?}"
        );
    }
}

#[tokio::test]
async fn should_list_upcoming_in_date_then_start_order_for_owner_only() {
    let db = sqlite_db().await;
    let users = DbUserRepository { db: db.clone() };
    let locations = DbLocationRepository { db };
    let alice = users.insert_or_get(&new_user("09120000000")).await.unwrap();
    let bob = users.insert_or_get(&new_user("09120000001")).await.unwrap();
    let home = test_location(alice.id, "7001");
    let office = test_location(alice.id, "7002");
    let elsewhere = test_location(bob.id, "7003");
    for l in [&home, &office, &elsewhere] {
        locations.create(l).await.unwrap();
    }
    locations
        .replace_blackouts(
            home.id,
            &[reported(date(11), "14:00", "16:00"), reported(date(9), "08:00", "10:00")],
        )
        .await
        .unwrap();
    locations
        .replace_blackouts(office.id, &[reported(date(11), "09:00", "10:00")])
        .await
        .unwrap();
    locations
        .replace_blackouts(elsewhere.id, &[reported(date(11), "07:00", "08:00")])
        .await
        .unwrap();

    let rows = locations.list_upcoming(alice.id, date(10)).await.unwrap();

    let got: Vec<(NaiveDate, &str)> = rows
        .iter()
        .map(|r| (r.outage_date, r.start_time.as_str()))
        .collect();
    assert_eq!(got, vec![(date(11), "09:00"), (date(11), "14:00")]);
}

#[tokio::test]
async fn should_cascade_outages_on_location_delete() {
    let db = sqlite_db().await;
    let users = DbUserRepository { db: db.clone() };
    let locations = DbLocationRepository { db };
    let user = users.insert_or_get(&new_user("09120000000")).await.unwrap();
    let home = test_location(user.id, "7001");
    locations.create(&home).await.unwrap();
    locations
        .replace_blackouts(home.id, &[reported(date(10), "10:00", "12:00")])
        .await
        .unwrap();

    assert!(!locations.delete(home.id, Uuid::new_v4()).await.unwrap(), "foreign owner");
    assert!(locations.delete(home.id, user.id).await.unwrap());

    assert!(locations.list_by_user(user.id).await.unwrap().is_empty());
    assert!(locations.list_upcoming(user.id, date(1)).await.unwrap().is_empty());
    let orphans = barq_tracker_schema::blackouts::Entity::find()
        .all(&locations.db)
        .await
        .unwrap();
    assert!(orphans.is_empty());
}

// ── Watermark ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_upsert_watermark() {
    let db = sqlite_db().await;
    let repo = DbWatermarkRepository { db };
    let user_id = Uuid::now_v7();
    let first = Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap();
    let second = first + Duration::milliseconds(86_400_123);

    assert_eq!(repo.get(user_id).await.unwrap(), None);
    repo.set(user_id, first).await.unwrap();
    repo.set(user_id, second).await.unwrap();

    assert_eq!(repo.get(user_id).await.unwrap(), Some(second));
    let rows = meta::Entity::find().all(&repo.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, format!("lastRefresh_{user_id}"));
    assert_eq!(rows[0].value, "2025-07-02T08:00:00.123Z");
}

#[tokio::test]
async fn should_read_garbage_watermark_as_never_refreshed() {
    let db = sqlite_db().await;
    let user_id = Uuid::now_v7();
    meta::Entity::insert(meta::ActiveModel {
        key: Set(format!("lastRefresh_{user_id}")),
        value: Set("yesterday".to_owned()),
    })
    .exec_without_returning(&db)
    .await
    .unwrap();

    let repo = DbWatermarkRepository { db };
    assert_eq!(repo.get(user_id).await.unwrap(), None);
}
