use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use uuid::Uuid;

use barq_tracker::domain::types::Session;
use barq_tracker::usecase::session::{SessionUseCase, new_session};

use crate::helpers::{MockSessionRepo, test_user};

fn session(user_id: Uuid, expires_in: Duration) -> Session {
    Session {
        id: "s1".to_owned(),
        user_id,
        expires_at: Utc::now() + expires_in,
    }
}

#[test]
fn should_issue_session_with_thirty_day_expiry() {
    let user = test_user();
    let now = Utc::now();

    let created = new_session(user.id, now);

    assert_eq!(created.user_id, user.id);
    assert_eq!(created.expires_at, now + Duration::days(30));
    assert_eq!(created.id.len(), 64);
    assert_ne!(created.id, new_session(user.id, now).id);
}

#[tokio::test]
async fn should_return_user_without_touching_fresh_session() {
    let user = test_user();
    let repo = MockSessionRepo::new(vec![session(user.id, Duration::days(20))], vec![user.clone()]);
    let updates = repo.expiry_updates.clone();
    let usecase = SessionUseCase { sessions: repo };

    let (found, _) = usecase.validate("s1").await.unwrap().unwrap();

    assert_eq!(found, user);
    assert_eq!(updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn should_slide_expiry_when_less_than_fifteen_days_left() {
    let user = test_user();
    let repo = MockSessionRepo::new(vec![session(user.id, Duration::days(10))], vec![user.clone()]);
    let rows = repo.sessions_handle();
    let usecase = SessionUseCase { sessions: repo };

    let (_, renewed) = usecase.validate("s1").await.unwrap().unwrap();

    assert!(renewed.expires_at - Utc::now() > Duration::days(29));
    assert_eq!(rows.lock().unwrap()[0].expires_at, renewed.expires_at);
}

#[tokio::test]
async fn should_delete_expired_session_on_access() {
    let user = test_user();
    let repo = MockSessionRepo::new(vec![session(user.id, -Duration::seconds(1))], vec![user]);
    let rows = repo.sessions_handle();
    let usecase = SessionUseCase { sessions: repo };

    assert!(usecase.validate("s1").await.unwrap().is_none());
    assert!(rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_return_none_for_unknown_session() {
    let usecase = SessionUseCase {
        sessions: MockSessionRepo::empty(),
    };
    assert!(usecase.validate("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn should_revoke_all_sessions_of_user() {
    let user = test_user();
    let other = Uuid::new_v4();
    let mut mine = session(user.id, Duration::days(20));
    let mut theirs = session(other, Duration::days(20));
    mine.id = "a".to_owned();
    theirs.id = "b".to_owned();
    let repo = MockSessionRepo::new(vec![mine, theirs], vec![user.clone()]);
    let rows = repo.sessions_handle();
    let usecase = SessionUseCase { sessions: repo };

    assert_eq!(usecase.delete_all(user.id).await.unwrap(), 1);
    let rows = rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, other);
}

#[tokio::test]
async fn should_sweep_only_expired_sessions() {
    let user = test_user();
    let mut live = session(user.id, Duration::days(1));
    let mut dead = session(user.id, -Duration::days(1));
    live.id = "live".to_owned();
    dead.id = "dead".to_owned();
    let repo = MockSessionRepo::new(vec![live, dead], vec![user]);
    let rows = repo.sessions_handle();
    let usecase = SessionUseCase { sessions: repo };

    assert_eq!(usecase.sweep_expired().await.unwrap(), 1);
    assert_eq!(rows.lock().unwrap()[0].id, "live");
}
