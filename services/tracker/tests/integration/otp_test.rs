use std::sync::Arc;
use std::sync::atomic::Ordering;

use barq_tracker::domain::repository::ChallengeStore;
use barq_tracker::error::TrackerError;
use barq_tracker::infra::challenge::InMemoryChallengeStore;
use barq_tracker::usecase::otp::{SendOtpUseCase, VerifyOtpInput, VerifyOtpUseCase};

use crate::helpers::{
    MockOtp, MockSessionRepo, MockUserRepo, TEST_MOBILE, TEST_PROVIDER_TOKEN, test_cipher,
    test_user,
};

fn verify_usecase(
    otp: MockOtp,
    challenges: Arc<InMemoryChallengeStore>,
    users: MockUserRepo,
    sessions: MockSessionRepo,
) -> VerifyOtpUseCase<MockOtp, Arc<InMemoryChallengeStore>, MockUserRepo, MockSessionRepo> {
    VerifyOtpUseCase {
        otp,
        challenges,
        users,
        sessions,
        cipher: test_cipher(),
    }
}

fn input(challenge_id: &str, code: &str) -> VerifyOtpInput {
    VerifyOtpInput {
        challenge_id: challenge_id.to_owned(),
        code: code.to_owned(),
    }
}

// ── SendOtpUseCase ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_send_code_and_open_challenge() {
    let otp = MockOtp::accepting("123456", TEST_PROVIDER_TOKEN);
    let sent = Arc::clone(&otp.sent);
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let usecase = SendOtpUseCase {
        otp,
        challenges: Arc::clone(&challenges),
    };

    let id = usecase.execute(" 09120000000 ").await.unwrap();

    assert_eq!(sent.lock().unwrap().as_slice(), [TEST_MOBILE]);
    let challenge = challenges.get(&id).await.unwrap().unwrap();
    assert_eq!(challenge.mobile, TEST_MOBILE);
    assert_eq!(challenge.attempts, 0);
}

#[tokio::test]
async fn should_reject_invalid_mobile_without_calling_provider() {
    let otp = MockOtp::accepting("123456", TEST_PROVIDER_TOKEN);
    let sent = Arc::clone(&otp.sent);
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let usecase = SendOtpUseCase {
        otp,
        challenges: Arc::clone(&challenges),
    };

    let result = usecase.execute("12345").await;

    assert!(
        matches!(result, Err(TrackerError::InvalidMobile)),
        "expected InvalidMobile, got {result:?}"
    );
    assert!(sent.lock().unwrap().is_empty());
    assert!(challenges.is_empty());
}

#[tokio::test]
async fn should_not_open_challenge_when_provider_fails() {
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let usecase = SendOtpUseCase {
        otp: MockOtp::unavailable(),
        challenges: Arc::clone(&challenges),
    };

    let result = usecase.execute(TEST_MOBILE).await;

    assert!(
        matches!(result, Err(TrackerError::ExternalApiUnavailable(_))),
        "expected ExternalApiUnavailable, got {result:?}"
    );
    assert!(challenges.is_empty());
}

// ── VerifyOtpUseCase ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_user_and_store_encrypted_credential() {
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let id = challenges.create(TEST_MOBILE).await.unwrap();
    let users = MockUserRepo::empty();
    let stored = users.users_handle();
    let sessions = MockSessionRepo::empty();
    let session_rows = sessions.sessions_handle();
    let usecase = verify_usecase(
        MockOtp::accepting("123456", TEST_PROVIDER_TOKEN),
        Arc::clone(&challenges),
        users,
        sessions,
    );

    let out = usecase.execute(input(&id, "123456")).await.unwrap();

    assert_eq!(out.user.mobile, TEST_MOBILE);
    assert!(out.user.last_login.is_some());
    assert_eq!(out.session.user_id, out.user.id);
    assert_eq!(out.session.id.len(), 64);

    let stored = stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    let sealed = stored[0].auth_token.clone().unwrap();
    assert_ne!(sealed, TEST_PROVIDER_TOKEN);
    assert_eq!(test_cipher().open(&sealed).unwrap(), TEST_PROVIDER_TOKEN);

    assert_eq!(session_rows.lock().unwrap().len(), 1);
    assert!(challenges.get(&id).await.unwrap().is_none(), "challenge must be consumed");
}

#[tokio::test]
async fn should_reuse_existing_user_and_replace_credential() {
    let user = test_user();
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let id = challenges.create(TEST_MOBILE).await.unwrap();
    let users = MockUserRepo::new(vec![crate::helpers::stored_user_with_token(&user, "old-token")]);
    let stored = users.users_handle();
    let usecase = verify_usecase(
        MockOtp::accepting("123456", "new-token"),
        challenges,
        users,
        MockSessionRepo::empty(),
    );

    let out = usecase.execute(input(&id, "123456")).await.unwrap();

    assert_eq!(out.user.id, user.id);
    let stored = stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    let sealed = stored[0].auth_token.as_deref().unwrap();
    assert_eq!(test_cipher().open(sealed).unwrap(), "new-token");
}

#[tokio::test]
async fn should_lock_challenge_after_five_wrong_codes() {
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let id = challenges.create(TEST_MOBILE).await.unwrap();
    let otp = MockOtp::accepting("123456", TEST_PROVIDER_TOKEN);
    let verify_calls = Arc::clone(&otp.verify_calls);
    let usecase = verify_usecase(
        otp,
        Arc::clone(&challenges),
        MockUserRepo::empty(),
        MockSessionRepo::empty(),
    );

    for n in 1..=4 {
        let result = usecase.execute(input(&id, "000000")).await;
        assert!(
            matches!(result, Err(TrackerError::ExternalApiRejected(_))),
            "attempt {n}: expected ExternalApiRejected, got {result:?}"
        );
    }

    let fifth = usecase.execute(input(&id, "000000")).await;
    assert!(
        matches!(fifth, Err(TrackerError::InvalidChallenge)),
        "expected InvalidChallenge, got {fifth:?}"
    );

    // Even the right code is refused once the challenge is gone.
    let sixth = usecase.execute(input(&id, "123456")).await;
    assert!(
        matches!(sixth, Err(TrackerError::InvalidChallenge)),
        "expected InvalidChallenge, got {sixth:?}"
    );
    assert_eq!(verify_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn should_reject_consumed_challenge() {
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let id = challenges.create(TEST_MOBILE).await.unwrap();
    let usecase = verify_usecase(
        MockOtp::accepting("123456", TEST_PROVIDER_TOKEN),
        challenges,
        MockUserRepo::empty(),
        MockSessionRepo::empty(),
    );

    usecase.execute(input(&id, "123456")).await.unwrap();
    let again = usecase.execute(input(&id, "123456")).await;

    assert!(
        matches!(again, Err(TrackerError::InvalidChallenge)),
        "expected InvalidChallenge, got {again:?}"
    );
}

#[tokio::test]
async fn should_log_in_once_when_same_challenge_is_verified_concurrently() {
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let id = challenges.create(TEST_MOBILE).await.unwrap();
    let otp = MockOtp::accepting("123456", TEST_PROVIDER_TOKEN);
    let verify_calls = Arc::clone(&otp.verify_calls);
    let sessions = MockSessionRepo::empty();
    let stored = sessions.sessions_handle();
    let usecase = verify_usecase(otp, challenges, MockUserRepo::empty(), sessions);

    let (a, b) = tokio::join!(
        usecase.execute(input(&id, "123456")),
        usecase.execute(input(&id, "123456")),
    );

    assert_eq!(verify_calls.load(Ordering::SeqCst), 2);
    let (ok, rejected) = match (a, b) {
        (Ok(ok), Err(e)) | (Err(e), Ok(ok)) => (ok, e),
        other => panic!("expected exactly one login, got {other:?}"),
    };
    assert!(
        matches!(rejected, TrackerError::InvalidChallenge),
        "expected InvalidChallenge, got {rejected:?}"
    );
    let stored = stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, ok.session.id);
}

#[tokio::test]
async fn should_reject_unknown_challenge() {
    let usecase = verify_usecase(
        MockOtp::accepting("123456", TEST_PROVIDER_TOKEN),
        Arc::new(InMemoryChallengeStore::new()),
        MockUserRepo::empty(),
        MockSessionRepo::empty(),
    );

    let result = usecase.execute(input("missing", "123456")).await;

    assert!(
        matches!(result, Err(TrackerError::InvalidChallenge)),
        "expected InvalidChallenge, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_spend_attempt_on_blank_code() {
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let id = challenges.create(TEST_MOBILE).await.unwrap();
    let usecase = verify_usecase(
        MockOtp::accepting("123456", TEST_PROVIDER_TOKEN),
        Arc::clone(&challenges),
        MockUserRepo::empty(),
        MockSessionRepo::empty(),
    );

    let result = usecase.execute(input(&id, "   ")).await;

    assert!(
        matches!(result, Err(TrackerError::MissingData)),
        "expected MissingData, got {result:?}"
    );
    assert_eq!(challenges.get(&id).await.unwrap().unwrap().attempts, 0);
}
