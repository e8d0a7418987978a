//! Cookie builders for the session token and the OTP challenge id.
//!
//! Both cookies are `HttpOnly`, `SameSite=Lax`, scoped to `/`, and `Secure`
//! unless the service runs without TLS (local development).

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the long-lived session token.
pub const SESSION_COOKIE: &str = "auth-session";

/// Cookie name for the in-flight OTP challenge id.
pub const CHALLENGE_COOKIE: &str = "otp-session";

/// Session lifetime in seconds (30 days).
pub const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// OTP challenge lifetime in seconds (10 minutes).
pub const CHALLENGE_MAX_AGE_SECS: i64 = 10 * 60;

fn build(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Set the session cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use barq_auth_types::cookie::{set_session_cookie, SESSION_COOKIE};
///
/// let jar = set_session_cookie(CookieJar::new(), "abc".to_string(), true);
/// let cookie = jar.get(SESSION_COOKIE).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_session_cookie(jar: CookieJar, value: String, secure: bool) -> CookieJar {
    jar.add(build(
        SESSION_COOKIE,
        value,
        Duration::seconds(SESSION_MAX_AGE_SECS),
        secure,
    ))
}

/// Set the OTP challenge cookie on the jar. Carries only the opaque challenge id.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use barq_auth_types::cookie::{set_challenge_cookie, CHALLENGE_COOKIE};
///
/// let jar = set_challenge_cookie(CookieJar::new(), "c1".to_string(), false);
/// let cookie = jar.get(CHALLENGE_COOKIE).unwrap();
/// assert_eq!(cookie.max_age(), Some(time::Duration::minutes(10)));
/// assert!(!cookie.secure().unwrap_or(false));
/// ```
pub fn set_challenge_cookie(jar: CookieJar, value: String, secure: bool) -> CookieJar {
    jar.add(build(
        CHALLENGE_COOKIE,
        value,
        Duration::seconds(CHALLENGE_MAX_AGE_SECS),
        secure,
    ))
}

/// Expire the session cookie (Max-Age 0).
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use barq_auth_types::cookie::{clear_session_cookie, set_session_cookie, SESSION_COOKIE};
///
/// let jar = set_session_cookie(CookieJar::new(), "abc".to_string(), true);
/// let jar = clear_session_cookie(jar, true);
/// assert_eq!(jar.get(SESSION_COOKIE).unwrap().max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(build(SESSION_COOKIE, String::new(), Duration::ZERO, secure))
}

/// Expire the OTP challenge cookie (Max-Age 0).
pub fn clear_challenge_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(build(CHALLENGE_COOKIE, String::new(), Duration::ZERO, secure))
}

/// Read the session token, ignoring empty values left by a cleared cookie.
pub fn session_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, SESSION_COOKIE)
}

/// Read the OTP challenge id, ignoring empty values left by a cleared cookie.
pub fn challenge_id(jar: &CookieJar) -> Option<String> {
    non_empty(jar, CHALLENGE_COOKIE)
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}
