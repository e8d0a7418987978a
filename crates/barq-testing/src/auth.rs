//! Cookie headers for driving authenticated requests in router tests.

use http::header::{COOKIE, HeaderName, HeaderValue};

use barq_auth_types::cookie::{CHALLENGE_COOKIE, SESSION_COOKIE};

/// `Cookie` header carrying the given `name=value` pairs.
pub fn cookie_header(pairs: &[(&str, &str)]) -> (HeaderName, HeaderValue) {
    let value = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    (
        COOKIE,
        HeaderValue::from_str(&value).expect("cookie header must be visible ASCII"),
    )
}

/// `Cookie` header presenting a session token.
pub fn session_cookie(token: &str) -> (HeaderName, HeaderValue) {
    cookie_header(&[(SESSION_COOKIE, token)])
}

/// `Cookie` header presenting an OTP challenge id.
pub fn challenge_cookie(id: &str) -> (HeaderName, HeaderValue) {
    cookie_header(&[(CHALLENGE_COOKIE, id)])
}
