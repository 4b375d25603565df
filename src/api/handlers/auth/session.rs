//! Session cookie carrying the login JWT.

use super::state::AuthConfig;
use axum::http::{header::InvalidHeaderValue, HeaderValue};
use std::time::Duration;

pub const SESSION_COOKIE_NAME: &str = "token";

/// Build an `HttpOnly`, `SameSite=Strict` cookie whose `Max-Age` matches the
/// token TTL.
pub(super) fn session_cookie(
    config: &AuthConfig,
    ttl: Duration,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = ttl.as_secs();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
