// Session cookies carrying the access and refresh tokens

use axum::http::{header, HeaderName};
use axum::response::AppendHeaders;
use std::time::Duration;

use crate::infrastructure::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::infrastructure::{TokenPair, TokenService};

pub type CookieHeaders = AppendHeaders<[(HeaderName, String); 2]>;

fn cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> String {
    // Browsers drop SameSite=None cookies that are not Secure
    let attributes = if secure {
        "HttpOnly; Secure; SameSite=None"
    } else {
        "HttpOnly; SameSite=Lax"
    };
    format!(
        "{}={}; {}; Path=/; Max-Age={}",
        name,
        value,
        attributes,
        max_age.as_secs()
    )
}

pub fn session_cookies(pair: &TokenPair, tokens: &TokenService, secure: bool) -> CookieHeaders {
    AppendHeaders([
        (
            header::SET_COOKIE,
            cookie(ACCESS_TOKEN_COOKIE, &pair.access_token, tokens.access_ttl(), secure),
        ),
        (
            header::SET_COOKIE,
            cookie(REFRESH_TOKEN_COOKIE, &pair.refresh_token, tokens.refresh_ttl(), secure),
        ),
    ])
}

pub fn clear_session_cookies(secure: bool) -> CookieHeaders {
    AppendHeaders([
        (header::SET_COOKIE, cookie(ACCESS_TOKEN_COOKIE, "", Duration::ZERO, secure)),
        (header::SET_COOKIE, cookie(REFRESH_TOKEN_COOKIE, "", Duration::ZERO, secure)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_attributes() {
        let secure = cookie("accessToken", "abc", Duration::from_secs(60), true);
        assert_eq!(secure, "accessToken=abc; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=60");

        let cleared = cookie("refreshToken", "", Duration::ZERO, false);
        assert!(cleared.starts_with("refreshToken=; HttpOnly"));
        assert!(cleared.ends_with("Max-Age=0"));
    }
}
