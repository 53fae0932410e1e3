//! Cookie transport for the token pair.
//!
//! Both tokens travel as `HttpOnly` cookies; refresh additionally accepts a
//! body field handled by the refresh handler.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

use super::state::AuthConfig;

pub(crate) const ACCESS_COOKIE: &str = "accessToken";
pub(crate) const REFRESH_COOKIE: &str = "refreshToken";

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build `Set-Cookie` values carrying a fresh token pair.
pub(crate) fn session_cookies(
    config: &AuthConfig,
    access_token: &str,
    refresh_token: &str,
) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    let secure = config.cookie_secure();
    Ok(vec![
        cookie(
            ACCESS_COOKIE,
            access_token,
            config.access_token_ttl_secs(),
            secure,
        )?,
        cookie(
            REFRESH_COOKIE,
            refresh_token,
            config.refresh_token_ttl_secs(),
            secure,
        )?,
    ])
}

/// Build `Set-Cookie` values that expire both token cookies.
pub(crate) fn clear_session_cookies(
    config: &AuthConfig,
) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    let secure = config.cookie_secure();
    Ok(vec![
        cookie(ACCESS_COOKIE, "", 0, secure)?,
        cookie(REFRESH_COOKIE, "", 0, secure)?,
    ])
}

/// Append `Set-Cookie` headers to a response header map.
pub(crate) fn apply_cookies(headers: &mut HeaderMap, cookies: Vec<HeaderValue>) {
    for value in cookies {
        headers.append(SET_COOKIE, value);
    }
}

/// Extract the access token: cookie first, bearer header as fallback.
pub(crate) fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_COOKIE).or_else(|| bearer_token(headers))
}

/// Extract the refresh token cookie, if present.
pub(crate) fn extract_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, REFRESH_COOKIE)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;

    fn test_config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret"),
            SecretString::from("refresh-secret"),
        )
    }

    #[test]
    fn session_cookies_carry_attributes() -> Result<()> {
        let cookies = session_cookies(&test_config(), "acc", "ref")?;
        let access = cookies[0].to_str()?;
        let refresh = cookies[1].to_str()?;

        assert!(access.starts_with("accessToken=acc;"));
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("SameSite=Lax"));
        assert!(access.contains("Max-Age=900"));
        assert!(!access.contains("Secure"));

        assert!(refresh.starts_with("refreshToken=ref;"));
        assert!(refresh.contains("Max-Age=864000"));
        Ok(())
    }

    #[test]
    fn secure_flag_follows_config() -> Result<()> {
        let config = test_config().with_public_base_url("https://vidtube.dev".to_string());
        let cookies = session_cookies(&config, "acc", "ref")?;
        assert!(cookies[0].to_str()?.contains("; Secure"));
        assert!(cookies[1].to_str()?.contains("; Secure"));
        Ok(())
    }

    #[test]
    fn clear_cookies_expire_immediately() -> Result<()> {
        let cookies = clear_session_cookies(&test_config())?;
        assert!(cookies[0].to_str()?.starts_with("accessToken=;"));
        assert!(cookies[0].to_str()?.contains("Max-Age=0"));
        assert!(cookies[1].to_str()?.starts_with("refreshToken=;"));
        Ok(())
    }

    #[test]
    fn access_token_prefers_cookie_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("accessToken=from-cookie; other=1"),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(
            extract_access_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn access_token_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(
            extract_access_token(&headers),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn missing_transport_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_access_token(&headers), None);
        assert_eq!(extract_refresh_cookie(&headers), None);
    }

    #[test]
    fn empty_cookie_value_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("accessToken=; a=b"));
        assert_eq!(extract_access_token(&headers), None);
    }

    #[test]
    fn refresh_cookie_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("accessToken=a; refreshToken=r"),
        );
        assert_eq!(extract_refresh_cookie(&headers), Some("r".to_string()));
    }

    #[test]
    fn apply_cookies_appends_all() -> Result<()> {
        let mut headers = HeaderMap::new();
        let cookies = session_cookies(&test_config(), "acc", "ref")?;
        apply_cookies(&mut headers, cookies);
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
        Ok(())
    }
}
