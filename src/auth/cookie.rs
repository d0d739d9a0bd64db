//! `token` cookie handling.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};

pub const TOKEN_COOKIE_NAME: &str = "token";

// Browsers drop SameSite=None cookies that are not also Secure.
const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=None";

/// Build the session cookie carrying a signed token. No expiry is set, so it
/// lives until logout or until the browser discards it.
pub fn session_cookie(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{TOKEN_COOKIE_NAME}={token}; {COOKIE_ATTRIBUTES}"
    ))
}

/// Overwrite the session cookie with an empty, already expired one.
pub fn clear_session_cookie() -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{TOKEN_COOKIE_NAME}=; {COOKIE_ATTRIBUTES}; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
    ))
}

/// Value of the `token` cookie, if the request carries a non-empty one.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == TOKEN_COOKIE_NAME).then(|| val.trim())
        })
        .find(|val| !val.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(cookies: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for c in cookies {
            headers.append(COOKIE, HeaderValue::from_static(c));
        }
        headers
    }

    #[test]
    fn session_cookie_has_required_attributes() {
        let value = session_cookie("abc.def.ghi").unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("token=abc.def.ghi;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Secure"));
        assert!(value.contains("SameSite=None"));
        assert!(!value.contains("Expires"));
        assert!(!value.contains("Max-Age"));
    }

    #[test]
    fn clear_cookie_is_empty_and_expired() {
        let value = clear_session_cookie().unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("token=;"));
        assert!(value.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(value.contains("HttpOnly"));
    }

    #[test]
    fn session_cookie_rejects_header_breaking_values() {
        assert!(session_cookie("bad\nvalue").is_err());
    }

    #[test]
    fn extract_token_finds_named_cookie() {
        let headers = headers_with(&["theme=dark; token=abc; other=1"]);
        assert_eq!(extract_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn extract_token_scans_multiple_cookie_headers() {
        let headers = headers_with(&["a=1", "token=xyz"]);
        assert_eq!(extract_token(&headers), Some("xyz".to_string()));
    }

    #[test]
    fn extract_token_ignores_missing_empty_and_similar_names() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers_with(&["token="])), None);
        assert_eq!(extract_token(&headers_with(&["tokens=abc; xtoken=1"])), None);
    }
}
