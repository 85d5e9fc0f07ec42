/// Session credential extraction
use axum::http::{request::Parts, HeaderMap};
use axum::extract::Query;
use axum_extra::headers::{Cookie, HeaderMapExt};
use std::collections::HashMap;

/// Cookie and query parameter carrying the session token
pub const SESSION_COOKIE: &str = "accessToken";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extract the session cookie
pub fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(SESSION_COOKIE).map(str::to_string))
        .filter(|t| !t.is_empty())
}

/// Session token from the header, then the cookie, then the query string
pub fn extract_session_token(parts: &Parts) -> Option<String> {
    extract_bearer_token(&parts.headers)
        .or_else(|| extract_cookie_token(&parts.headers))
        .or_else(|| {
            Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(mut params)| params.remove(SESSION_COOKIE))
                .filter(|t| !t.is_empty())
        })
}

/// `Set-Cookie` value for a freshly issued session token
pub fn session_cookie(token: &str, max_age_secs: i64, domain: Option<&str>, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    );
    if let Some(domain) = domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_header_wins_over_cookie_and_query() {
        let p = parts(
            Request::builder()
                .uri("/meetings?accessToken=from-query")
                .header("authorization", "Bearer from-header")
                .header("cookie", "accessToken=from-cookie"),
        );
        assert_eq!(extract_session_token(&p).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_cookie_then_query() {
        let p = parts(
            Request::builder()
                .uri("/meetings?accessToken=from-query")
                .header("cookie", "theme=dark; accessToken=from-cookie"),
        );
        assert_eq!(extract_session_token(&p).as_deref(), Some("from-cookie"));

        let p = parts(Request::builder().uri("/auth/zoom?accessToken=from-query"));
        assert_eq!(extract_session_token(&p).as_deref(), Some("from-query"));

        let p = parts(Request::builder().uri("/auth/zoom"));
        assert!(extract_session_token(&p).is_none());
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic abc".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        assert_eq!(
            session_cookie("abc", 3600, None, false),
            "accessToken=abc; Max-Age=3600; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(session_cookie("abc", 60, Some("example.com"), true)
            .ends_with("; Domain=example.com; Secure"));
    }
}
