use super::{config, htmx, models::AppState, session, session::Session};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Response,
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// A valid, unexpired session read from the signed cookie. Handlers that
/// take this never run for anonymous users; those are sent to the login
/// page instead.
pub struct AuthSession(pub Session);

fn cookie_value(cookie: &str) -> Option<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(&format!(r"(?:^|;\s*){}=([^;]+)", config::SESSION_COOKIE))
            .expect("session cookie pattern is a valid regex")
    });
    re.captures(cookie)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn session_from_headers(headers: &HeaderMap, secret: &[u8]) -> Option<Session> {
    let session = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(cookie_value)
        .and_then(|token| match session::deserialize_session(token, secret) {
            Ok(session) => Some(session),
            Err(reason) => {
                debug!("ignoring session cookie: {reason}");
                None
            }
        })?;
    if session.is_expired(session::now()) {
        debug!(email = %session.user.email, "session expired");
        return None;
    }
    Some(session)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers, &state.session_secret)
            .map(AuthSession)
            .ok_or_else(|| htmx::navigate("/login", &parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"test secret";

    fn session(created_at: u64) -> Session {
        Session {
            user: User {
                name: "Ada".into(),
                email: "ada@example.com".into(),
            },
            token: "tok".into(),
            created_at,
        }
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_session_is_found_among_other_cookies() {
        let signed = session::serialize_session(&session(session::now()), SECRET);
        let headers = headers_with(&format!("theme=dark; session={signed}; other=1"));
        let found = session_from_headers(&headers, SECRET).expect("a session");
        assert_eq!(found.user.email, "ada@example.com");
    }

    #[test]
    fn test_missing_forged_or_expired_sessions_are_ignored() {
        assert!(session_from_headers(&HeaderMap::new(), SECRET).is_none());
        assert!(session_from_headers(&headers_with("session=nope"), SECRET).is_none());
        assert!(session_from_headers(&headers_with("mysession=x:y"), SECRET).is_none());

        let signed = session::serialize_session(&session(session::now()), b"other");
        assert!(
            session_from_headers(&headers_with(&format!("session={signed}")), SECRET)
                .is_none()
        );

        let stale = session::serialize_session(&session(0), SECRET);
        assert!(
            session_from_headers(&headers_with(&format!("session={stale}")), SECRET)
                .is_none()
        );
    }
}
