use super::{extractors, models::AppState};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::info;

/// Everything we serve is HTML, except downloads, which set their own
/// content type next to a `Content-Disposition`.
pub async fn html_headers<B>(request: Request<B>, next: Next<B>) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if !headers.contains_key(header::CONTENT_DISPOSITION) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }

    response
}

/// When the notes service rejects a session's credential, drop the view
/// held for it. The response itself clears the cookie.
pub async fn forget_rejected_sessions<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let mut cookies = HeaderMap::new();
    for value in request.headers().get_all(header::COOKIE) {
        cookies.append(header::COOKIE, value.clone());
    }
    let response = next.run(request).await;
    if response.status() == StatusCode::UNAUTHORIZED {
        if let Some(session) =
            extractors::session_from_headers(&cookies, &state.session_secret)
        {
            info!(email = %session.user.email, "notes service rejected the session");
            state.views.forget(&session).await;
        }
    }

    response
}
