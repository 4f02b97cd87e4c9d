use super::{components, components::Component, htmx, models::NoteId, session};
use anyhow::Error;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Failures of the notes service and of the collection view built on it.
/// Every variant is recoverable; the user can retry the action.
#[derive(Debug, Error)]
pub enum NotesError {
    /// A required draft field is missing. Raised before any service call.
    #[error("{0}")]
    Validation(String),

    #[error("note {0} no longer exists")]
    NotFound(NoteId),

    #[error("the notes service is unavailable ({0})")]
    ServiceUnavailable(String),

    #[error("your session is missing or has expired")]
    Unauthenticated,
}

pub type Result<T> = std::result::Result<T, NotesError>;

#[derive(Debug)]
pub struct ServerError(Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let Some(err) = self.0.downcast_ref::<NotesError>() else {
            error!("{:?}", self.0);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
                .into_response();
        };
        let status = match err {
            // We don't know here whether htmx or a plain navigation asked,
            // so answer in a way both of them follow. The cookie still
            // verifies but its credential is dead, so drop it too.
            NotesError::Unauthenticated => {
                debug!("unauthenticated request; redirecting");
                let mut headers = htmx::redirect("/login");
                if let Ok(cookie) =
                    HeaderValue::from_str(&session::clear_session_cookie())
                {
                    headers.insert(header::SET_COOKIE, cookie);
                }
                return (
                    StatusCode::UNAUTHORIZED,
                    headers,
                    r#"<meta http-equiv="refresh" content="0; url=/login">"#,
                )
                    .into_response();
            }
            NotesError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NotesError::NotFound(_) => StatusCode::NOT_FOUND,
            NotesError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        warn!(%status, "{err}");
        let banner = components::ErrorBanner {
            message: &err.to_string(),
        };
        (status, htmx::retarget_flash(), banner.render()).into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>`
// or `Result<_, NotesError>` to turn them into `Result<_, ServerError>`.
impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
