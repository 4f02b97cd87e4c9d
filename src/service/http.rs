use super::NotesService;
use crate::{
    config,
    errors::{NotesError, Result},
    models::{LoginForm, LoginResponse, Note, NoteDraft, NoteId, SignupForm},
    session::Session,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

/// Typed client for the REST notes API (`/auth/*`, `/notes/*`).
pub struct HttpNotesService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNotesService {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

trait WithSession {
    fn with_session(self, session: &Session) -> Self;
}

impl WithSession for RequestBuilder {
    fn with_session(self, session: &Session) -> Self {
        self.bearer_auth(&session.token)
    }
}

/// Error bodies look like `{"message": "..."}`.
#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: Option<String>,
}

/// Send the request and translate non-2xx statuses. `id` is the note the
/// request is about, if any, so that a 404 can name it.
async fn send(request: RequestBuilder, id: Option<&NoteId>) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        warn!("notes service request failed: {e}");
        NotesError::ServiceUnavailable(e.to_string())
    })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ApiMessage>()
        .await
        .ok()
        .and_then(|m| m.message);
    debug!(%status, ?message, "notes service returned an error");

    Err(match (status, id) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            NotesError::Unauthenticated
        }
        (StatusCode::NOT_FOUND, Some(id)) => NotesError::NotFound(id.clone()),
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) => {
            NotesError::Validation(message.unwrap_or_else(|| {
                "The notes service rejected the request".to_string()
            }))
        }
        _ => NotesError::ServiceUnavailable(
            message.unwrap_or_else(|| status.to_string()),
        ),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response.json::<T>().await.map_err(|e| {
        NotesError::ServiceUnavailable(format!("malformed response: {e}"))
    })
}

#[async_trait]
impl NotesService for HttpNotesService {
    async fn list_notes(
        &self,
        session: &Session,
        archived: bool,
    ) -> Result<Vec<Note>> {
        debug!(archived, "listing notes");
        let request = self
            .client
            .get(self.url("/notes"))
            .query(&[("archived", archived)])
            .with_session(session);
        decode(send(request, None).await?).await
    }

    async fn create_note(
        &self,
        session: &Session,
        draft: &NoteDraft,
    ) -> Result<Note> {
        debug!(title = %draft.title, "creating note");
        let request = self
            .client
            .post(self.url("/notes"))
            .json(draft)
            .with_session(session);
        decode(send(request, None).await?).await
    }

    async fn update_note(
        &self,
        session: &Session,
        id: &NoteId,
        draft: &NoteDraft,
    ) -> Result<Note> {
        debug!(%id, "updating note");
        let request = self
            .client
            .put(self.url(&format!("/notes/{id}")))
            .json(draft)
            .with_session(session);
        decode(send(request, Some(id)).await?).await
    }

    async fn delete_note(&self, session: &Session, id: &NoteId) -> Result<()> {
        debug!(%id, "deleting note");
        let request = self
            .client
            .delete(self.url(&format!("/notes/{id}")))
            .with_session(session);
        send(request, Some(id)).await?;
        Ok(())
    }

    async fn toggle_pin(&self, session: &Session, id: &NoteId) -> Result<Note> {
        debug!(%id, "toggling pin");
        let request = self
            .client
            .patch(self.url(&format!("/notes/{id}/pin")))
            .with_session(session);
        decode(send(request, Some(id)).await?).await
    }

    async fn toggle_archive(
        &self,
        session: &Session,
        id: &NoteId,
    ) -> Result<Note> {
        debug!(%id, "toggling archive");
        let request = self
            .client
            .patch(self.url(&format!("/notes/{id}/archive")))
            .with_session(session);
        decode(send(request, Some(id)).await?).await
    }

    async fn signup(&self, form: &SignupForm) -> Result<()> {
        let request = self.client.post(self.url("/auth/signup")).json(form);
        send(request, None).await?;
        Ok(())
    }

    async fn login(&self, form: &LoginForm) -> Result<LoginResponse> {
        let request = self.client.post(self.url("/auth/login")).json(form);
        match send(request, None).await {
            Ok(response) => decode(response).await,
            Err(NotesError::Unauthenticated) => Err(NotesError::Validation(
                "Invalid email or password".to_string(),
            )),
            Err(e) => Err(e),
        }
    }
}
