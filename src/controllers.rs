use super::{
    auth,
    collection::{DeleteConfirmation, NotesCollection},
    components,
    components::Component,
    errors::{NotesError, ServerError},
    export,
    extractors::AuthSession,
    htmx,
    models::{AppState, Color, LoginForm, NoteDraft, NoteId, SignupForm, SortBy},
    session,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

/// The note list, the tag filter that depends on it and, after a
/// successful submission, a blank editor.
fn list_update(collection: &NotesCollection, reset_editor: bool) -> String {
    let visible = collection.visible();
    let tags = collection.tags();
    let blank = NoteDraft::default();
    components::ListUpdate {
        list: components::NoteList {
            notes: &visible,
            view: collection.view(),
            archived: collection.archived(),
            now: Utc::now(),
        },
        tags: &tags,
        editor: reset_editor.then_some(components::NoteEditor {
            draft: &blank,
            editing: None,
            oob: true,
        }),
    }
    .render()
}

fn with_cookie(mut response: Response, cookie: &str) -> Result<Response, ServerError> {
    response
        .headers_mut()
        .insert(header::SET_COOKIE, HeaderValue::from_str(cookie)?);
    Ok(response)
}

pub async fn root(session: Option<AuthSession>) -> impl IntoResponse {
    let user = session.as_ref().map(|AuthSession(s)| &s.user);
    components::Page {
        title: "Notes App",
        user,
        children: Box::new(components::Home {
            logged_in: user.is_some(),
        }),
    }
    .render()
}

pub async fn ping() -> impl IntoResponse {
    "pong"
}

pub async fn login_form(
    session: Option<AuthSession>,
    headers: HeaderMap,
) -> Response {
    if session.is_some() {
        return htmx::navigate("/dashboard", &headers);
    }
    components::Page {
        title: "Login",
        user: None,
        children: Box::new(components::LoginPage {
            error: None,
            email: "",
        }),
    }
    .render()
    .into_response()
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ServerError> {
    match auth::authenticate(state.service.as_ref(), &form).await {
        Ok(session) => with_cookie(
            htmx::navigate("/dashboard", &headers),
            &session::session_cookie(&session, &state.session_secret),
        ),
        Err(err @ (NotesError::Validation(_) | NotesError::ServiceUnavailable(_))) => {
            info!(email = %form.email, "login failed: {err}");
            Ok(components::Page {
                title: "Login",
                user: None,
                children: Box::new(components::LoginPage {
                    error: Some(&err.to_string()),
                    email: &form.email,
                }),
            }
            .render()
            .into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn signup_form(
    session: Option<AuthSession>,
    headers: HeaderMap,
) -> Response {
    if session.is_some() {
        return htmx::navigate("/dashboard", &headers);
    }
    components::Page {
        title: "Signup",
        user: None,
        children: Box::new(components::SignupPage {
            error: None,
            name: "",
            email: "",
        }),
    }
    .render()
    .into_response()
}

pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Result<Response, ServerError> {
    match auth::register(state.service.as_ref(), &form).await {
        Ok(()) => Ok(htmx::navigate("/login", &headers)),
        Err(err @ (NotesError::Validation(_) | NotesError::ServiceUnavailable(_))) => {
            info!(email = %form.email, "signup failed: {err}");
            Ok(components::Page {
                title: "Signup",
                user: None,
                children: Box::new(components::SignupPage {
                    error: Some(&err.to_string()),
                    name: &form.name,
                    email: &form.email,
                }),
            }
            .render()
            .into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    session: Option<AuthSession>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    if let Some(AuthSession(session)) = session {
        state.views.forget(&session).await;
        info!(email = %session.user.email, "logged out");
    }
    with_cookie(htmx::navigate("/", &headers), &session::clear_session_cookie())
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    archived: Option<bool>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(DashboardQuery { archived }): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let mut collection = state.views.checkout(&state.service, &session).await;
    let error = match collection.load(archived.unwrap_or(false)).await {
        Ok(_) => None,
        Err(NotesError::Unauthenticated) => {
            return Err(NotesError::Unauthenticated.into())
        }
        Err(err) => Some(err.to_string()),
    };
    let visible = collection.visible();
    let tags = collection.tags();
    let page = components::Page {
        title: "Dashboard",
        user: Some(&session.user),
        children: Box::new(components::Dashboard {
            notes: &visible,
            view: collection.view(),
            tags: &tags,
            archived: collection.archived(),
            now: Utc::now(),
            error: error.as_deref(),
        }),
    }
    .render();

    Ok(page)
}

#[derive(Deserialize)]
pub struct ListQuery {
    archived: Option<bool>,
    search: Option<String>,
    tag: Option<String>,
    sort: Option<SortBy>,
}

/// Absent parameters leave the corresponding view state untouched.
pub async fn list_notes(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let mut collection = state.views.checkout(&state.service, &session).await;
    if let Some(search) = &query.search {
        collection.set_search(search);
    }
    if let Some(tag) = &query.tag {
        collection.set_selected_tag(tag);
    }
    if let Some(sort) = query.sort {
        collection.set_sort_by(sort);
    }
    match query.archived {
        Some(archived)
            if !collection.is_loaded() || archived != collection.archived() =>
        {
            collection.load(archived).await?;
        }
        _ => collection.ensure_loaded().await?,
    }

    Ok(list_update(&collection, false))
}

/// The editor form, plus the tag-entry buttons that post it back to us.
#[derive(Deserialize)]
pub struct NoteForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    /// Comma separated
    #[serde(default)]
    tags: String,
    color: Option<String>,
    #[serde(default)]
    new_tag: String,
    remove_tag: Option<String>,
    id: Option<String>,
}

impl NoteForm {
    fn draft(&self) -> NoteDraft {
        let mut draft = NoteDraft::new(&self.title, &self.content);
        for tag in self.tags.split(',') {
            draft.add_tag(tag);
        }
        draft.color = self
            .color
            .as_deref()
            .and_then(Color::from_slug)
            .unwrap_or_default();
        draft
    }

    fn editing(&self) -> Option<NoteId> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(NoteId::from)
    }
}

pub async fn create_note(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Form(form): Form<NoteForm>,
) -> Result<impl IntoResponse, ServerError> {
    let draft = form.draft();
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.create(&draft).await?;

    Ok(list_update(&collection, true))
}

pub async fn update_note(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Form(form): Form<NoteForm>,
) -> Result<impl IntoResponse, ServerError> {
    let draft = form.draft();
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.update(&NoteId(id), &draft).await?;

    Ok(list_update(&collection, true))
}

pub async fn edit_form(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let id = NoteId(id);
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.ensure_loaded().await?;
    let note = collection
        .find(&id)
        .ok_or_else(|| NotesError::NotFound(id.clone()))?;

    Ok(components::NoteEditor {
        draft: &NoteDraft::from_note(note),
        editing: Some(&id),
        oob: false,
    }
    .render())
}

#[derive(Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    confirmed: bool,
}

pub async fn delete_note(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Form(DeleteForm { confirmed }): Form<DeleteForm>,
) -> Result<impl IntoResponse, ServerError> {
    if !confirmed {
        return Err(NotesError::Validation(
            "Deleting a note must be confirmed".into(),
        )
        .into());
    }
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.remove(DeleteConfirmation::confirm(NoteId(id))).await?;

    Ok(list_update(&collection, false))
}

pub async fn toggle_pin(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.toggle_pin(&NoteId(id)).await?;

    Ok(list_update(&collection, false))
}

pub async fn toggle_archive(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.toggle_archive(&NoteId(id)).await?;

    Ok(list_update(&collection, false))
}

pub async fn toggle_expanded(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let id = NoteId(id);
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.ensure_loaded().await?;
    if collection.find(&id).is_none() {
        return Err(NotesError::NotFound(id).into());
    }
    collection.toggle_expanded(&id);

    Ok(list_update(&collection, false))
}

pub async fn open_export_menu(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let id = NoteId(id);
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.ensure_loaded().await?;
    if collection.find(&id).is_none() {
        return Err(NotesError::NotFound(id).into());
    }
    collection.open_export_menu(&id);

    Ok(list_update(&collection, false))
}

pub async fn close_export_menu(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<impl IntoResponse, ServerError> {
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.ensure_loaded().await?;
    collection.close_export_menu();

    Ok(list_update(&collection, false))
}

fn attachment(filename: &str, body: String) -> Result<Response, ServerError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!(r#"attachment; filename="{filename}""#))?,
    );
    Ok((headers, body).into_response())
}

pub async fn export_note_text(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let id = NoteId(id);
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.ensure_loaded().await?;
    collection.close_export_menu();
    let note = collection
        .find(&id)
        .ok_or_else(|| NotesError::NotFound(id.clone()))?;
    debug!(%id, "exporting note as text");

    attachment(&export::export_filename(&note.title), export::note_as_text(note))
}

pub async fn export_note_html(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let id = NoteId(id);
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.ensure_loaded().await?;
    collection.close_export_menu();
    let note = collection
        .find(&id)
        .ok_or_else(|| NotesError::NotFound(id.clone()))?;
    debug!(%id, "rendering printable note");

    Ok(export::note_as_print_html(note))
}

/// Every note the user is currently looking at, in display order.
pub async fn export_all(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Response, ServerError> {
    let mut collection = state.views.checkout(&state.service, &session).await;
    collection.ensure_loaded().await?;
    let visible = collection.visible();
    debug!(count = visible.len(), "exporting notes as text");

    attachment(
        &export::all_notes_filename(Utc::now().date_naive()),
        export::all_notes_as_text(&visible),
    )
}

pub async fn draft_new(_: AuthSession) -> impl IntoResponse {
    components::NoteEditor {
        draft: &NoteDraft::default(),
        editing: None,
        oob: false,
    }
    .render()
}

/// Tag entry on the editor: add `new_tag`, or drop `remove_tag` when a
/// chip was clicked. Nothing is sent to the notes service.
pub async fn draft_tags(
    _: AuthSession,
    Form(form): Form<NoteForm>,
) -> impl IntoResponse {
    let mut draft = form.draft();
    match &form.remove_tag {
        Some(tag) => draft.remove_tag(tag),
        None => {
            for tag in form.new_tag.split(',') {
                draft.add_tag(tag);
            }
        }
    }
    let editing = form.editing();
    components::NoteEditor {
        draft: &draft,
        editing: editing.as_ref(),
        oob: false,
    }
    .render()
}

pub async fn draft_stats(
    _: AuthSession,
    Form(form): Form<NoteForm>,
) -> impl IntoResponse {
    components::DraftStats {
        draft: &form.draft(),
    }
    .render()
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
