//! The remote notes service owns every note; this app only renders them.
//! `NotesService` is the narrow contract the collection view depends on.
//! The session is always passed in by the caller, never looked up here.

mod http;
pub(crate) mod memory;

pub use http::HttpNotesService;
pub use memory::MemoryNotesService;

use crate::{
    errors::Result,
    models::{LoginForm, LoginResponse, Note, NoteDraft, NoteId, SignupForm},
    session::Session,
};
use async_trait::async_trait;

#[async_trait]
pub trait NotesService: Send + Sync {
    /// Every note of the session's user with the given `archived` flag.
    async fn list_notes(&self, session: &Session, archived: bool)
        -> Result<Vec<Note>>;
    async fn create_note(&self, session: &Session, draft: &NoteDraft)
        -> Result<Note>;
    async fn update_note(
        &self,
        session: &Session,
        id: &NoteId,
        draft: &NoteDraft,
    ) -> Result<Note>;
    /// Irreversible.
    async fn delete_note(&self, session: &Session, id: &NoteId) -> Result<()>;
    async fn toggle_pin(&self, session: &Session, id: &NoteId) -> Result<Note>;
    async fn toggle_archive(&self, session: &Session, id: &NoteId)
        -> Result<Note>;
    async fn signup(&self, form: &SignupForm) -> Result<()>;
    async fn login(&self, form: &LoginForm) -> Result<LoginResponse>;
}
