use super::NotesService;
use crate::{
    crypto,
    errors::{NotesError, Result},
    models::{
        LoginForm, LoginResponse, Note, NoteDraft, NoteId, SignupForm, User,
    },
    session::Session,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

struct Account {
    user: User,
    password_digest: Vec<u8>,
    notes: Vec<Note>,
}

#[derive(Default)]
struct Inner {
    /// keyed by email
    accounts: HashMap<String, Account>,
    /// credential -> email
    tokens: HashMap<String, String>,
}

impl Inner {
    fn account_mut(&mut self, session: &Session) -> Result<&mut Account> {
        let email = self
            .tokens
            .get(&session.token)
            .ok_or(NotesError::Unauthenticated)?;
        self.accounts
            .get_mut(email)
            .ok_or(NotesError::Unauthenticated)
    }
}

/// A notes service that lives entirely in process. It follows the same
/// contract as the remote API: server-assigned ids, server-side timestamps,
/// notes scoped to the credential's owner.
#[derive(Default)]
pub struct MemoryNotesService {
    inner: Mutex<Inner>,
}

impl MemoryNotesService {
    pub fn new() -> Self {
        Self::default()
    }

    fn find<'a>(notes: &'a mut [Note], id: &NoteId) -> Result<&'a mut Note> {
        notes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| NotesError::NotFound(id.clone()))
    }
}

#[async_trait]
impl NotesService for MemoryNotesService {
    async fn list_notes(
        &self,
        session: &Session,
        archived: bool,
    ) -> Result<Vec<Note>> {
        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(session)?;
        Ok(account
            .notes
            .iter()
            .filter(|n| n.archived == archived)
            .cloned()
            .collect())
    }

    async fn create_note(
        &self,
        session: &Session,
        draft: &NoteDraft,
    ) -> Result<Note> {
        draft.validate()?;
        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(session)?;
        let now = Utc::now();
        let mut tags = NoteDraft::default();
        for tag in &draft.tags {
            tags.add_tag(tag);
        }
        let note = Note {
            id: NoteId(Uuid::new_v4().to_string()),
            title: draft.title.clone(),
            content: draft.content.clone(),
            tags: tags.tags,
            color: draft.color,
            pinned: false,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        account.notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(
        &self,
        session: &Session,
        id: &NoteId,
        draft: &NoteDraft,
    ) -> Result<Note> {
        draft.validate()?;
        let mut inner = self.inner.lock().await;
        let note = Self::find(&mut inner.account_mut(session)?.notes, id)?;
        let mut tags = NoteDraft::default();
        for tag in &draft.tags {
            tags.add_tag(tag);
        }
        note.title = draft.title.clone();
        note.content = draft.content.clone();
        note.tags = tags.tags;
        note.color = draft.color;
        note.updated_at = Utc::now().max(note.created_at);
        Ok(note.clone())
    }

    async fn delete_note(&self, session: &Session, id: &NoteId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let notes = &mut inner.account_mut(session)?.notes;
        let before = notes.len();
        notes.retain(|n| &n.id != id);
        if notes.len() == before {
            return Err(NotesError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn toggle_pin(&self, session: &Session, id: &NoteId) -> Result<Note> {
        let mut inner = self.inner.lock().await;
        let note = Self::find(&mut inner.account_mut(session)?.notes, id)?;
        note.pinned = !note.pinned;
        note.updated_at = Utc::now().max(note.created_at);
        Ok(note.clone())
    }

    async fn toggle_archive(
        &self,
        session: &Session,
        id: &NoteId,
    ) -> Result<Note> {
        let mut inner = self.inner.lock().await;
        let note = Self::find(&mut inner.account_mut(session)?.notes, id)?;
        note.archived = !note.archived;
        note.updated_at = Utc::now().max(note.created_at);
        Ok(note.clone())
    }

    async fn signup(&self, form: &SignupForm) -> Result<()> {
        let email = form.email.trim().to_lowercase();
        if email.is_empty() || form.password.is_empty() {
            return Err(NotesError::Validation(
                "Email and password are required".into(),
            ));
        }
        let mut inner = self.inner.lock().await;
        if inner.accounts.contains_key(&email) {
            return Err(NotesError::Validation(
                "An account with that email already exists".into(),
            ));
        }
        info!(%email, "registered account");
        inner.accounts.insert(
            email.clone(),
            Account {
                user: User {
                    name: form.name.trim().to_string(),
                    email,
                },
                password_digest: crypto::hash_password(&form.password),
                notes: vec![],
            },
        );
        Ok(())
    }

    async fn login(&self, form: &LoginForm) -> Result<LoginResponse> {
        let email = form.email.trim().to_lowercase();
        let mut inner = self.inner.lock().await;
        let user = match inner.accounts.get(&email) {
            Some(account)
                if account.password_digest
                    == crypto::hash_password(&form.password) =>
            {
                account.user.clone()
            }
            _ => {
                return Err(NotesError::Validation(
                    "Invalid email or password".into(),
                ))
            }
        };
        let token = Uuid::new_v4().to_string();
        inner.tokens.insert(token.clone(), email);
        Ok(LoginResponse {
            token,
            user: Some(user),
        })
    }
}
