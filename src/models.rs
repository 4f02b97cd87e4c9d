use super::{
    collection::NotesCollection,
    errors::{NotesError, Result},
    service::NotesService,
    session,
    session::Session,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Identifier assigned by the notes service. We never look inside it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The fixed card palette. Purely cosmetic, but it is persisted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    White,
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
    Orange,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::White,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Pink,
        Color::Purple,
        Color::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Pink => "pink",
            Color::Purple => "purple",
            Color::Orange => "orange",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(slug.trim()))
    }

    /// Background used for the note card.
    pub fn hex(&self) -> &'static str {
        match self {
            Color::White => "#ffffff",
            Color::Yellow => "#fff9c4",
            Color::Green => "#dcedc8",
            Color::Blue => "#bbdefb",
            Color::Pink => "#f8bbd0",
            Color::Purple => "#e1bee7",
            Color::Orange => "#ffe0b2",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Colors the palette no longer carries fall back to the default rather
// than failing the whole note list.
impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let slug = Option::<String>::deserialize(deserializer)?;
        Ok(slug.as_deref().and_then(Color::from_slug).unwrap_or_default())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(alias = "_id")]
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Older records may carry `tags: null`, a bare string, or nothing at all.
/// Anything that is not an array of strings reads as "no tags".
fn lenient_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(vec![]);
    };
    let mut tags = NoteDraft::default();
    for item in items {
        if let serde_json::Value::String(tag) = item {
            tags.add_tag(&tag);
        }
    }
    Ok(tags.tags)
}

/// Editable form state for a note that is about to be created or updated.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub color: Color,
}

impl NoteDraft {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            color: note.color,
        }
    }

    /// Tag entry: trimmed, lower-cased, and silently dropped when empty or
    /// already present. Commas separate tags in the editor form, so they
    /// never appear inside one. Returns whether the tag was added.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        let tag = raw.replace(',', "").trim().to_lowercase();
        if tag.is_empty() || self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(NotesError::Validation("A title is required".into()));
        }
        if self.content.trim().is_empty() {
            return Err(NotesError::Validation("Content is required".into()));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    RecentlyModified,
    Alphabetical,
}

impl SortBy {
    pub const ALL: [SortBy; 4] = [
        SortBy::Newest,
        SortBy::Oldest,
        SortBy::RecentlyModified,
        SortBy::Alphabetical,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            SortBy::Newest => "newest",
            SortBy::Oldest => "oldest",
            SortBy::RecentlyModified => "recently-modified",
            SortBy::Alphabetical => "alphabetical",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SortBy::Newest => "Newest first",
            SortBy::Oldest => "Oldest first",
            SortBy::RecentlyModified => "Recently modified",
            SortBy::Alphabetical => "Alphabetical",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

struct StoredView {
    session: Session,
    collection: Arc<Mutex<NotesCollection>>,
}

/// One collection view per signed-in session, keyed by the session's
/// service credential. Handlers check a view out for the duration of a
/// request, which serializes actions within a session. Views of expired
/// sessions are dropped on the next checkout.
#[derive(Clone, Default)]
pub struct ViewStore {
    views: Arc<Mutex<HashMap<String, StoredView>>>,
}

impl ViewStore {
    pub async fn checkout(
        &self,
        service: &Arc<dyn NotesService>,
        session: &Session,
    ) -> OwnedMutexGuard<NotesCollection> {
        let view = {
            let mut views = self.views.lock().await;
            let now = session::now();
            let before = views.len();
            views.retain(|_, v| !v.session.is_expired(now));
            if views.len() != before {
                debug!(dropped = before - views.len(), "pruned expired views");
            }
            views
                .entry(session.token.clone())
                .or_insert_with(|| StoredView {
                    session: session.clone(),
                    collection: Arc::new(Mutex::new(NotesCollection::new(
                        service.clone(),
                        session.clone(),
                    ))),
                })
                .collection
                .clone()
        };
        view.lock_owned().await
    }

    pub async fn forget(&self, session: &Session) {
        self.views.lock().await.remove(&session.token);
    }

    #[cfg(test)]
    pub async fn contains(&self, session: &Session) -> bool {
        self.views.lock().await.contains_key(&session.token)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn NotesService>,
    pub views: ViewStore,
    pub session_secret: Arc<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_note(tags: serde_json::Value) -> serde_json::Value {
        json!({
            "_id": "65a1",
            "title": "Groceries",
            "content": "milk, eggs",
            "tags": tags,
            "color": "yellow",
            "pinned": true,
            "createdAt": "2024-01-01T10:00:00Z",
            "updatedAt": "2024-01-02T10:00:00Z"
        })
    }

    #[test]
    fn test_note_accepts_mongo_style_id() {
        let note: Note = serde_json::from_value(wire_note(json!(["a"])))
            .expect("note parses");
        assert_eq!(note.id, NoteId::from("65a1"));
        assert_eq!(note.color, Color::Yellow);
        assert!(note.pinned);
        assert!(!note.archived);
    }

    #[test]
    fn test_note_tolerates_odd_tags() {
        for tags in [json!(null), json!("work"), json!({"a": 1})] {
            let note: Note =
                serde_json::from_value(wire_note(tags)).expect("note parses");
            assert!(note.tags.is_empty());
        }
        let mut missing = wire_note(json!([]));
        missing.as_object_mut().unwrap().remove("tags");
        let note: Note = serde_json::from_value(missing).expect("note parses");
        assert!(note.tags.is_empty());
    }

    #[test]
    fn test_note_normalizes_wire_tags() {
        let note: Note =
            serde_json::from_value(wire_note(json!(["Work", "work", 3, " home "])))
                .expect("note parses");
        assert_eq!(note.tags, vec!["work", "home"]);
    }

    #[test]
    fn test_unknown_color_falls_back_to_white() {
        let mut value = wire_note(json!([]));
        value["color"] = json!("chartreuse");
        let note: Note = serde_json::from_value(value).expect("note parses");
        assert_eq!(note.color, Color::White);
    }

    #[test]
    fn test_add_tag_dedups_silently() {
        let mut draft = NoteDraft::default();
        assert!(draft.add_tag("Work"));
        assert!(!draft.add_tag("work"));
        assert!(!draft.add_tag("   "));
        assert!(!draft.add_tag(" , "));
        assert!(draft.add_tag("q3,plan"));
        assert_eq!(draft.tags, vec!["work", "q3plan"]);
        draft.remove_tag("q3plan");

        draft.remove_tag("work");
        assert!(draft.tags.is_empty());
    }

    #[test]
    fn test_word_and_char_count() {
        let draft = NoteDraft::new("t", "  hello   world  ");
        assert_eq!(draft.word_count(), 2);
        assert_eq!(draft.char_count(), 17);
        assert_eq!(NoteDraft::new("t", "   ").word_count(), 0);
    }

    #[test]
    fn test_validate_requires_title_and_content() {
        assert!(NoteDraft::new("Groceries", "milk").validate().is_ok());
        assert!(matches!(
            NoteDraft::new(" ", "milk").validate(),
            Err(NotesError::Validation(_))
        ));
        assert!(matches!(
            NoteDraft::new("Groceries", "").validate(),
            Err(NotesError::Validation(_))
        ));
    }

    #[test]
    fn test_sort_by_slugs_round_trip_through_serde() {
        for sort in SortBy::ALL {
            let slug = serde_json::to_value(sort).expect("serializes");
            assert_eq!(slug, json!(sort.slug()));
        }
    }

    fn session_at(token: &str, created_at: u64) -> Session {
        Session {
            user: User {
                name: "Ada".into(),
                email: "ada@example.com".into(),
            },
            token: token.into(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_view_store_drops_expired_sessions() {
        let service: Arc<dyn NotesService> =
            Arc::new(crate::service::MemoryNotesService::new());
        let store = ViewStore::default();
        let stale = session_at("old", 0);
        let fresh = session_at("new", session::now());

        drop(store.checkout(&service, &stale).await);
        assert!(store.contains(&stale).await);
        drop(store.checkout(&service, &fresh).await);
        assert!(!store.contains(&stale).await);
        assert!(store.contains(&fresh).await);

        store.forget(&fresh).await;
        assert!(!store.contains(&fresh).await);
    }
}
