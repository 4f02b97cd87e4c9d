//! The notes collection view: a cache of the last full fetch from the notes
//! service, the ephemeral UI state that shapes what is displayed, and the
//! mutations. Every mutation is followed by a full reload; nothing is
//! patched locally.

use super::{
    errors::Result,
    models::{Note, NoteDraft, NoteId, SortBy},
    service::NotesService,
    session::Session,
};
use std::{cmp::Ordering, collections::BTreeSet, collections::HashSet, sync::Arc};
use tracing::{debug, info, warn};

/// UI state that never round-trips to the service.
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub search: String,
    pub selected_tag: String,
    pub sort_by: SortBy,
    pub expanded: HashSet<NoteId>,
    /// At most one export menu is open at a time.
    pub export_menu: Option<NoteId>,
}

/// Proof that the user confirmed a delete. The UI obtains one by calling
/// [`DeleteConfirmation::confirm`] after its confirmation step; `remove`
/// cannot be called without it.
#[derive(Debug)]
pub struct DeleteConfirmation(NoteId);

impl DeleteConfirmation {
    pub fn confirm(id: NoteId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> &NoteId {
        &self.0
    }
}

pub struct NotesCollection {
    service: Arc<dyn NotesService>,
    session: Session,
    notes: Vec<Note>,
    archived: bool,
    loaded: bool,
    view: ViewState,
}

impl NotesCollection {
    pub fn new(service: Arc<dyn NotesService>, session: Session) -> Self {
        Self {
            service,
            session,
            notes: vec![],
            archived: false,
            loaded: false,
            view: ViewState::default(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn find(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    /// Replace the held notes with the service's `archived` set. On failure
    /// the previous notes and mode are left exactly as they were.
    pub async fn load(&mut self, archived: bool) -> Result<&[Note]> {
        let mut notes = self
            .service
            .list_notes(&self.session, archived)
            .await
            .map_err(|e| {
                warn!(archived, "loading notes failed: {e}");
                e
            })?;
        let fetched = notes.len();
        notes.retain(|n| n.archived == archived);
        if notes.len() != fetched {
            warn!(
                archived,
                dropped = fetched - notes.len(),
                "service returned notes from the other set"
            );
        }
        debug!(archived, count = notes.len(), "loaded notes");

        self.notes = notes;
        self.archived = archived;
        self.loaded = true;
        let ids: HashSet<&NoteId> = self.notes.iter().map(|n| &n.id).collect();
        self.view.expanded.retain(|id| ids.contains(id));
        if self
            .view
            .export_menu
            .as_ref()
            .is_some_and(|open| !ids.contains(open))
        {
            self.view.export_menu = None;
        }
        Ok(&self.notes)
    }

    pub async fn reload(&mut self) -> Result<&[Note]> {
        self.load(self.archived).await
    }

    /// Load the current mode if nothing has been fetched yet.
    pub async fn ensure_loaded(&mut self) -> Result<()> {
        if !self.loaded {
            self.reload().await?;
        }
        Ok(())
    }

    /// The held notes, filtered and sorted per the current view state.
    pub fn visible(&self) -> Vec<Note> {
        derive_view(
            &self.notes,
            &self.view.search,
            &self.view.selected_tag,
            self.view.sort_by,
        )
    }

    pub fn tags(&self) -> Vec<String> {
        aggregate_tags(&self.notes)
    }

    pub async fn create(&mut self, draft: &NoteDraft) -> Result<Note> {
        draft.validate()?;
        let note = self.service.create_note(&self.session, draft).await?;
        info!(id = %note.id, "created note");
        self.reload().await?;
        Ok(note)
    }

    pub async fn update(&mut self, id: &NoteId, draft: &NoteDraft) -> Result<Note> {
        draft.validate()?;
        let note = self.service.update_note(&self.session, id, draft).await?;
        info!(%id, "updated note");
        self.reload().await?;
        Ok(note)
    }

    pub async fn toggle_pin(&mut self, id: &NoteId) -> Result<Note> {
        let note = self.service.toggle_pin(&self.session, id).await?;
        info!(%id, pinned = note.pinned, "toggled pin");
        self.reload().await?;
        Ok(note)
    }

    pub async fn toggle_archive(&mut self, id: &NoteId) -> Result<Note> {
        let note = self.service.toggle_archive(&self.session, id).await?;
        info!(%id, archived = note.archived, "toggled archive");
        self.reload().await?;
        Ok(note)
    }

    /// Delete for good. The confirmation step belongs to the caller.
    pub async fn remove(&mut self, confirmation: DeleteConfirmation) -> Result<()> {
        let id = confirmation.id();
        self.service.delete_note(&self.session, id).await?;
        info!(%id, "deleted note");
        self.view.expanded.remove(id);
        if self.view.export_menu.as_ref() == Some(id) {
            self.view.export_menu = None;
        }
        self.reload().await?;
        Ok(())
    }

    pub fn set_search(&mut self, search: &str) {
        self.view.search = search.to_string();
    }

    pub fn set_selected_tag(&mut self, tag: &str) {
        self.view.selected_tag = tag.trim().to_lowercase();
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.view.sort_by = sort_by;
    }

    /// Returns whether the note is now expanded.
    pub fn toggle_expanded(&mut self, id: &NoteId) -> bool {
        if self.view.expanded.remove(id) {
            false
        } else {
            self.view.expanded.insert(id.clone());
            true
        }
    }

    pub fn open_export_menu(&mut self, id: &NoteId) {
        self.view.export_menu = Some(id.clone());
    }

    /// Any interaction outside the open menu closes it.
    pub fn close_export_menu(&mut self) {
        self.view.export_menu = None;
    }
}

fn matches(note: &Note, needle: &str, selected_tag: &str) -> bool {
    let text_match = note.title.to_lowercase().contains(needle)
        || note.content.to_lowercase().contains(needle);
    let tag_match =
        selected_tag.is_empty() || note.tags.iter().any(|t| t == selected_tag);
    text_match && tag_match
}

fn compare(a: &Note, b: &Note, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Newest => b.created_at.cmp(&a.created_at),
        SortBy::Oldest => a.created_at.cmp(&b.created_at),
        SortBy::RecentlyModified => b.updated_at.cmp(&a.updated_at),
        SortBy::Alphabetical => {
            a.title.to_lowercase().cmp(&b.title.to_lowercase())
        }
    }
}

/// Filter by search text and tag, then order pinned notes first and the
/// rest by `sort_by`. The sort is stable: equal keys keep input order.
pub fn derive_view(
    notes: &[Note],
    search: &str,
    selected_tag: &str,
    sort_by: SortBy,
) -> Vec<Note> {
    let needle = search.to_lowercase();
    let mut view: Vec<Note> = notes
        .iter()
        .filter(|n| matches(n, &needle, selected_tag))
        .cloned()
        .collect();
    view.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| compare(a, b, sort_by))
    });
    view
}

/// Every tag used across `notes`, deduplicated and in ascending order.
pub fn aggregate_tags(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .flat_map(|n| n.tags.iter().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::NotesError,
        models::{Color, LoginForm, LoginResponse, SignupForm},
        service::{memory::tests::signed_in, MemoryNotesService},
    };
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn note(id: &str, title: &str, created: u32, updated: u32) -> Note {
        Note {
            id: id.into(),
            title: title.to_string(),
            content: format!("body of {title}"),
            tags: vec![],
            color: Color::White,
            pinned: false,
            archived: false,
            created_at: at(created),
            updated_at: at(updated),
        }
    }

    fn ids(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|n| n.id.0.as_str()).collect()
    }

    fn sample() -> Vec<Note> {
        let mut a = note("a", "banana bread", 1, 9);
        a.tags = vec!["food".into(), "baking".into()];
        let mut b = note("b", "Apple pie", 3, 4);
        b.tags = vec!["food".into()];
        b.pinned = true;
        let mut c = note("c", "standup", 2, 2);
        c.tags = vec!["work".into()];
        c.content = "Discuss the BANANA incident".into();
        let mut d = note("d", "retro", 4, 5);
        d.pinned = true;
        vec![a, b, c, d]
    }

    #[test]
    fn test_filter_is_case_insensitive_over_title_and_content() {
        let view = derive_view(&sample(), "Banana", "", SortBy::Newest);
        assert_eq!(ids(&view), vec!["c", "a"]);
        for note in &view {
            assert!(
                note.title.to_lowercase().contains("banana")
                    || note.content.to_lowercase().contains("banana")
            );
        }
    }

    #[test]
    fn test_filter_by_tag_and_search_together() {
        let notes = sample();
        let view = derive_view(&notes, "", "food", SortBy::Oldest);
        assert_eq!(ids(&view), vec!["b", "a"]);

        let view = derive_view(&notes, "pie", "food", SortBy::Oldest);
        assert_eq!(ids(&view), vec!["b"]);

        let excluded: Vec<&Note> = notes
            .iter()
            .filter(|n| !view.iter().any(|v| v.id == n.id))
            .collect();
        assert!(excluded
            .iter()
            .all(|n| !n.title.contains("pie") || !n.tags.contains(&"food".to_string())));
        assert!(derive_view(&notes, "", "nope", SortBy::Newest).is_empty());
    }

    #[test]
    fn test_pinned_first_for_every_sort() {
        for sort in SortBy::ALL {
            let view = derive_view(&sample(), "", "", sort);
            let first_unpinned =
                view.iter().position(|n| !n.pinned).unwrap_or(view.len());
            assert!(
                view[first_unpinned..].iter().all(|n| !n.pinned),
                "{sort:?} put a pinned note after an unpinned one"
            );
        }
    }

    #[test]
    fn test_secondary_orders() {
        let notes = sample();
        assert_eq!(
            ids(&derive_view(&notes, "", "", SortBy::Newest)),
            vec!["d", "b", "c", "a"]
        );
        assert_eq!(
            ids(&derive_view(&notes, "", "", SortBy::Oldest)),
            vec!["b", "d", "a", "c"]
        );
        assert_eq!(
            ids(&derive_view(&notes, "", "", SortBy::RecentlyModified)),
            vec!["d", "b", "a", "c"]
        );
        assert_eq!(
            ids(&derive_view(&notes, "", "", SortBy::Alphabetical)),
            vec!["b", "d", "a", "c"]
        );
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let notes = vec![
            note("x", "same", 1, 1),
            note("y", "same", 1, 1),
            note("z", "Same", 1, 1),
        ];
        for sort in SortBy::ALL {
            assert_eq!(ids(&derive_view(&notes, "", "", sort)), vec!["x", "y", "z"]);
        }
    }

    #[test]
    fn test_aggregate_tags_sorted_and_unique() {
        let mut notes = sample();
        notes.push(note("e", "no tags", 5, 5));
        let tags = aggregate_tags(&notes);
        assert_eq!(tags, vec!["baking", "food", "work"]);
        assert!(aggregate_tags(&[]).is_empty());
    }

    /// Wraps the memory backend and can be told to fail listing.
    struct Flaky {
        inner: MemoryNotesService,
        fail_list: AtomicBool,
    }

    #[async_trait]
    impl NotesService for Flaky {
        async fn list_notes(&self, s: &Session, archived: bool) -> Result<Vec<Note>> {
            if self.fail_list.load(AtomicOrdering::SeqCst) {
                return Err(NotesError::ServiceUnavailable("connection reset".into()));
            }
            self.inner.list_notes(s, archived).await
        }
        async fn create_note(&self, s: &Session, d: &NoteDraft) -> Result<Note> {
            self.inner.create_note(s, d).await
        }
        async fn update_note(&self, s: &Session, id: &NoteId, d: &NoteDraft) -> Result<Note> {
            self.inner.update_note(s, id, d).await
        }
        async fn delete_note(&self, s: &Session, id: &NoteId) -> Result<()> {
            self.inner.delete_note(s, id).await
        }
        async fn toggle_pin(&self, s: &Session, id: &NoteId) -> Result<Note> {
            self.inner.toggle_pin(s, id).await
        }
        async fn toggle_archive(&self, s: &Session, id: &NoteId) -> Result<Note> {
            self.inner.toggle_archive(s, id).await
        }
        async fn signup(&self, f: &SignupForm) -> Result<()> {
            self.inner.signup(f).await
        }
        async fn login(&self, f: &LoginForm) -> Result<LoginResponse> {
            self.inner.login(f).await
        }
    }

    async fn collection() -> (Arc<Flaky>, NotesCollection) {
        let service = Arc::new(Flaky {
            inner: MemoryNotesService::new(),
            fail_list: AtomicBool::new(false),
        });
        let session = signed_in(&service.inner).await;
        let view = NotesCollection::new(service.clone(), session);
        (service, view)
    }

    #[tokio::test]
    async fn test_create_reloads_authoritative_set() {
        let (_, mut view) = collection().await;
        let note = view
            .create(&NoteDraft::new("Groceries", "milk, eggs"))
            .await
            .unwrap();
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "milk, eggs");
        assert!(!note.pinned && !note.archived);
        assert_eq!(note.created_at, note.updated_at);
        assert_eq!(view.notes(), &[note]);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_service() {
        let (service, mut view) = collection().await;
        let err = view.create(&NoteDraft::new("", "content")).await;
        assert!(matches!(err, Err(NotesError::Validation(_))));
        let stored = service
            .inner
            .list_notes(view.session(), false)
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_previous_notes() {
        let (service, mut view) = collection().await;
        view.create(&NoteDraft::new("a", "b")).await.unwrap();
        assert_eq!(view.notes().len(), 1);

        service.fail_list.store(true, AtomicOrdering::SeqCst);
        let err = view.load(true).await;
        assert!(matches!(err, Err(NotesError::ServiceUnavailable(_))));
        assert_eq!(view.notes().len(), 1);
        assert!(!view.archived());
    }

    #[tokio::test]
    async fn test_toggle_pin_twice() {
        let (_, mut view) = collection().await;
        let note = view.create(&NoteDraft::new("a", "b")).await.unwrap();
        assert!(view.toggle_pin(&note.id).await.unwrap().pinned);
        assert!(view.notes()[0].pinned);
        assert!(!view.toggle_pin(&note.id).await.unwrap().pinned);
        assert!(!view.notes()[0].pinned);
    }

    #[tokio::test]
    async fn test_archive_moves_note_between_sets() {
        let (_, mut view) = collection().await;
        let note = view.create(&NoteDraft::new("a", "b")).await.unwrap();
        view.toggle_archive(&note.id).await.unwrap();
        assert!(view.notes().is_empty());

        view.load(true).await.unwrap();
        assert!(view.archived());
        assert!(view.notes().iter().all(|n| n.archived));
        assert_eq!(view.notes().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_note_is_not_found() {
        let (_, mut view) = collection().await;
        let note = view.create(&NoteDraft::new("a", "b")).await.unwrap();
        view.remove(DeleteConfirmation::confirm(note.id.clone()))
            .await
            .unwrap();
        let err = view.update(&note.id, &NoteDraft::new("a2", "b2")).await;
        assert!(matches!(err, Err(NotesError::NotFound(id)) if id == note.id));
    }

    #[tokio::test]
    async fn test_failed_reload_after_mutation_keeps_previous_fetch() {
        let (service, mut view) = collection().await;
        let note = view.create(&NoteDraft::new("a", "b")).await.unwrap();
        let before = view.notes().to_vec();

        service.fail_list.store(true, AtomicOrdering::SeqCst);
        assert!(matches!(
            view.toggle_pin(&note.id).await,
            Err(NotesError::ServiceUnavailable(_))
        ));
        assert_eq!(view.notes(), before.as_slice());
        assert!(!view.notes()[0].pinned);

        service.fail_list.store(false, AtomicOrdering::SeqCst);
        view.reload().await.unwrap();
        assert!(view.notes()[0].pinned);
    }

    #[tokio::test]
    async fn test_remove_clears_ui_state_and_never_returns() {
        let (_, mut view) = collection().await;
        let note = view.create(&NoteDraft::new("a", "b")).await.unwrap();
        view.toggle_expanded(&note.id);
        view.open_export_menu(&note.id);

        view.remove(DeleteConfirmation::confirm(note.id.clone()))
            .await
            .unwrap();
        assert!(view.find(&note.id).is_none());
        assert!(view.view().expanded.is_empty());
        assert!(view.view().export_menu.is_none());
        view.load(true).await.unwrap();
        assert!(view.find(&note.id).is_none());
    }

    #[tokio::test]
    async fn test_visible_tracks_view_state() {
        let (_, mut view) = collection().await;
        let mut work = NoteDraft::new("Standup", "yesterday, today");
        work.add_tag("Work");
        view.create(&work).await.unwrap();
        view.create(&NoteDraft::new("Groceries", "milk")).await.unwrap();

        assert_eq!(view.tags(), vec!["work"]);
        view.set_selected_tag("WORK");
        assert_eq!(view.visible().len(), 1);
        view.set_selected_tag("");
        view.set_search("MILK");
        assert_eq!(view.visible()[0].title, "Groceries");
        view.set_search("");
        view.set_sort_by(SortBy::Alphabetical);
        assert_eq!(view.visible()[0].title, "Groceries");
    }

    #[tokio::test]
    async fn test_export_menu_is_exclusive() {
        let (_, mut view) = collection().await;
        let a: NoteId = "a".into();
        let b: NoteId = "b".into();
        view.open_export_menu(&a);
        view.open_export_menu(&b);
        assert_eq!(view.view().export_menu, Some(b));
        view.close_export_menu();
        assert!(view.view().export_menu.is_none());

        assert!(view.toggle_expanded(&a));
        assert!(!view.toggle_expanded(&a));
    }
}
