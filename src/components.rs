use super::{
    collection::ViewState,
    config,
    models::{Color, Note, NoteDraft, NoteId, SortBy, User},
    time::relative_time,
};
use ammonia::{clean, clean_text};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const STYLES: &str = r#"
    body { font-family: system-ui, sans-serif; margin: 0; background: #f4f5fb; color: #222; }
    main { max-width: 960px; margin: 0 auto; padding: 1rem; }
    .navbar { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 1.5rem; background: #667eea; color: white; }
    .navbar a, .navbar button { color: white; margin-left: 1rem; background: none; border: none; cursor: pointer; font-size: 1rem; text-decoration: none; }
    .card, .note-form, .toolbar { background: white; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }
    .note-form input, .note-form textarea, .note-form select, .card input { display: block; width: 100%; margin-bottom: 0.5rem; padding: 0.5rem; box-sizing: border-box; }
    .note-form textarea { min-height: 8rem; }
    .toolbar { display: flex; gap: 0.5rem; flex-wrap: wrap; }
    .modes a { margin-right: 1rem; }
    .modes a.active { font-weight: bold; }
    .notes { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
    .note-card { border-radius: 8px; padding: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,0.15); position: relative; }
    .note-card.pinned { outline: 2px solid #667eea; }
    .actions button { font-size: 0.8rem; margin: 0 0.25rem 0.25rem 0; }
    .export-menu { position: absolute; right: 1rem; background: white; border: 1px solid #ddd; border-radius: 6px; padding: 0.5rem; display: flex; flex-direction: column; z-index: 10; }
    .tag { display: inline-block; background: #667eea; color: white; padding: 2px 8px; border-radius: 12px; margin: 0 4px 4px 0; font-size: 0.75rem; border: none; }
    .muted { color: #777; font-size: 0.8rem; }
    .error { background: #fdecea; color: #b71c1c; padding: 0.75rem 1rem; border-radius: 6px; margin-bottom: 1rem; }
"#;

/// Error fragments and the click-outside transition for export menus.
const PAGE_SCRIPT: &str = r##"
    htmx.config.defaultSwapStyle = "outerHTML";
    document.body.addEventListener("htmx:beforeSwap", (e) => {
        if ([404, 422, 503].includes(e.detail.xhr.status)) {
            e.detail.shouldSwap = true;
            e.detail.isError = false;
        }
    });
    document.body.addEventListener("htmx:afterRequest", (e) => {
        const flash = document.querySelector("#flash");
        if (flash && e.detail.successful) {
            flash.innerHTML = "";
        }
    });
    document.addEventListener("click", (e) => {
        const open = document.querySelector(".export-menu");
        if (open && !e.target.closest(".export-menu, .export-toggle")) {
            htmx.ajax("POST", "/export-menu/close", { target: "#note-list" });
        }
    });
"##;

pub trait Component {
    /// Render the component to a HTML string. By convention, the
    /// implementation should sanitize all string properties at render-time
    fn render(&self) -> String;
}

pub struct Page<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
    pub children: Box<dyn Component + 'a>,
}

impl Component for Page<'_> {
    fn render(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
            <html>
                <head>
                    <meta name="viewport" content="width=device-width, initial-scale=1.0"></meta>
                    <title>{title}</title>
                    <style>{STYLES}</style>
                </head>
                <body>
                    {navbar}
                    <main>
                        <div id="flash"></div>
                        {body_html}
                    </main>
                    <script src="https://unpkg.com/htmx.org@1.9.6"></script>
                    <script>{PAGE_SCRIPT}</script>
                </body>
            </html>
            "#,
            title = clean(self.title),
            navbar = NavBar { user: self.user }.render(),
            body_html = self.children.render()
        )
    }
}

pub struct NavBar<'a> {
    pub user: Option<&'a User>,
}
impl Component for NavBar<'_> {
    fn render(&self) -> String {
        let links = if let Some(user) = self.user {
            let name = if user.name.is_empty() {
                clean(&user.email)
            } else {
                clean(&user.name)
            };
            format!(
                r#"
                <a href="/dashboard">Dashboard</a>
                <span class="muted" style="color: white; margin-left: 1rem;">{name}</span>
                <form method="post" action="/logout" style="display: inline;">
                    <button>Logout</button>
                </form>
                "#
            )
        } else {
            r#"
                <a href="/login">Login</a>
                <a href="/signup">Signup</a>
            "#
            .to_string()
        };
        format!(
            r#"
            <nav class="navbar">
                <h3>📝 NotesApp</h3>
                <div>
                    <a href="/">Home</a>
                    {links}
                </div>
            </nav>
            "#
        )
    }
}

pub struct Home {
    pub logged_in: bool,
}
impl Component for Home {
    fn render(&self) -> String {
        let buttons = if self.logged_in {
            r#"<a class="tag" href="/dashboard">Go to Dashboard</a>"#
        } else {
            r#"
                <a class="tag" href="/login">Login</a>
                <a class="tag" href="/signup">Signup</a>
            "#
        };
        format!(
            r#"
            <div class="card">
                <h1>📝 Notes App</h1>
                <p>
                    A simple and secure notes app where you can create, edit,
                    and manage your personal notes.
                </p>
                <div>{buttons}</div>
            </div>
            "#
        )
    }
}

pub struct ErrorBanner<'a> {
    pub message: &'a str,
}
impl Component for ErrorBanner<'_> {
    fn render(&self) -> String {
        format!(
            r#"<div class="error" role="alert">{}</div>"#,
            clean(self.message)
        )
    }
}

fn optional_error(error: Option<&str>) -> String {
    error
        .map(|message| ErrorBanner { message }.render())
        .unwrap_or_default()
}

pub struct LoginPage<'a> {
    pub error: Option<&'a str>,
    pub email: &'a str,
}
impl Component for LoginPage<'_> {
    fn render(&self) -> String {
        let error = optional_error(self.error);
        let email = clean_text(self.email);
        format!(
            r#"
            <div class="card" style="max-width: 450px; margin: 2rem auto;">
                <h2>Welcome Back</h2>
                <p class="muted">Sign in to continue to your notes</p>
                {error}
                <form method="post" action="/login">
                    <input name="email" type="email" placeholder="Email address" value="{email}" required />
                    <input name="password" type="password" placeholder="Password" required />
                    <button>Login</button>
                </form>
                <p class="muted">Don't have an account? <a href="/signup">Sign up</a></p>
            </div>
            "#
        )
    }
}

pub struct SignupPage<'a> {
    pub error: Option<&'a str>,
    pub name: &'a str,
    pub email: &'a str,
}
impl Component for SignupPage<'_> {
    fn render(&self) -> String {
        let error = optional_error(self.error);
        let name = clean_text(self.name);
        let email = clean_text(self.email);
        format!(
            r#"
            <div class="card" style="max-width: 450px; margin: 2rem auto;">
                <h2>Signup</h2>
                {error}
                <form method="post" action="/signup">
                    <input name="name" placeholder="Name" value="{name}" required />
                    <input name="email" type="email" placeholder="Email" value="{email}" required />
                    <input name="password" type="password" placeholder="Password" required />
                    <button>Signup</button>
                </form>
                <p class="muted">Already registered? <a href="/login">Log in</a></p>
            </div>
            "#
        )
    }
}

pub struct Dashboard<'a> {
    pub notes: &'a [Note],
    pub view: &'a ViewState,
    pub tags: &'a [String],
    pub archived: bool,
    pub now: DateTime<Utc>,
    /// Shown above the dashboard when the notes could not be fetched.
    pub error: Option<&'a str>,
}
impl Component for Dashboard<'_> {
    fn render(&self) -> String {
        let error = optional_error(self.error);
        let toolbar = Toolbar {
            view: self.view,
            tags: self.tags,
            archived: self.archived,
        }
        .render();
        let editor = NoteEditor {
            draft: &NoteDraft::default(),
            editing: None,
            oob: false,
        }
        .render();
        let list = NoteList {
            notes: self.notes,
            view: self.view,
            archived: self.archived,
            now: self.now,
        }
        .render();
        format!(
            r#"
            <h2>Dashboard</h2>
            {error}
            {toolbar}
            {editor}
            {list}
            "#
        )
    }
}

pub struct Toolbar<'a> {
    pub view: &'a ViewState,
    pub tags: &'a [String],
    pub archived: bool,
}
impl Component for Toolbar<'_> {
    fn render(&self) -> String {
        let search = clean_text(&self.view.search);
        let tag_filter = TagFilter {
            tags: self.tags,
            selected: &self.view.selected_tag,
            oob: false,
        }
        .render();
        let sort_options = SortBy::ALL.iter().fold(String::new(), |mut acc, s| {
            let selected = if *s == self.view.sort_by { "selected" } else { "" };
            let _ = write!(
                acc,
                r#"<option value="{slug}" {selected}>{name}</option>"#,
                slug = s.slug(),
                name = s.display_name()
            );
            acc
        });
        let (active_class, archived_class) = if self.archived {
            ("", "active")
        } else {
            ("active", "")
        };
        format!(
            r##"
            <form
                id="toolbar"
                class="toolbar"
                hx-get="/notes"
                hx-target="#note-list"
                hx-trigger="input changed delay:300ms from:#search, change"
            >
                <input id="search" type="search" name="search" value="{search}" placeholder="Search notes..." />
                {tag_filter}
                <select name="sort">{sort_options}</select>
            </form>
            <div class="modes">
                <a class="{active_class}" href="/dashboard">Active</a>
                <a class="{archived_class}" href="/dashboard?archived=true">Archived</a>
                <a href="/export/notes.txt" download>Export all</a>
            </div>
            "##
        )
    }
}

pub struct TagFilter<'a> {
    pub tags: &'a [String],
    pub selected: &'a str,
    /// Set when the filter rides along with a list update as an
    /// out-of-band swap.
    pub oob: bool,
}
impl Component for TagFilter<'_> {
    fn render(&self) -> String {
        let oob = if self.oob { r#"hx-swap-oob="true""# } else { "" };
        let options = self.tags.iter().fold(String::new(), |mut acc, tag| {
            let selected = if tag == self.selected { "selected" } else { "" };
            let tag = clean_text(tag);
            let _ = write!(acc, r#"<option value="{tag}" {selected}>#{tag}</option>"#);
            acc
        });
        format!(
            r#"
            <select id="tag-filter" name="tag" {oob}>
                <option value="">All tags</option>
                {options}
            </select>
            "#
        )
    }
}

pub struct NoteEditor<'a> {
    pub draft: &'a NoteDraft,
    /// The note being edited, or `None` for a new note.
    pub editing: Option<&'a NoteId>,
    pub oob: bool,
}
impl Component for NoteEditor<'_> {
    fn render(&self) -> String {
        let oob = if self.oob { r#"hx-swap-oob="true""# } else { "" };
        let title = clean_text(&self.draft.title);
        let content = clean_text(&self.draft.content);
        let tags_csv = clean_text(&self.draft.tags.join(","));
        let stats = DraftStats { draft: self.draft }.render();
        let chips = self.draft.tags.iter().fold(String::new(), |mut acc, tag| {
            let tag = clean_text(tag);
            let _ = write!(
                acc,
                r##"<button
                    type="button"
                    class="tag"
                    hx-post="/draft/tags"
                    hx-target="#note-form"
                    name="remove_tag"
                    value="{tag}"
                >#{tag} ×</button>"##
            );
            acc
        });
        let colors = Color::ALL.iter().fold(String::new(), |mut acc, c| {
            let selected = if *c == self.draft.color { "selected" } else { "" };
            let _ = write!(acc, r#"<option value="{c}" {selected}>{c}</option>"#);
            acc
        });
        let (action, id_input, submit, cancel) = match self.editing {
            Some(id) => {
                let id = clean_text(&id.0);
                (
                    format!("/notes/{id}"),
                    format!(r#"<input type="hidden" name="id" value="{id}" />"#),
                    "Update Note",
                    r##"<button type="button" hx-get="/draft/new" hx-target="#note-form">Cancel</button>"##,
                )
            }
            None => ("/notes".to_string(), String::new(), "Add Note", ""),
        };
        format!(
            r##"
            <form id="note-form" class="note-form" hx-post="{action}" hx-target="#note-list" {oob}>
                {id_input}
                <input name="title" placeholder="Title" value="{title}" />
                <textarea
                    name="content"
                    placeholder="Content (markdown supported)"
                    hx-post="/draft/stats"
                    hx-trigger="keyup changed delay:200ms"
                    hx-target="#draft-stats"
                >{content}</textarea>
                {stats}
                <input type="hidden" name="tags" value="{tags_csv}" />
                <div>{chips}</div>
                <input
                    name="new_tag"
                    placeholder="Add a tag"
                    onkeydown="if (event.key === 'Enter') event.preventDefault()"
                    hx-post="/draft/tags"
                    hx-trigger="keydown[key=='Enter']"
                    hx-target="#note-form"
                />
                <button type="button" hx-post="/draft/tags" hx-target="#note-form">Add tag</button>
                <select name="color">{colors}</select>
                <button type="submit">{submit}</button>
                {cancel}
            </form>
            "##
        )
    }
}

pub struct DraftStats<'a> {
    pub draft: &'a NoteDraft,
}
impl Component for DraftStats<'_> {
    fn render(&self) -> String {
        format!(
            r#"<p id="draft-stats" class="muted">{} words · {} characters</p>"#,
            self.draft.word_count(),
            self.draft.char_count()
        )
    }
}

pub struct NoteList<'a> {
    pub notes: &'a [Note],
    pub view: &'a ViewState,
    pub archived: bool,
    pub now: DateTime<Utc>,
}
impl Component for NoteList<'_> {
    fn render(&self) -> String {
        if self.notes.is_empty() {
            let filtering =
                !self.view.search.is_empty() || !self.view.selected_tag.is_empty();
            let message = match (filtering, self.archived) {
                (true, _) => "No notes match your filters.",
                (false, true) => "No archived notes.",
                (false, false) => "No notes yet. Write your first one above!",
            };
            return format!(
                r#"<section id="note-list"><p class="muted">{message}</p></section>"#
            );
        }
        let cards = self.notes.iter().fold(String::new(), |mut acc, note| {
            acc.push_str(
                &NoteCard {
                    note,
                    expanded: self.view.expanded.contains(&note.id),
                    menu_open: self.view.export_menu.as_ref() == Some(&note.id),
                    now: self.now,
                }
                .render(),
            );
            acc
        });
        let count = self.notes.len();
        let noun = if count == 1 { "note" } else { "notes" };
        format!(
            r#"
            <section id="note-list">
                <p class="muted">{count} {noun}</p>
                <div class="notes">{cards}</div>
            </section>
            "#
        )
    }
}

pub struct NoteCard<'a> {
    pub note: &'a Note,
    pub expanded: bool,
    pub menu_open: bool,
    pub now: DateTime<Utc>,
}
impl Component for NoteCard<'_> {
    fn render(&self) -> String {
        let note = self.note;
        let id = clean_text(&note.id.0);
        let title = clean_text(&note.title);
        let background = note.color.hex();
        let pinned_class = if note.pinned { "pinned" } else { "" };
        let pin_label = if note.pinned { "Unpin" } else { "Pin" };
        let archive_label = if note.archived { "Unarchive" } else { "Archive" };
        let body = if self.expanded {
            format!(
                r#"<div class="prose">{}</div>"#,
                clean(&markdown::to_html(&note.content))
            )
        } else {
            let mut preview: String =
                note.content.chars().take(config::PREVIEW_CHARS).collect();
            if note.content.chars().count() > config::PREVIEW_CHARS {
                preview.push('…');
            }
            format!(r#"<p style="white-space: pre-wrap;">{}</p>"#, clean_text(&preview))
        };
        let expand_label = if self.expanded { "Collapse" } else { "Preview" };
        let menu = if self.menu_open {
            format!(
                r##"
                <div class="export-menu">
                    <a href="/notes/{id}/export.txt" download>Export as text</a>
                    <a href="/notes/{id}/export.html" target="_blank">Print / save as PDF</a>
                    <button hx-post="/export-menu/close" hx-target="#note-list">Close</button>
                </div>
                "##
            )
        } else {
            String::new()
        };
        let tags = note.tags.iter().fold(String::new(), |mut acc, tag| {
            let _ = write!(acc, r#"<span class="tag">#{}</span>"#, clean_text(tag));
            acc
        });
        let updated = relative_time(note.updated_at, self.now);
        format!(
            r##"
            <article class="note-card {pinned_class}" style="background: {background};">
                <h3>{title}</h3>
                <div class="actions">
                    <button hx-post="/notes/{id}/pin" hx-target="#note-list">{pin_label}</button>
                    <button hx-post="/notes/{id}/archive" hx-target="#note-list">{archive_label}</button>
                    <button hx-get="/notes/{id}/edit" hx-target="#note-form">Edit</button>
                    <button
                        hx-post="/notes/{id}/delete"
                        hx-target="#note-list"
                        hx-confirm="Delete this note? This cannot be undone."
                        hx-vals='{{"confirmed": "true"}}'
                    >Delete</button>
                    <button class="export-toggle" hx-post="/notes/{id}/export-menu" hx-target="#note-list">Export</button>
                </div>
                {menu}
                {body}
                <button hx-post="/notes/{id}/expand" hx-target="#note-list">{expand_label}</button>
                <footer>
                    <div>{tags}</div>
                    <span class="muted">Updated {updated}</span>
                </footer>
            </article>
            "##
        )
    }
}

/// The list plus whatever else has to change alongside it: the tag filter
/// always, and the editor when a submission should reset it.
pub struct ListUpdate<'a> {
    pub list: NoteList<'a>,
    pub tags: &'a [String],
    pub editor: Option<NoteEditor<'a>>,
}
impl Component for ListUpdate<'_> {
    fn render(&self) -> String {
        let tag_filter = TagFilter {
            tags: self.tags,
            selected: &self.list.view.selected_tag,
            oob: true,
        }
        .render();
        let editor = self
            .editor
            .as_ref()
            .map(|e| e.render())
            .unwrap_or_default();
        [self.list.render(), tag_filter, editor].join("\n")
    }
}
