//! One-way renderings of notes for download or printing. Nothing here
//! touches the network.

use super::models::Note;
use ammonia::clean_text;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Write;

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FMT).to_string()
}

fn tag_line(note: &Note) -> String {
    if note.tags.is_empty() {
        "None".to_string()
    } else {
        note.tags.join(", ")
    }
}

pub fn note_as_text(note: &Note) -> String {
    format!(
        "Title: {title}\n\n{content}\n\nTags: {tags}\nCreated: {created}\nUpdated: {updated}",
        title = note.title,
        content = note.content,
        tags = tag_line(note),
        created = timestamp(&note.created_at),
        updated = timestamp(&note.updated_at),
    )
}

pub fn all_notes_as_text(notes: &[Note]) -> String {
    let mut out = String::from("=== ALL NOTES EXPORT ===\n\n");
    for (i, note) in notes.iter().enumerate() {
        let _ = write!(
            out,
            "\n--- Note {index} ---\n{body}\n\n{rule}\n",
            index = i + 1,
            body = note_as_text(note),
            rule = "=".repeat(50),
        );
    }
    out
}

/// A standalone document that opens the browser's print dialog, so the
/// user can save it as PDF.
pub fn note_as_print_html(note: &Note) -> String {
    let title = clean_text(&note.title);
    let content = note
        .content
        .lines()
        .map(clean_text)
        .collect::<Vec<_>>()
        .join("<br>");
    let tags = if note.tags.is_empty() {
        "No tags".to_string()
    } else {
        note.tags.iter().fold(String::new(), |mut acc, tag| {
            let _ = write!(acc, r#"<span class="tag">#{}</span>"#, clean_text(tag));
            acc
        })
    };
    let created = timestamp(&note.created_at);
    let updated = timestamp(&note.updated_at);
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <title>{title}</title>
        <style>
            body {{ font-family: Arial, sans-serif; padding: 40px; line-height: 1.6; }}
            h1 {{ color: #333; border-bottom: 2px solid #667eea; padding-bottom: 10px; }}
            .meta {{ color: #666; font-size: 14px; margin-top: 20px; }}
            .tags {{ margin-top: 10px; }}
            .tag {{ display: inline-block; background: #667eea; color: white; padding: 4px 10px; border-radius: 15px; margin-right: 5px; font-size: 12px; }}
            @media print {{ body {{ padding: 20px; }} }}
        </style>
    </head>
    <body>
        <h1>{title}</h1>
        <div style="white-space: pre-wrap; margin-top: 20px;">{content}</div>
        <div class="meta">
            <div class="tags">{tags}</div>
            <p>Created: {created}</p>
            <p>Updated: {updated}</p>
        </div>
        <script>window.addEventListener('load', () => setTimeout(() => window.print(), 250));</script>
    </body>
</html>
"#
    )
}

/// Anything that is not an ASCII letter or digit becomes `_`.
pub fn export_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.txt")
}

pub fn all_notes_filename(today: NaiveDate) -> String {
    format!("all_notes_{}.txt", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Color;
    use chrono::TimeZone;

    fn note() -> Note {
        Note {
            id: "n1".into(),
            title: "Groceries".into(),
            content: "milk, eggs\nbread".into(),
            tags: vec!["home".into(), "weekly".into()],
            color: Color::Yellow,
            pinned: false,
            archived: false,
            created_at: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 2, 4, 4, 5, 6).unwrap(),
        }
    }

    #[test]
    fn test_text_export_layout() {
        assert_eq!(
            note_as_text(&note()),
            "Title: Groceries\n\nmilk, eggs\nbread\n\nTags: home, weekly\n\
             Created: 2024-02-03 04:05:06 UTC\nUpdated: 2024-02-04 04:05:06 UTC"
        );
        let mut untagged = note();
        untagged.tags.clear();
        assert!(note_as_text(&untagged).contains("\nTags: None\n"));
    }

    #[test]
    fn test_text_export_recovers_title_and_tags() {
        let original = note();
        let text = note_as_text(&original);
        let title = text
            .lines()
            .find_map(|l| l.strip_prefix("Title: "))
            .expect("title line");
        let tags: Vec<String> = text
            .lines()
            .find_map(|l| l.strip_prefix("Tags: "))
            .expect("tag line")
            .split(", ")
            .map(String::from)
            .collect();
        assert_eq!(title, original.title);
        assert_eq!(tags, original.tags);
    }

    #[test]
    fn test_all_notes_export_numbers_each_note() {
        let mut second = note();
        second.title = "Standup".into();
        let text = all_notes_as_text(&[note(), second]);
        assert!(text.starts_with("=== ALL NOTES EXPORT ===\n\n"));
        assert!(text.contains("\n--- Note 1 ---\nTitle: Groceries\n"));
        assert!(text.contains("\n--- Note 2 ---\nTitle: Standup\n"));
        assert_eq!(text.matches(&"=".repeat(50)).count(), 2);
        assert_eq!(all_notes_as_text(&[]), "=== ALL NOTES EXPORT ===\n\n");
    }

    #[test]
    fn test_print_html_sanitizes_user_content() {
        let mut evil = note();
        evil.title = "Hi <script>alert('title')</script>".into();
        evil.content = "line one\n<img src=x onerror=alert('content')>".into();
        let html = note_as_print_html(&evil);
        assert!(!html.contains("alert('title')"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("line&#32;one<br>"));
        assert!(html.contains(r#"<span class="tag">#home</span>"#));
        assert!(html.contains("window.print()"));

        evil.tags.clear();
        assert!(note_as_print_html(&evil).contains("No tags"));
    }

    #[test]
    fn test_print_html_keeps_markup_as_text() {
        let mut literal = note();
        literal.title = "Use <b> tags".into();
        literal.content = "Example: <script>alert(1)</script>\nand <b>bold</b>".into();
        let html = note_as_print_html(&literal);
        assert!(html.contains("<h1>Use&#32;&lt;b&gt;&#32;tags</h1>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;&#47;script&gt;<br>"));
        assert!(html.contains("&lt;b&gt;bold&lt;&#47;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_filenames() {
        assert_eq!(export_filename("Q3 plan: v2!"), "Q3_plan__v2_.txt");
        assert_eq!(
            all_notes_filename(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            "all_notes_2024-05-01.txt"
        );
    }
}
