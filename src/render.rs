//! Markdown rendering with the interactive-checkbox extension.
//!
//! Rendering a note is a three-stage pipeline:
//! 1. checkbox substitution over the raw body using the shared scanner from
//!    `checkbox` (so the renderer and the toggle resolver enumerate tokens
//!    identically), threading a global index through an explicit accumulator;
//! 2. pulldown-cmark parsing, with a `match` over the event stream that
//!    special-cases image references;
//! 3. HTML sanitization via ammonia, configured to admit the checkbox
//!    `<input>` elements and their data attributes.
//!
//! `render_all` folds the pipeline over the ordered note chunks so checkbox
//! indices form one index space across the whole page. Indices are recomputed
//! from scratch on every render and are only valid for one rendered view.

use crate::checkbox::{checkbox_tokens, FenceState};
use crate::models::NoteRecord;
use pulldown_cmark::{html, Event, Parser, Tag, TagEnd};

// ============================================================================
// Text Escaping
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ============================================================================
// Checkbox Substitution
// ============================================================================

fn checkbox_html(checked: bool, note_index: usize, checkbox_index: usize) -> String {
    format!(
        r#"<input type="checkbox"{} data-note-index="{}" data-checkbox-index="{}">"#,
        if checked { " checked" } else { "" },
        note_index,
        checkbox_index
    )
}

/// Replace every checkbox token in `body` with its `<input>` element, indices
/// seeded from `start_index`. Returns the rewritten body and the next free
/// index. Fenced code blocks are left untouched.
fn substitute_checkboxes(body: &str, note_index: usize, start_index: usize) -> (String, usize) {
    let mut out = String::with_capacity(body.len());
    let mut index = start_index;
    let mut fences = FenceState::default();

    for (i, line) in body.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }

        if !fences.scannable(line) {
            out.push_str(line);
            continue;
        }

        let tokens = checkbox_tokens(line);
        if tokens.is_empty() {
            out.push_str(line);
            continue;
        }

        let mut consumed = 0;
        for token in tokens {
            out.push_str(&line[consumed..token.marker_offset - 1]);
            out.push_str(&checkbox_html(token.checked, note_index, index));
            index += 1;
            consumed = token.marker_offset + 2;
        }
        out.push_str(&line[consumed..]);
    }

    (out, index)
}

// ============================================================================
// Image Handling
// ============================================================================

/// Embeddable references (local asset store or absolute remote URLs) render
/// as an image wrapped in a link to the original; anything else becomes a
/// download link showing the basename.
fn image_html(dest: &str, title: &str, alt: &str) -> String {
    let embeddable = dest.starts_with("/assets/")
        || dest.starts_with("http://")
        || dest.starts_with("https://");

    if embeddable {
        let title_attr = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, html_escape(title))
        };
        format!(
            r#"<a href="{0}"><img src="{0}" alt="{1}"{2}></a>"#,
            html_escape(dest),
            html_escape(alt),
            title_attr
        )
    } else {
        let basename = dest.rsplit('/').next().unwrap_or(dest);
        format!(
            r#"<a href="{}" download>{}</a>"#,
            html_escape(dest),
            html_escape(basename)
        )
    }
}

// ============================================================================
// Sanitization
// ============================================================================

fn sanitize(html: &str) -> String {
    ammonia::Builder::default()
        .add_tags(["input"])
        .add_tag_attributes(
            "input",
            ["type", "checked", "data-note-index", "data-checkbox-index"],
        )
        .add_tag_attributes("a", ["download"])
        .clean(html)
        .to_string()
}

// ============================================================================
// Note Rendering
// ============================================================================

/// Render one note body to sanitized HTML. Checkbox indices start at
/// `start_index`; the returned value is the ending index, to be passed as the
/// starting index of the next note in the page.
pub fn render_note(body: &str, note_index: usize, start_index: usize) -> (String, usize) {
    let (prepared, ending_index) = substitute_checkboxes(body, note_index, start_index);

    let mut parser = Parser::new(&prepared);
    let mut events: Vec<Event> = Vec::new();

    while let Some(event) = parser.next() {
        match event {
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                // Collect the alt text up to the matching end tag.
                let mut alt = String::new();
                for inner in parser.by_ref() {
                    match inner {
                        Event::End(TagEnd::Image) => break,
                        Event::Text(t) => alt.push_str(&t),
                        Event::Code(c) => alt.push_str(&c),
                        _ => {}
                    }
                }
                events.push(Event::Html(image_html(&dest_url, &title, &alt).into()));
            }
            other => events.push(other),
        }
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    (sanitize(&html_output), ending_index)
}

// ============================================================================
// Page Rendering (checkbox index assigner)
// ============================================================================

/// Render every chunk in log order, threading the checkbox index through the
/// sequence so the whole page shares one index space.
pub fn render_all(chunks: &[String]) -> String {
    let mut global_index = 0;
    let mut sections = Vec::with_capacity(chunks.len());

    for (note_index, chunk) in chunks.iter().enumerate() {
        let record = NoteRecord::from_chunk(chunk);
        let (rendered, ending) = render_note(&record.body, note_index, global_index);
        global_index = ending;

        sections.push(format!(
            r#"<div class="note markdown-body" id="note-{note_index}">
    <div class="note-header">
        <span class="note-timestamp">Posted: {heading}</span>
        <span class="note-actions">
            <button class="note-edit" data-note-index="{note_index}">edit</button>
            <button class="note-delete" data-note-index="{note_index}">delete</button>
        </span>
    </div>
    {rendered}
</div>"#,
            note_index = note_index,
            heading = html_escape(&record.display_heading()),
            rendered = rendered,
        ));
    }

    sections.join("\n")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Split rendered HTML into one segment per `<input` tag (tag text only),
    /// in document order. Keeps assertions independent of attribute order.
    fn input_tags(html: &str) -> Vec<String> {
        html.match_indices("<input")
            .map(|(start, _)| {
                let end = html[start..].find('>').map(|e| start + e).unwrap_or(html.len());
                html[start..end].to_string()
            })
            .collect()
    }

    // ---- substitution tests ----

    #[test]
    fn test_substitute_assigns_sequential_indices() {
        let (out, ending) = substitute_checkboxes("- [ ] a\n- [x] b\n- [ ] c", 0, 0);
        assert_eq!(ending, 3);
        assert!(out.contains(r#"data-checkbox-index="0""#));
        assert!(out.contains(r#"data-checkbox-index="1""#));
        assert!(out.contains(r#"data-checkbox-index="2""#));
    }

    #[test]
    fn test_substitute_seeds_from_start_index() {
        let (out, ending) = substitute_checkboxes("- [ ] a", 2, 7);
        assert_eq!(ending, 8);
        assert!(out.contains(r#"data-note-index="2""#));
        assert!(out.contains(r#"data-checkbox-index="7""#));
    }

    #[test]
    fn test_substitute_preserves_surrounding_text() {
        let (out, _) = substitute_checkboxes("before [ ] after", 0, 0);
        assert!(out.starts_with("before "));
        assert!(out.ends_with(" after"));
    }

    #[test]
    fn test_substitute_skips_fenced_code() {
        let (out, ending) = substitute_checkboxes("```\n- [ ] nope\n```", 0, 0);
        assert_eq!(ending, 0);
        assert!(!out.contains("<input"));
        assert!(out.contains("- [ ] nope"));
    }

    // ---- render_note tests ----

    #[test]
    fn test_create_and_render_scenario() {
        let (html, ending) = render_note("- [ ] buy milk\n- [x] pay rent", 0, 0);
        let inputs = input_tags(&html);

        assert_eq!(ending, 2);
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].contains(r#"data-checkbox-index="0""#));
        assert!(!inputs[0].contains("checked"));
        assert!(inputs[1].contains(r#"data-checkbox-index="1""#));
        assert!(inputs[1].contains("checked"));
        assert!(html.contains("buy milk"));
        assert!(html.contains("pay rent"));
    }

    #[test]
    fn test_render_inline_checkbox_in_paragraph() {
        let (html, ending) = render_note("remember [ ] to call", 0, 0);
        assert_eq!(ending, 1);
        assert_eq!(input_tags(&html).len(), 1);
    }

    #[test]
    fn test_render_markdown_blocks_survive() {
        let (html, _) = render_note("# Heading\n\n*emphasis* and [a link](https://example.com)", 0, 0);
        assert!(html.contains("<h1>"));
        assert!(html.contains("<em>"));
        assert!(html.contains("href=\"https://example.com\""));
    }

    #[test]
    fn test_render_sanitizes_script() {
        let (html, _) = render_note("<script>alert(1)</script>hello", 0, 0);
        assert!(!html.contains("<script"));
        assert!(html.contains("hello"));
    }

    #[test]
    fn test_render_local_asset_image_is_embedded() {
        let (html, _) = render_note("![pic](/assets/images/pic.png)", 0, 0);
        assert!(html.contains("<img"));
        assert!(html.contains(r#"src="/assets/images/pic.png""#));
        assert!(html.contains(r#"href="/assets/images/pic.png""#));
    }

    #[test]
    fn test_render_remote_image_is_embedded() {
        let (html, _) = render_note("![pic](https://example.com/p.png)", 0, 0);
        assert!(html.contains("<img"));
        assert!(html.contains(r#"src="https://example.com/p.png""#));
    }

    #[test]
    fn test_render_other_reference_is_download_link() {
        let (html, _) = render_note("![report](files/report.pdf)", 0, 0);
        assert!(!html.contains("<img"));
        assert!(html.contains("report.pdf</a>"));
        assert!(html.contains("download"));
    }

    // ---- render_all tests ----

    fn chunk(ts: &str, body: &str) -> String {
        format!("## {}\n\n{}", ts, body)
    }

    #[test]
    fn test_render_all_threads_indices_across_notes() {
        let chunks = vec![
            chunk("2024-06-02 09:00:00", "- [ ] newest"),
            chunk("2024-06-01 09:00:00", "- [ ] older a\n- [x] older b"),
        ];
        let html = render_all(&chunks);
        let inputs = input_tags(&html);

        assert_eq!(inputs.len(), 3);
        assert!(inputs[0].contains(r#"data-checkbox-index="0""#));
        assert!(inputs[0].contains(r#"data-note-index="0""#));
        assert!(inputs[1].contains(r#"data-checkbox-index="1""#));
        assert!(inputs[1].contains(r#"data-note-index="1""#));
        assert!(inputs[2].contains(r#"data-checkbox-index="2""#));
    }

    #[test]
    fn test_render_all_is_stable_across_passes() {
        let chunks = vec![
            chunk("2024-06-02 09:00:00", "- [ ] a\n\ntext [x] inline"),
            chunk("2024-06-01 09:00:00", "- [ ] b"),
        ];
        assert_eq!(render_all(&chunks), render_all(&chunks));
    }

    #[test]
    fn test_insert_ahead_shifts_indices_by_checkbox_count() {
        let existing = chunk("2024-06-01 09:00:00", "- [ ] one\n- [ ] two");
        let before = render_all(&[existing.clone()]);
        assert!(before.contains(r#"data-checkbox-index="0""#));
        assert!(before.contains(r#"data-checkbox-index="1""#));

        // Two new checkboxes ahead shift the existing ones by exactly two.
        let inserted = chunk("2024-06-02 09:00:00", "- [ ] new a\n- [ ] new b");
        let after = render_all(&[inserted, existing]);
        let inputs = input_tags(&after);
        assert_eq!(inputs.len(), 4);
        assert!(inputs[2].contains(r#"data-checkbox-index="2""#));
        assert!(inputs[3].contains(r#"data-checkbox-index="3""#));
    }

    #[test]
    fn test_render_all_escapes_heading() {
        let chunks = vec![chunk("2024-06-01 09:00:00 - <b>bold</b>", "body")];
        let html = render_all(&chunks);
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_render_all_empty_log() {
        assert_eq!(render_all(&[]), "");
    }
}
