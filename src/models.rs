//! Data models for the note log and the page archiver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Note Records
// ============================================================================

/// One note in the log. The serialized form is a heading line
/// (`## {timestamp}` with an optional ` - {title}` suffix) followed by a
/// blank line and the Markdown body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub timestamp: String,
    pub title: Option<String>,
    pub body: String,
}

impl NoteRecord {
    /// Parse a raw log chunk (heading line + body) into a record. Lenient: a
    /// chunk without the `## ` prefix still treats its first line as the
    /// heading, matching how the log has always been read.
    pub fn from_chunk(chunk: &str) -> NoteRecord {
        let (heading, body) = match chunk.split_once('\n') {
            Some((h, b)) => (h, b),
            None => (chunk, ""),
        };
        let heading = heading.trim();
        let heading = heading.strip_prefix("## ").unwrap_or(heading);
        let (timestamp, title) = match heading.split_once(" - ") {
            Some((ts, t)) => (ts.to_string(), Some(t.to_string())),
            None => (heading.to_string(), None),
        };

        NoteRecord {
            timestamp,
            title,
            body: body.trim_start_matches('\n').to_string(),
        }
    }

    /// Serialize back to the chunk form stored in the log.
    pub fn to_chunk(&self) -> String {
        let title = self
            .title
            .as_deref()
            .map(|t| format!(" - {}", t))
            .unwrap_or_default();
        format!("## {}{}\n\n{}", self.timestamp, title, self.body)
    }

    /// The heading text shown above the rendered note.
    pub fn display_heading(&self) -> String {
        match self.title.as_deref() {
            Some(t) => format!("{} - {}", self.timestamp, t),
            None => self.timestamp.clone(),
        }
    }
}

// ============================================================================
// Archive Records
// ============================================================================

/// Metadata describing one archived page, persisted as the `.tags` sidecar
/// next to the saved HTML copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub url: String,
    /// Human-readable fetch time (`%Y-%m-%d %H:%M:%S`).
    pub fetched_at: String,
    pub title: String,
    pub local_file: PathBuf,
    pub keywords: Option<String>,
    pub description: Option<String>,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleCheckboxRequest {
    pub checked: bool,
    pub checkbox_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveLinkRequest {
    pub url: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_round_trip_with_title() {
        let record = NoteRecord {
            timestamp: "2024-06-01 10:00:00".to_string(),
            title: Some("groceries".to_string()),
            body: "- [ ] milk\n- [ ] eggs".to_string(),
        };
        assert_eq!(NoteRecord::from_chunk(&record.to_chunk()), record);
    }

    #[test]
    fn test_chunk_round_trip_without_title() {
        let record = NoteRecord {
            timestamp: "2024-06-01 10:00:00".to_string(),
            title: None,
            body: "just text".to_string(),
        };
        let chunk = record.to_chunk();
        assert_eq!(chunk, "## 2024-06-01 10:00:00\n\njust text");
        assert_eq!(NoteRecord::from_chunk(&chunk), record);
    }

    #[test]
    fn test_from_chunk_title_split_ignores_date_hyphens() {
        let record = NoteRecord::from_chunk("## 2024-06-01 10:00:00 - my - title\n\nbody");
        assert_eq!(record.timestamp, "2024-06-01 10:00:00");
        assert_eq!(record.title.as_deref(), Some("my - title"));
    }

    #[test]
    fn test_from_chunk_without_heading_prefix() {
        let record = NoteRecord::from_chunk("plain first line\nsecond line");
        assert_eq!(record.timestamp, "plain first line");
        assert_eq!(record.title, None);
        assert_eq!(record.body, "second line");
    }

    #[test]
    fn test_from_chunk_heading_only() {
        let record = NoteRecord::from_chunk("## 2024-06-01 10:00:00");
        assert_eq!(record.timestamp, "2024-06-01 10:00:00");
        assert_eq!(record.body, "");
    }
}
