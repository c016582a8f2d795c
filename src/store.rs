//! The note log: codec and store orchestration.
//!
//! The log is a single UTF-8 file of note chunks joined by a literal
//! separator token. The store owns that file exclusively: every operation is
//! a whole-file read-modify-write with last-writer-wins semantics, which is
//! acceptable for a single-user local tool. The separator is structural and
//! unescaped; a body containing the exact token corrupts parsing.

use crate::archive::{self, ArchiveConfig};
use crate::checkbox;
use crate::models::NoteRecord;
use crate::render;
use crate::NOTE_SEPARATOR;
use chrono::Local;
use std::fs;
use std::io;
use std::path::PathBuf;

// ============================================================================
// Log Codec
// ============================================================================

/// Split a raw log blob into note chunks: exact substrings between
/// separators, trimmed, with empty chunks discarded.
pub fn parse_log(blob: &str) -> Vec<String> {
    blob.split(NOTE_SEPARATOR)
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| chunk.to_string())
        .collect()
}

/// Join chunks back into a log blob. `serialize_log(&parse_log(x))` is the
/// identity up to whitespace normalization.
pub fn serialize_log(chunks: &[String]) -> String {
    chunks.join(&format!("\n{}\n", NOTE_SEPARATOR))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum StoreError {
    /// Note index out of range. Checkbox indices are never reported this way;
    /// an out-of-range toggle is absorbed silently.
    NotFound,
    Io(io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "note index out of range"),
            StoreError::Io(e) => write!(f, "note log I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

// ============================================================================
// Note Store
// ============================================================================

pub struct NoteStore {
    log_path: PathBuf,
    archive: ArchiveConfig,
}

impl NoteStore {
    pub fn new(log_path: PathBuf, archive: ArchiveConfig) -> Self {
        Self { log_path, archive }
    }

    pub fn archive_config(&self) -> &ArchiveConfig {
        &self.archive
    }

    /// Read the raw log. A missing file is an empty log, created on first
    /// access.
    pub fn load_raw(&self) -> io::Result<String> {
        match fs::read_to_string(&self.log_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::write(&self.log_path, "")?;
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    fn save_raw(&self, content: &str) -> io::Result<()> {
        fs::write(&self.log_path, content)
    }

    pub fn chunks(&self) -> io::Result<Vec<String>> {
        Ok(parse_log(&self.load_raw()?))
    }

    /// Render the whole log to HTML, assigning checkbox indices across all
    /// notes in document order.
    pub fn render_all(&self) -> io::Result<String> {
        Ok(render::render_all(&self.chunks()?))
    }

    pub fn get_raw(&self, index: usize) -> Result<NoteRecord, StoreError> {
        let chunks = self.chunks()?;
        chunks
            .get(index)
            .map(|c| NoteRecord::from_chunk(c))
            .ok_or(StoreError::NotFound)
    }

    /// Create a note: archive markers in the body are substituted first, then
    /// the timestamped record is prepended (the log is newest-first).
    pub async fn create(
        &self,
        title: Option<String>,
        body: &str,
    ) -> Result<NoteRecord, StoreError> {
        let processed = archive::process_archive_markers(body, &self.archive).await;
        let record = NoteRecord {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            title: title.filter(|t| !t.trim().is_empty()),
            body: processed,
        };

        let mut chunks = self.chunks()?;
        chunks.insert(0, record.to_chunk());
        self.save_raw(&serialize_log(&chunks))?;
        Ok(record)
    }

    /// Replace the record at `index` in place. The original timestamp is
    /// preserved; title and body are rewritten, with the same archive-marker
    /// substitution as creation.
    pub async fn update(
        &self,
        index: usize,
        title: Option<String>,
        body: &str,
    ) -> Result<(), StoreError> {
        let mut chunks = self.chunks()?;
        let existing = chunks.get(index).ok_or(StoreError::NotFound)?;
        let timestamp = NoteRecord::from_chunk(existing).timestamp;

        let processed = archive::process_archive_markers(body, &self.archive).await;
        let record = NoteRecord {
            timestamp,
            title: title.filter(|t| !t.trim().is_empty()),
            body: processed,
        };

        chunks[index] = record.to_chunk();
        self.save_raw(&serialize_log(&chunks))?;
        Ok(())
    }

    pub fn delete(&self, index: usize) -> Result<(), StoreError> {
        let mut chunks = self.chunks()?;
        if index >= chunks.len() {
            return Err(StoreError::NotFound);
        }
        chunks.remove(index);
        self.save_raw(&serialize_log(&chunks))?;
        Ok(())
    }

    /// Flip one checkbox in the raw log. Out-of-range indices are a silent
    /// no-op: the index was only valid for the render pass that produced it.
    pub fn toggle_checkbox(&self, global_index: usize, checked: bool) -> io::Result<()> {
        let raw = self.load_raw()?;
        if let Some(updated) = checkbox::toggle(&raw, global_index, checked) {
            self.save_raw(&updated)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> NoteStore {
        NoteStore::new(
            dir.path().join("notes.md"),
            ArchiveConfig {
                sites_dir: dir.path().join("sites"),
                server_port: 8000,
            },
        )
    }

    // ---- codec tests ----

    #[test]
    fn test_parse_serialize_round_trip() {
        let chunks = vec![
            "## 2024-06-02 09:00:00\n\nnewest".to_string(),
            "## 2024-06-01 09:00:00 - t\n\nolder\nmore".to_string(),
        ];
        assert_eq!(parse_log(&serialize_log(&chunks)), chunks);
    }

    #[test]
    fn test_parse_discards_empty_chunks() {
        let blob = format!("\n{sep}\n\n{sep}\nonly note\n{sep}\n", sep = NOTE_SEPARATOR);
        assert_eq!(parse_log(&blob), vec!["only note".to_string()]);
    }

    #[test]
    fn test_parse_empty_blob() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("  \n ").is_empty());
    }

    // ---- store tests ----

    #[tokio::test]
    async fn test_missing_log_reads_as_empty_and_is_created() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        assert_eq!(store.load_raw().unwrap(), "");
        assert!(dir.path().join("notes.md").exists());
    }

    #[tokio::test]
    async fn test_create_prepends_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(None, "first note").await.unwrap();
        store.create(Some("second".to_string()), "second note").await.unwrap();

        let chunks = store.chunks().unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("second note"));
        assert!(chunks[1].contains("first note"));
        assert_eq!(
            NoteRecord::from_chunk(&chunks[0]).title.as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_create_blank_title_becomes_none() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let record = store.create(Some("  ".to_string()), "body").await.unwrap();
        assert_eq!(record.title, None);
    }

    #[tokio::test]
    async fn test_get_raw_and_not_found() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(Some("t".to_string()), "the body").await.unwrap();
        let record = store.get_raw(0).unwrap();
        assert_eq!(record.body, "the body");
        assert!(matches!(store.get_raw(1), Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_replaces_in_place_and_keeps_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(None, "old body").await.unwrap();
        let before = store.get_raw(0).unwrap();

        store
            .update(0, Some("new title".to_string()), "new body")
            .await
            .unwrap();
        let after = store.get_raw(0).unwrap();

        assert_eq!(after.timestamp, before.timestamp);
        assert_eq!(after.title.as_deref(), Some("new title"));
        assert_eq!(after.body, "new body");
        assert_eq!(store.chunks().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_out_of_range() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        assert!(matches!(
            store.update(3, None, "x").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(None, "older").await.unwrap();
        store.create(None, "newer").await.unwrap();

        store.delete(1).unwrap();
        let chunks = store.chunks().unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("newer"));
        assert!(matches!(store.delete(5), Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_toggle_persists_and_is_precise() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(None, "- [ ] buy milk\n- [x] pay rent").await.unwrap();
        let before = store.load_raw().unwrap();

        store.toggle_checkbox(0, true).unwrap();
        let after = store.load_raw().unwrap();

        assert_eq!(before.len(), after.len());
        let diffs = before.bytes().zip(after.bytes()).filter(|(a, b)| a != b).count();
        assert_eq!(diffs, 1);
        assert!(after.contains("- [x] buy milk"));
        assert!(after.contains("- [x] pay rent"));
    }

    #[tokio::test]
    async fn test_toggle_out_of_range_is_silent() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(None, "- [ ] only").await.unwrap();
        let before = store.load_raw().unwrap();
        store.toggle_checkbox(99, true).unwrap();
        assert_eq!(store.load_raw().unwrap(), before);
    }

    #[tokio::test]
    async fn test_toggle_then_render_reflects_state() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(None, "- [ ] buy milk\n- [x] pay rent").await.unwrap();
        store.toggle_checkbox(0, true).unwrap();

        let html = store.render_all().unwrap();
        let first_input = {
            let start = html.find("<input").unwrap();
            let end = start + html[start..].find('>').unwrap();
            &html[start..end]
        };
        assert!(first_input.contains("checked"));
    }

    #[tokio::test]
    async fn test_delete_shifts_remaining_checkbox_to_zero() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.create(None, "- [ ] older task").await.unwrap();
        store.create(None, "- [ ] newer task").await.unwrap();

        // Delete the older note (index 1, since the log is newest-first).
        store.delete(1).unwrap();
        let html = store.render_all().unwrap();

        assert!(html.contains(r#"data-checkbox-index="0""#));
        assert!(!html.contains(r#"data-checkbox-index="1""#));
        assert!(html.contains("newer task"));
    }
}
