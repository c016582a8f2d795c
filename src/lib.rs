//! Noteflow - a local single-user Markdown note log.
//!
//! Notes live in one flat text file, separated by a literal token. Each note
//! renders to HTML with interactive checkboxes whose global indices map
//! toggles back onto the exact source line. Bodies may carry `+<url>` archive
//! markers that snapshot the referenced page into a locally browsable copy.
//!
//! - `models`: note and archive records, request types
//! - `store`: the log codec and the store orchestrator
//! - `checkbox`: the shared token scanner and the toggle resolver
//! - `render`: Markdown rendering and checkbox index assignment
//! - `archive`: page fetching, resource localization, link listing
//! - `handlers`: HTTP route handlers
//! - `templates`: the index page

use std::fs;
use std::path::PathBuf;

pub mod archive;
pub mod checkbox;
pub mod handlers;
pub mod models;
pub mod render;
pub mod store;
pub mod templates;

// ============================================================================
// Configuration
// ============================================================================

pub const NOTES_FILE: &str = "notes.md";
pub const NOTE_SEPARATOR: &str = "===NOTE===";
pub const ASSETS_DIR: &str = "assets";
pub const IMAGES_DIR: &str = "assets/images";
pub const SITES_DIR: &str = "assets/sites";

/// Timeout for archive fetches; a hanging remote stalls note submission for
/// at most this long.
pub const FETCH_TIMEOUT_SECS: u64 = 15;

/// Some sites refuse obviously non-browser clients, so archive fetches carry
/// a realistic desktop user agent.
pub const ARCHIVE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub store: store::NoteStore,
}

impl AppState {
    pub fn new(server_port: u16) -> Self {
        fs::create_dir_all(IMAGES_DIR).ok();
        fs::create_dir_all(SITES_DIR).ok();

        Self {
            store: store::NoteStore::new(
                PathBuf::from(NOTES_FILE),
                archive::ArchiveConfig {
                    sites_dir: PathBuf::from(SITES_DIR),
                    server_port,
                },
            ),
        }
    }
}

// Re-export commonly used types
pub use archive::{
    archive_page, is_self_reference, list_archived_links, process_archive_markers, ArchiveConfig,
};
pub use checkbox::{checkbox_tokens, toggle, CheckboxToken, FenceState};
pub use models::{ArchiveRecord, NoteRecord};
pub use render::{html_escape, render_all, render_note};
pub use store::{parse_log, serialize_log, NoteStore, StoreError};
