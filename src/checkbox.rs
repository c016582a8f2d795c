//! Checkbox token scanning and the toggle resolver.
//!
//! The renderer and the toggle path must agree exactly on what counts as a
//! checkbox, or the global indices handed to the browser stop lining up with
//! the lines they mutate. Both sides therefore share one scanner
//! ([`checkbox_tokens`]) and one fence tracker ([`FenceState`]); the resolver
//! walks the raw log with them in the same order the renderer visits notes.

use crate::NOTE_SEPARATOR;

// ============================================================================
// Token Scanner
// ============================================================================

/// One checkbox occurrence inside a single line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckboxToken {
    /// Byte offset of the marker character (the byte between the brackets).
    pub marker_offset: usize,
    pub checked: bool,
}

/// Scan a line for checkbox tokens: a literal `[`, one of space/`x`/`X`, then
/// `]`. Tokens may appear anywhere in the line, including several per line;
/// they are returned in left-to-right order.
pub fn checkbox_tokens(line: &str) -> Vec<CheckboxToken> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i + 2 < bytes.len() {
        if bytes[i] == b'['
            && matches!(bytes[i + 1], b' ' | b'x' | b'X')
            && bytes[i + 2] == b']'
        {
            tokens.push(CheckboxToken {
                marker_offset: i + 1,
                checked: bytes[i + 1] != b' ',
            });
            i += 3;
        } else {
            i += 1;
        }
    }

    tokens
}

// ============================================================================
// Fence Tracking
// ============================================================================

/// Tracks fenced code blocks across a line walk. Lines inside (or delimiting)
/// a fence carry no checkbox tokens.
#[derive(Debug, Default, Clone)]
pub struct FenceState {
    open: bool,
}

impl FenceState {
    /// Observe one line; returns true if the line should be scanned.
    pub fn scannable(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            self.open = !self.open;
            return false;
        }
        !self.open
    }
}

// ============================================================================
// Toggle Resolver
// ============================================================================

/// Flip the checkbox with the given global index inside the raw note log.
///
/// Walks the log line by line in the order the renderer visits it: separator
/// lines reset per-note state, each note's heading line is skipped (it is
/// never rendered as body text), and every remaining line is scanned with the
/// shared token scanner. Exactly the marker byte of the matching token is
/// rewritten; every other byte of the log is preserved.
///
/// Returns `None` when `global_index` is out of range, which callers treat as
/// a silent no-op: the index is only valid for one rendered view, and a stale
/// toggle racing a re-render is not an error.
pub fn toggle(raw_log: &str, global_index: usize, checked: bool) -> Option<String> {
    let mut offset = 0;
    let mut counter = 0;
    let mut fences = FenceState::default();
    let mut awaiting_heading = true;

    for line in raw_log.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        let trimmed = content.trim();

        if trimmed == NOTE_SEPARATOR {
            fences = FenceState::default();
            awaiting_heading = true;
        } else if awaiting_heading {
            if !trimmed.is_empty() {
                awaiting_heading = false;
            }
        } else if fences.scannable(content) {
            for token in checkbox_tokens(content) {
                if counter == global_index {
                    let at = offset + token.marker_offset;
                    let mut updated = raw_log.to_string();
                    updated.replace_range(at..at + 1, if checked { "x" } else { " " });
                    return Some(updated);
                }
                counter += 1;
            }
        }

        offset += line.len();
    }

    None
}

// ============================================================================
// Tests
// ============================================================================
