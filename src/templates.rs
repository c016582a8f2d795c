//! The index page: styles, client-side script, and HTML shell.
//!
//! Everything dynamic is fetched from the API as rendered fragments; this
//! page is a static shell plus vanilla-JS wiring.

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    color: #333;
    background: #fafafa;
    margin-top: 180px;
}

.fixed-header {
    position: fixed;
    top: 0; left: 0; right: 0;
    background: #fff;
    box-shadow: 0 1px 3px rgba(0,0,0,0.1);
    z-index: 10;
    padding: 0.75rem 1rem 1rem;
    display: flex;
    gap: 1rem;
}

.note-form { flex: 2; }
.note-form label { font-size: 0.8rem; color: #666; display: block; }
.note-form input[type="text"], .note-form textarea {
    width: 100%;
    padding: 0.4rem;
    border: 1px solid #ccc;
    border-radius: 4px;
    font: inherit;
    margin-bottom: 0.5rem;
}
.note-form button {
    padding: 0.3rem 1rem;
    border: none;
    border-radius: 4px;
    background: #2563eb;
    color: #fff;
    cursor: pointer;
}
.note-form button:hover { background: #1d4ed8; }

.task-panel {
    flex: 1;
    border-left: 1px solid #eee;
    padding-left: 1rem;
    max-height: 150px;
    overflow-y: auto;
}
.task-panel h3 { font-size: 0.9rem; margin-bottom: 0.25rem; }
.task-item { display: flex; gap: 0.4rem; align-items: flex-start; font-size: 0.85rem; }
.task-item .task-text { flex: 1; word-break: break-word; }

.notes-container { max-width: 64rem; margin: 0 auto; padding: 0 1rem; }

.note {
    background: #fff;
    border: 1px solid #eee;
    border-radius: 0.5rem;
    padding: 1rem;
    margin-bottom: 1.5rem;
}
.note-header {
    display: flex;
    justify-content: space-between;
    margin-bottom: 0.5rem;
}
.note-timestamp { font-size: 0.75rem; color: #6b7280; }
.note-actions button {
    border: none;
    background: none;
    color: #6b7280;
    font-size: 0.75rem;
    cursor: pointer;
}
.note-actions button:hover { color: #2563eb; }

.markdown-body h1, .markdown-body h2 { margin: 0.75rem 0; color: #2563eb; }
.markdown-body p { margin: 0.5rem 0; }
.markdown-body ul, .markdown-body ol { padding-left: 1.5rem; }
.markdown-body img { max-width: 100%; }
.markdown-body pre {
    background: #f3f4f6;
    padding: 0.75rem;
    border-radius: 4px;
    overflow-x: auto;
}
.markdown-body input[type="checkbox"] { margin-right: 0.5rem; }

.archived-link { margin: 0.5rem 0; }
.archive-reference { display: block; font-size: 0.8rem; }
.archived-link-removed { color: #9ca3af; font-style: italic; }

.links-section {
    max-width: 64rem;
    margin: 0 auto 2rem;
    padding: 0 1rem;
    font-size: 0.9rem;
}
"#;

// ============================================================================
// Client Script
// ============================================================================

const SCRIPT: &str = r#"
let editingIndex = null;

async function loadNotes() {
    const response = await fetch('/api/notes');
    document.getElementById('notes').innerHTML = await response.text();
    updateActiveTasks();
}

async function loadLinks() {
    const response = await fetch('/api/links');
    document.getElementById('links').innerHTML = await response.text();
}

function updateActiveTasks() {
    const container = document.getElementById('activeTasks');
    const unchecked = document.querySelectorAll('#notes input[type="checkbox"]:not(:checked)');
    container.innerHTML = '';

    unchecked.forEach((checkbox) => {
        const item = checkbox.closest('li') || checkbox.closest('p');
        if (!item) return;
        const row = document.createElement('div');
        row.className = 'task-item';
        const proxy = document.createElement('input');
        proxy.type = 'checkbox';
        proxy.setAttribute('data-checkbox-index', checkbox.getAttribute('data-checkbox-index'));
        const text = document.createElement('span');
        text.className = 'task-text';
        text.textContent = item.textContent.trim();
        row.appendChild(proxy);
        row.appendChild(text);
        container.appendChild(row);
    });

    if (unchecked.length === 0) {
        container.innerHTML = '<div class="task-text">No active tasks</div>';
    }
}

document.getElementById('noteForm').addEventListener('submit', async (e) => {
    e.preventDefault();
    const titleInput = document.getElementById('noteTitle');
    const noteInput = document.getElementById('noteInput');
    const content = noteInput.value.trim();
    if (!content) return;

    const payload = JSON.stringify({ title: titleInput.value.trim(), content });
    const target = editingIndex === null ? '/api/notes' : '/api/note/' + editingIndex;
    const response = await fetch(target, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: payload
    });

    if (!response.ok) {
        alert('Failed to save note');
        return;
    }

    editingIndex = null;
    document.getElementById('submitNote').textContent = 'Add Note';
    titleInput.value = '';
    noteInput.value = '';
    await loadNotes();
    await loadLinks();
});

document.addEventListener('click', async (event) => {
    const target = event.target;

    if (target.matches('input[type="checkbox"][data-checkbox-index]')) {
        await fetch('/api/update-checkbox', {
            method: 'PATCH',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({
                checked: target.checked,
                checkbox_index: parseInt(target.getAttribute('data-checkbox-index'))
            })
        });
        await loadNotes();
        return;
    }

    if (target.matches('.note-edit')) {
        const index = target.getAttribute('data-note-index');
        const response = await fetch('/api/note/' + index);
        if (!response.ok) return;
        const record = await response.json();
        document.getElementById('noteTitle').value = record.title || '';
        document.getElementById('noteInput').value = record.body;
        document.getElementById('submitNote').textContent = 'Save Note';
        editingIndex = index;
        window.scrollTo(0, 0);
        return;
    }

    if (target.matches('.note-delete')) {
        const index = target.getAttribute('data-note-index');
        if (!confirm('Delete this note?')) return;
        await fetch('/api/note/' + index, { method: 'DELETE' });
        await loadNotes();
    }
});

loadNotes();
loadLinks();
"#;

// ============================================================================
// Page Shell
// ============================================================================

pub fn index_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Noteflow</title>
    <style>{style}</style>
</head>
<body>
    <div class="fixed-header">
        <form id="noteForm" class="note-form">
            <label for="noteTitle">Note title</label>
            <input type="text" id="noteTitle" placeholder="Optional title...">
            <label for="noteInput">New note</label>
            <textarea id="noteInput" rows="4"
                placeholder="Markdown. Use [ ] for tasks, +https://... to archive a page."></textarea>
            <button type="submit" id="submitNote">Add Note</button>
        </form>
        <div class="task-panel">
            <h3>Active Tasks</h3>
            <div id="activeTasks"></div>
        </div>
    </div>

    <div class="notes-container">
        <div id="notes"></div>
    </div>

    <div class="links-section">
        <h3>Archived Links</h3>
        <div id="links"></div>
    </div>

    <script>{script}</script>
</body>
</html>"#,
        style = STYLE,
        script = SCRIPT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_page_wires_containers_and_script() {
        let page = index_page();
        assert!(page.contains(r#"id="notes""#));
        assert!(page.contains(r#"id="activeTasks""#));
        assert!(page.contains(r#"id="links""#));
        assert!(page.contains("loadNotes()"));
        assert!(page.contains("/api/update-checkbox"));
    }
}
