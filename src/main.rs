//! Noteflow server entry point: free-port discovery, router wiring, and a
//! best-effort browser launch.

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::process::Command;
use std::sync::Arc;
use tower_http::services::ServeDir;

use noteflow::{handlers, AppState, ASSETS_DIR, NOTES_FILE};

/// Probe ascending ports until one binds. The probe listener is dropped
/// before the real bind, so a race is possible but harmless for a local tool.
fn find_free_port(start: u16) -> Option<u16> {
    (start..u16::MAX).find(|port| std::net::TcpListener::bind(("127.0.0.1", *port)).is_ok())
}

fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let result = Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let result = Command::new("cmd").args(["/C", "start", url]).spawn();
    #[cfg(all(unix, not(target_os = "macos")))]
    let result = Command::new("xdg-open").arg(url).spawn();

    if let Err(e) = result {
        eprintln!("Could not open browser: {}", e);
    }
}

#[tokio::main]
async fn main() {
    let start_port = std::env::var("NOTEFLOW_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let port = find_free_port(start_port).expect("No free ports found");

    let state = Arc::new(AppState::new(port));

    let app = Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/api/note/{index}",
            get(handlers::get_note)
                .post(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/api/update-checkbox", patch(handlers::update_checkbox))
        .route("/api/links", get(handlers::archived_links))
        .route("/api/archive", post(handlers::archive_now))
        .route("/api/upload-image", post(handlers::upload_image))
        .nest_service("/assets", ServeDir::new(ASSETS_DIR))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("Failed to bind port");

    let address = format!("http://127.0.0.1:{}", port);
    println!("Noteflow running at {}", address);
    println!("Note log: {}", NOTES_FILE);

    open_browser(&address);

    axum::serve(listener, app).await.expect("Server error");
}
