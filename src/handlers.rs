//! HTTP route handlers.
//!
//! Thin plumbing over the store and archiver: handlers deserialize the
//! request, call one store operation, and map `StoreError` onto a status
//! code. All the interesting logic lives in `store`, `render`, `checkbox`,
//! and `archive`.

use crate::models::{
    ArchiveLinkRequest, ArchiveRecord, CreateNoteRequest, NoteRecord, ToggleCheckboxRequest,
    UpdateNoteRequest,
};
use crate::store::StoreError;
use crate::{archive, templates, AppState, IMAGES_DIR};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;

fn store_status(e: StoreError) -> StatusCode {
    match e {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Index Page
// ============================================================================

pub async fn index() -> Html<String> {
    Html(templates::index_page())
}

// ============================================================================
// Note Routes
// ============================================================================

pub async fn list_notes(State(state): State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    state
        .store
        .render_all()
        .map(Html)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<Json<Value>, StatusCode> {
    if request.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .store
        .create(request.title, request.content.trim())
        .await
        .map_err(store_status)?;

    Ok(Json(json!({"status": "success"})))
}

pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<NoteRecord>, StatusCode> {
    state.store.get_raw(index).map(Json).map_err(store_status)
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(request): Json<UpdateNoteRequest>,
) -> Result<Json<Value>, StatusCode> {
    if request.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .store
        .update(index, request.title, request.content.trim())
        .await
        .map_err(store_status)?;

    Ok(Json(json!({"status": "success"})))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<Value>, StatusCode> {
    state.store.delete(index).map_err(store_status)?;
    Ok(Json(json!({"status": "success"})))
}

// ============================================================================
// Checkbox Toggle
// ============================================================================

pub async fn update_checkbox(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ToggleCheckboxRequest>,
) -> Result<Json<Value>, StatusCode> {
    // Out-of-range indices are absorbed: the client's index may be stale.
    state
        .store
        .toggle_checkbox(request.checkbox_index, request.checked)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(json!({"status": "success"})))
}

// ============================================================================
// Archive Routes
// ============================================================================

pub async fn archived_links(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(archive::list_archived_links(
        &state.store.archive_config().sites_dir,
    ))
}

pub async fn archive_now(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ArchiveLinkRequest>,
) -> Result<Json<ArchiveRecord>, StatusCode> {
    archive::archive_page(&request.url, state.store.archive_config())
        .await
        .map(Json)
        .ok_or(StatusCode::BAD_GATEWAY)
}

// ============================================================================
// Image Upload
// ============================================================================

fn sanitize_upload_name(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

pub async fn upload_image(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }

        let name = sanitize_upload_name(field.file_name().unwrap_or("upload.bin"));
        let data = field
            .bytes()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        fs::create_dir_all(IMAGES_DIR).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let path = std::path::Path::new(IMAGES_DIR).join(&name);
        fs::write(&path, &data).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        return Ok(Json(json!({"filePath": format!("/assets/images/{}", name)})));
    }

    Err(StatusCode::BAD_REQUEST)
}

// ============================================================================
// Tests
// ============================================================================
