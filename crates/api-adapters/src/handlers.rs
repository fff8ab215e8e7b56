//! # Handlers
//!
//! This module coordinates the flow between HTTP requests, the
//! `BoardService` and the renderer.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use chrono::Utc;
use domains::{AppError, ThreadId, Upload};
use mime::Mime;
use serde::Deserialize;
use storage_adapters::signing::decode_path_key;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewThreadForm {
    /// Missing and empty are treated alike and rejected by the service.
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SignedMediaQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET `/`
pub async fn list_threads(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let threads = state.board.list_threads().await?;
    Ok(Html(state.renderer.thread_list(&threads)?))
}

/// POST `/threads`
pub async fn create_thread(
    State(state): State<AppState>,
    Form(form): Form<NewThreadForm>,
) -> Result<Redirect, ApiError> {
    let thread = state.board.create_thread(&form.title).await?;
    state.metrics.threads_created.inc();
    Ok(Redirect::to(&format!("/threads/{}", thread.id)))
}

/// GET `/threads/{id}`
pub async fn view_thread(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.board.view_thread(ThreadId(id)).await {
        Ok(page) => {
            let html = state.renderer.thread_page(&page.thread, &page.posts)?;
            Ok(Html(html).into_response())
        }
        Err(AppError::NotFound(..)) => {
            let html = state.renderer.not_found("Thread not found")?;
            Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// POST `/threads/{id}/posts`
///
/// Multipart fields: `content` (text) and an optional `image` file. Browsers
/// send an empty `image` part when no file was picked; that counts as no
/// image. Responds with the fragment for the new post only.
pub async fn create_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Html<String>, ApiError> {
    let mut content = String::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => content = field.text().await?,
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().and_then(|ct| ct.parse::<Mime>().ok());
                let bytes = field.bytes().await?;
                if !filename.is_empty() && !bytes.is_empty() {
                    image = Some(Upload::new(filename, content_type, bytes));
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    let has_image = image.is_some();
    let post = state.board.create_post(ThreadId(id), &content, image).await?;

    state.metrics.posts_created.inc();
    if has_image {
        state.metrics.attachments_stored.inc();
    }

    Ok(Html(state.renderer.post_fragment(&post)?))
}

/// GET `/media/{key}?expires=..&signature=..`
///
/// Serves blobs for the stores that have no URL of their own. The
/// signature stands in for the board credentials, so this route sits
/// outside the auth gate.
pub async fn serve_media(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(query): Query<SignedMediaQuery>,
) -> Result<Response, ApiError> {
    let Some(media) = &state.media else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let Some(key) = decode_path_key(&segment) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let now = Utc::now();
    if let Err(err) = media.signer.verify(&key, query.expires, &query.signature, now) {
        tracing::debug!(%key, error = %err, "refused media request");
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let Some(bytes) = media.store.fetch(&key).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let content_type = mime_guess::from_path(key.as_str()).first_or_octet_stream();
    // Caches must not outlive the URL.
    let max_age = (query.expires - now.timestamp()).max(0);
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, format!("private, max-age={max_age}")),
        ],
        bytes,
    )
        .into_response())
}

/// GET `/metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| AppError::Internal(format!("metrics encoding failed: {e}")))?;
    Ok((
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    )
        .into_response())
}

/// GET `/health`
pub async fn health() -> &'static str {
    "ok"
}
