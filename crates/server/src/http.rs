//! HTTP Endpoints
//!
//! REST API for the audio-export pipeline. Validation and not-found errors
//! return immediately and cheaply; a synthesis failure can only surface
//! after a long-running job, and because the full buffer is assembled in
//! memory before the response starts, an error body can always be sent.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Json, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use readtome_core::{ChapterTooLong, ProviderChoice, TtsConfig, ValidationError};
use readtome_providers::edge::list_en_us_voices;

use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Audio export
        .route("/api/books/:book_id/tts-download", post(download_audio))
        .route("/api/tts/voices", get(get_voices))
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.server.cors_origins))
        .with_state(state)
}

/// CORS from the configured origin list; an empty list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Audio export request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TtsDownloadRequest {
    start_chapter_number: Option<i64>,
    chapter_count: Option<i64>,
    voice: Option<String>,
    rate: Option<f64>,
    pitch: Option<String>,
    volume: Option<u8>,
    #[serde(default)]
    provider: ProviderChoice,
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Render a request validation failure as its structured 400 body.
fn validation_response(err: ValidationError) -> Response {
    let body = match &err {
        ValidationError::ChaptersTooLong {
            max_characters,
            chapters,
        } => serde_json::json!({
            "error": err.to_string(),
            "maxCharacters": max_characters,
            "chapters": chapters,
        }),
        _ => serde_json::json!({ "error": err.to_string() }),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Strip everything outside `[A-Za-z0-9_\- ]` from a book title.
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
        .collect::<String>()
        .trim()
        .to_string()
}

/// POST /api/books/:book_id/tts-download
///
/// Synthesizes the requested chapter range and sends the stitched MP3 as a
/// file download.
async fn download_audio(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    payload: Result<Json<TtsDownloadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return error_json(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    let (Some(start), Some(count)) = (request.start_chapter_number, request.chapter_count) else {
        return validation_response(ValidationError::MissingRange);
    };
    if start < 1 {
        return validation_response(ValidationError::BadStartChapter);
    }
    if count < 1 {
        return validation_response(ValidationError::BadChapterCount);
    }

    // Chapter numbers are u32; a start past that range cannot match any
    // chapter, and an end past it means "through the last chapter".
    let Ok(start_num) = u32::try_from(start) else {
        return error_json(
            StatusCode::NOT_FOUND,
            "No chapters found in the specified range",
        );
    };
    let end_num = u32::try_from(count - 1)
        .ok()
        .and_then(|span| start_num.checked_add(span))
        .unwrap_or(u32::MAX);

    let book = match state.store.find_book_by_id(&book_id).await {
        Ok(Some(book)) => book,
        Ok(None) => return error_json(StatusCode::NOT_FOUND, "Book not found"),
        Err(e) => {
            tracing::error!("book lookup failed: {e}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Storage error");
        }
    };

    let chapters = match state
        .store
        .find_chapters_by_range(&book_id, start_num, end_num)
        .await
    {
        Ok(chapters) => chapters,
        Err(e) => {
            tracing::error!("chapter fetch failed: {e}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Storage error");
        }
    };
    if chapters.is_empty() {
        return error_json(
            StatusCode::NOT_FOUND,
            "No chapters found in the specified range",
        );
    }

    // Per-chapter length ceiling, counted in characters rather than UTF-8
    // bytes; rejected before any provider call.
    let max_chars = state.config.tts.max_chapter_chars;
    let too_long: Vec<ChapterTooLong> = chapters
        .iter()
        .filter_map(|c| {
            let characters = c.content.chars().count();
            (characters > max_chars).then(|| ChapterTooLong {
                chapter_number: c.chapter_number,
                title: c.display_title(),
                characters,
            })
        })
        .collect();
    if !too_long.is_empty() {
        return validation_response(ValidationError::ChaptersTooLong {
            max_characters: max_chars,
            chapters: too_long,
        });
    }

    let default_voice = match request.provider {
        ProviderChoice::Edge => &state.config.tts.default_edge_voice,
        ProviderChoice::Sapi => &state.config.tts.default_sapi_voice,
    };
    let mut tts_config = TtsConfig::new(request.voice.unwrap_or_else(|| default_voice.clone()));
    tts_config.rate = request.rate;
    tts_config.pitch = request.pitch;
    tts_config.volume = request.volume;

    let texts: Vec<String> = chapters.iter().map(|c| c.content.clone()).collect();

    tracing::info!(
        book = %book.title,
        chapters = chapters.len(),
        provider = ?request.provider,
        "starting audio export"
    );

    let buffer = match state
        .synthesizer
        .synthesize_book(&texts, &tts_config, request.provider)
        .await
    {
        Ok(buffer) => buffer,
        Err(e) => {
            tracing::error!("synthesis failed: {e}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Audio synthesis failed");
        }
    };

    let safe_title = sanitize_title(&book.title);
    let range_label = if start_num == end_num {
        format!("Ch{start_num}")
    } else {
        format!("Ch{}-{}", start_num, start_num + chapters.len() as u32 - 1)
    };
    let filename = format!("{safe_title}_{range_label}.mp3");

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        buffer,
    )
        .into_response()
}

/// GET /api/tts/voices, the en-US subset of the neural provider catalog
async fn get_voices() -> Response {
    match list_en_us_voices().await {
        Ok(voices) => Json(voices).into_response(),
        Err(e) => {
            tracing::error!("voice list fetch failed: {e}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch voices")
        }
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ready" }))
}
