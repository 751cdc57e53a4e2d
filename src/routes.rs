use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use parking_lot::RwLock;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    batch, encoder,
    error::ClassifiedError,
    gemini::ImageGenerator,
    models::{download_filename, AssetRole, Session, SessionView, StyleRequest, SLOT_COUNT},
    prompt::parse_accent,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, Session>>>,
    pub generator: Arc<dyn ImageGenerator>,
}

fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

fn unprocessable(message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": "invalid_input", "message": message })),
    )
        .into_response()
}

pub async fn create_session(State(state): State<AppState>) -> Json<SessionView> {
    let session = Session::new();
    let view = session.view();
    tracing::info!("🚀 Created session {}", session.id);
    state.store.write().insert(session.id, session);
    Json(view)
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    match state.store.read().get(&id) {
        Some(session) => Json(session.view()).into_response(),
        None => not_found(),
    }
}

/// Applies a full style selection. Base is applied first so the accent
/// exclusivity rule always runs against the new base; an absent accent field
/// clears the accent.
pub async fn set_style(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<StyleRequest>,
) -> Response {
    let mut guard = state.store.write();
    let Some(session) = guard.get_mut(&id) else { return not_found() };
    if let Some(base) = body.base_style {
        session.set_base_style(base);
    }
    session.set_accent_style(parse_accent(body.accent_style.as_deref()));
    tracing::info!(
        "🎨 Session {} styles: base={}, accent={:?}",
        id,
        session.base_style,
        session.accent_style.map(|s| s.label())
    );
    Json(session.view()).into_response()
}

/// Multipart upload of one source image. Replacing an image restarts the
/// workflow, so prior results are dropped.
pub async fn upload_image(
    Path((id, role)): Path<(Uuid, String)>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let Some(role) = AssetRole::parse(&role) else {
        return unprocessable("Image role must be 'person' or 'outfit'.");
    };
    if !state.store.read().contains_key(&id) {
        return not_found();
    }

    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return unprocessable("Attach the image as a multipart field."),
        Err(e) => {
            tracing::error!("❌ Malformed upload: {}", e);
            return ClassifiedError::Read.into_response();
        }
    };
    let asset = match encoder::encode(field).await {
        Ok(asset) => asset,
        Err(err) => return err.into_response(),
    };

    let mut guard = state.store.write();
    let Some(session) = guard.get_mut(&id) else { return not_found() };
    session.set_asset(role, asset);
    Json(session.view()).into_response()
}

/// Runs the full ten-slot batch for a session. Slots land in the store as
/// they complete, so polling GET /api/session/:id observes progress climbing
/// 0.1, 0.2, ... 1.0. On failure the completed slots stay visible and the
/// classified error is stored and returned.
pub async fn generate(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    let (person, outfit, base, accent) = {
        let mut guard = state.store.write();
        let Some(session) = guard.get_mut(&id) else { return not_found() };
        let (Some(person), Some(outfit)) = (session.person.clone(), session.outfit.clone()) else {
            return unprocessable("Upload both a person photo and an outfit photo before generating.");
        };
        session.reset_results();
        (person, outfit, session.base_style, session.accent_style)
    };

    tracing::info!("🚀 Starting batch for session {} (base={})", id, base);
    let outcome = batch::run_batch(
        state.generator.as_ref(),
        &person,
        &outfit,
        base,
        accent,
        |index, image, fraction| {
            let mut guard = state.store.write();
            if let Some(session) = guard.get_mut(&id) {
                session.record_slot(index, image, fraction);
            }
        },
    )
    .await;

    match outcome {
        Ok(()) => match state.store.read().get(&id) {
            Some(session) => Json(session.view()).into_response(),
            None => not_found(),
        },
        Err(err) => {
            if let Some(session) = state.store.write().get_mut(&id) {
                session.set_error(err.clone());
            }
            err.into_response()
        }
    }
}

/// Regenerates exactly one slot. The front-end serializes redo requests (one
/// in flight at a time); this side just does the call and the slot swap. A
/// failed redo leaves the previous image in place.
pub async fn redo_slot(
    Path((id, index)): Path<(Uuid, usize)>,
    State(state): State<AppState>,
) -> Response {
    if index >= SLOT_COUNT {
        return unprocessable("Slot index is out of range.");
    }
    let (person, outfit, base, accent) = {
        let guard = state.store.read();
        let Some(session) = guard.get(&id) else { return not_found() };
        let (Some(person), Some(outfit)) = (session.person.clone(), session.outfit.clone()) else {
            return unprocessable("Upload both a person photo and an outfit photo before redoing a slot.");
        };
        (person, outfit, session.base_style, session.accent_style)
    };

    match batch::redo(state.generator.as_ref(), &person, &outfit, base, accent, index).await {
        Ok(image) => {
            let uri = image.data_uri();
            let mut guard = state.store.write();
            let Some(session) = guard.get_mut(&id) else { return not_found() };
            session.replace_slot(index, image);
            Json(json!({ "index": index, "image": uri })).into_response()
        }
        Err(err) => {
            if let Some(session) = state.store.write().get_mut(&id) {
                session.set_error(err.clone());
            }
            err.into_response()
        }
    }
}

/// Serves one generated slot as a file attachment, named
/// `ai-style-<base>[-accent-<accent>]-<n>.png`.
pub async fn download_slot(
    Path((id, index)): Path<(Uuid, usize)>,
    State(state): State<AppState>,
) -> Response {
    let (image, base, accent) = {
        let guard = state.store.read();
        let Some(session) = guard.get(&id) else { return not_found() };
        let Some(image) = session.slots.get(index).and_then(|s| s.clone()) else {
            return not_found();
        };
        (image, session.base_style, session.accent_style)
    };

    let bytes = match base64::engine::general_purpose::STANDARD.decode(&image.data) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("❌ Stored slot {} is not valid base64: {}", index, e);
            return ClassifiedError::Unknown.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = image.mime_type.parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) =
        format!("attachment; filename=\"{}\"", download_filename(base, accent, index)).parse()
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    (StatusCode::OK, headers, bytes).into_response()
}
