//! HTTP boundary: multipart intake, health check and the upload page

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::warn;
use serde::Serialize;

use crate::assets::ImagePayload;
use crate::request::{CardDefaults, CardForm, RenderRequest};
use crate::response::RenderedCard;
use crate::{CardRenderer, Error, Result, ServiceConfig};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub renderer: CardRenderer,
    pub defaults: Arc<CardDefaults>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &ServiceConfig, renderer: CardRenderer) -> Self {
        Self {
            renderer,
            defaults: Arc::new(config.defaults.clone()),
            static_dir: config.static_dir.clone(),
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/favicon.ico", get(favicon))
        .route("/api/render-card", post(render_card))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = match self {
            Error::MissingInput(message) => message,
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl IntoResponse for RenderedCard {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.media_type)], Body::from(self.bytes)).into_response()
    }
}

async fn index(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.static_dir.join("index.html")).await {
        Ok(page) => Html(page).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "index.html not found").into_response(),
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn render_card(State(state): State<AppState>, multipart: Multipart) -> Result<RenderedCard> {
    let upload = read_card_upload(multipart).await?;
    let request = RenderRequest::from_form(&upload.form, &state.defaults, upload.background, upload.subject)?;
    state.renderer.render(request).await
}

/// Text fields and the two image uploads of a card submission.
struct CardUpload {
    form: CardForm,
    background: Option<ImagePayload>,
    subject: Option<ImagePayload>,
}

async fn read_card_upload(mut multipart: Multipart) -> Result<CardUpload> {
    let mut upload = CardUpload {
        form: CardForm::new(),
        background: None,
        subject: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!("failed to read multipart payload: {} (status {})", err, err.status());
                return Err(Error::InvalidInput(format!("malformed multipart body: {}", err.body_text())));
            }
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "bgFile" | "mainFile" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("failed to read {}: {}", name, e.body_text())))?;
                let payload = ImagePayload::new(content_type.as_deref(), bytes.to_vec());
                if name == "bgFile" {
                    upload.background = payload;
                } else {
                    upload.subject = payload;
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("failed to read {}: {}", name, e.body_text())))?;
                upload.form.insert(name, value);
            }
        }
    }

    Ok(upload)
}
