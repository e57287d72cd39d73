use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::events::EventTag;
use crate::guest::{normalize_email, GuestMatch};
use crate::source::{GuestSource, GuestSourceError};

const INDEX_HTML: &str = include_str!("../static/index.html");

// State shared across handlers
pub struct ApiState {
    pub source: Arc<dyn GuestSource>,
    pub refresh_on_index: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckGuestRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Lookup result. Fields other than `found` are only emitted on a hit, and
/// `name`/`rsvp_status` only when the source carries guest details.
#[derive(Debug, Serialize, PartialEq)]
pub struct CheckGuestResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventTag>>,
    // Outer None omits the field, Some(None) serializes as null
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsvp_status: Option<Option<String>>,
}

impl CheckGuestResponse {
    pub fn not_found() -> Self {
        Self {
            found: false,
            name: None,
            events: None,
            rsvp_status: None,
        }
    }
}

impl From<Option<GuestMatch>> for CheckGuestResponse {
    fn from(found: Option<GuestMatch>) -> Self {
        match found {
            None => Self::not_found(),
            Some(GuestMatch { events, details }) => {
                let (name, rsvp_status) = match details {
                    Some(details) => (Some(details.first_name), Some(details.rsvp_status)),
                    None => (None, None),
                };
                Self {
                    found: true,
                    name,
                    events: Some(events),
                    rsvp_status,
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unable to access guest list")]
    GuestList(#[from] GuestSourceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::GuestList(e) => {
                error!("Guest list error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

async fn index_handler(State(state): State<Arc<ApiState>>) -> Html<&'static str> {
    if state.refresh_on_index {
        // The page renders either way; the source logs the failure and
        // lookups report it
        let _ = state.source.refresh().await;
    }
    Html(INDEX_HTML)
}

async fn check_guest_handler(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CheckGuestRequest>, JsonRejection>,
) -> Result<Json<CheckGuestResponse>, ApiError> {
    // Unreadable bodies count as an empty email rather than a client error
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Ignoring unreadable check-guest body: {}", rejection);
            CheckGuestRequest::default()
        }
    };

    let email = normalize_email(request.email.as_deref().unwrap_or_default());
    if email.is_empty() {
        return Ok(Json(CheckGuestResponse::not_found()));
    }

    let found = state.source.lookup(&email).await?;
    Ok(Json(CheckGuestResponse::from(found)))
}

async fn reload_handler(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    state.source.refresh().await?;
    info!("Guest list reloaded ({})", state.source.kind());
    Ok(Json(ReloadResponse {
        reloaded: true,
        source: state.source.kind().to_string(),
    }))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Build the application router
pub fn create_router(state: Arc<ApiState>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_check))
        .route("/api/check-guest", post(check_guest_handler))
        .route("/api/reload-guests", post(reload_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

// Create and start the API server
pub async fn start_api_server(config: Config, source: Arc<dyn GuestSource>) -> Result<()> {
    let state = Arc::new(ApiState {
        source,
        refresh_on_index: config.server.refresh_on_index,
    });
    let app = create_router(state, &config.server.static_dir);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    info!("Guest list server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server terminated with an error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
