use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rotation::{RotationContext, RotationError, RotationService};
use shared::{
    domain::{PathDescriptor, WidgetId},
    error::{ApiError, ErrorCode},
    protocol::{Outcome, OutcomeResponse, PassReport, PlaybackUpdate, PropertySnapshot},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod host;

use app_state::AppState;
use config::{load_config, prepare_database_url};
use host::{FileSettings, PlaybackFlag, PropertyBoard};

const MAX_BODY_BYTES: usize = 64 * 1024;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config();
    let database_url = prepare_database_url(&config.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let settings = Arc::new(FileSettings::open(&config.settings_path)?);
    let board = Arc::new(PropertyBoard::default());
    let playback = Arc::new(PlaybackFlag::default());

    let ctx = RotationContext::new(Arc::new(storage.clone()), board.clone(), playback.clone());
    let service = RotationService::new(ctx, settings);
    let report = service.on_start().await?;
    info!(status = ?report.status, rotated = report.rotated.len(), "startup pass finished");

    let state = AppState {
        service: service.clone(),
        storage,
        board,
        playback,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = config.bind_addr.parse()?;
    info!(%addr, "widget service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await;
    info!("widget service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/widgets/:widget_id/next", post(next_widget_path))
        .route("/widgets/:widget_id/back", post(back_widget_path))
        .route("/widgets/:widget_id/reset", post(reset_widget_path))
        .route("/refresh", post(force_refresh))
        .route("/settings/reload", post(reload_settings))
        .route("/properties", get(properties))
        .route("/playback", put(set_playback))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn internal_error(error: impl std::fmt::Display) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(ErrorCode::Internal, error.to_string())),
    )
}

fn rotation_error(error: RotationError) -> (StatusCode, Json<ApiError>) {
    let code = match error {
        RotationError::Store(_) => ErrorCode::StoreFailure,
        RotationError::AlreadyStarted | RotationError::Stopped => ErrorCode::Internal,
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(code, error.to_string())),
    )
}

fn outcome_response(
    widget_id: WidgetId,
    result: Result<Outcome, RotationError>,
) -> ApiResult<Json<OutcomeResponse>> {
    let outcome = result.map_err(rotation_error)?;
    Ok(Json(OutcomeResponse { widget_id, outcome }))
}

async fn health(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    state
        .storage
        .health_check()
        .await
        .map_err(|error| internal_error(format!("{error:#}")))?;
    Ok("ok")
}

async fn next_widget_path(
    State(state): State<Arc<AppState>>,
    Path(widget_id): Path<String>,
    Json(path): Json<PathDescriptor>,
) -> ApiResult<Json<OutcomeResponse>> {
    let widget_id = WidgetId::new(widget_id);
    let result = state.service.next(&widget_id, path).await;
    outcome_response(widget_id, result)
}

async fn back_widget_path(
    State(state): State<Arc<AppState>>,
    Path(widget_id): Path<String>,
) -> ApiResult<Json<OutcomeResponse>> {
    let widget_id = WidgetId::new(widget_id);
    let result = state.service.back(&widget_id).await;
    outcome_response(widget_id, result)
}

async fn reset_widget_path(
    State(state): State<Arc<AppState>>,
    Path(widget_id): Path<String>,
) -> ApiResult<Json<OutcomeResponse>> {
    let widget_id = WidgetId::new(widget_id);
    let result = state.service.reset(&widget_id).await;
    outcome_response(widget_id, result)
}

async fn force_refresh(State(state): State<Arc<AppState>>) -> ApiResult<Json<PassReport>> {
    let report = state
        .service
        .force_refresh_all()
        .await
        .map_err(rotation_error)?;
    Ok(Json(report))
}

/// Settings are re-read from disk, so the reload runs off the async workers.
async fn reload_settings(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || service.on_settings_changed())
        .await
        .map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn properties(State(state): State<Arc<AppState>>) -> Json<PropertySnapshot> {
    Json(state.board.snapshot())
}

async fn set_playback(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PlaybackUpdate>,
) -> StatusCode {
    state.playback.set(update.playing_video);
    StatusCode::NO_CONTENT
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
