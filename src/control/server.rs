use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use axum::routing::{get, patch, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{ActiveLocation, ControlApi, ErrorBody, RefreshReply};
use crate::coordinator::{BadgeState, RefreshMessage};
use crate::models::{Location, LocationPatch, Settings};
use crate::view::{PopupView, ViewState};
use crate::{Result, WeatherError};

type Control = Arc<dyn ControlApi>;
type Reply<T> = std::result::Result<Json<T>, WeatherError>;

pub fn router(control: Control) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/locations",
            get(list_locations).post(add_location).put(save_locations),
        )
        .route(
            "/api/locations/{id}",
            patch(update_location).delete(delete_location),
        )
        .route("/api/settings", get(get_settings).put(save_settings))
        .route("/api/active", get(get_active).put(set_active))
        .route("/api/popup", post(popup))
        .route("/api/badge", get(badge))
        .route("/api/refresh", post(refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(control)
}

/// Serve `control` on `listener` until `cancel` fires
pub async fn serve(
    listener: TcpListener,
    control: Control,
    cancel: CancellationToken,
) -> Result<()> {
    let address = listener.local_addr()?;
    info!(%address, "Control API listening");
    axum::serve(listener, router(control))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    info!("Control API stopped");
    Ok(())
}

impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        let status = match &self {
            WeatherError::NotFound { .. } => StatusCode::NOT_FOUND,
            WeatherError::Upstream { .. } | WeatherError::Network { .. } => {
                StatusCode::BAD_GATEWAY
            }
            WeatherError::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            WeatherError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            WeatherError::Config { .. } => StatusCode::BAD_REQUEST,
            WeatherError::Storage { .. } | WeatherError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let location_id = match &self {
            WeatherError::NotFound { location_id } => Some(location_id.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            location_id,
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "better-weather",
        "version": crate::VERSION,
    }))
}

async fn list_locations(State(control): State<Control>) -> Reply<Vec<Location>> {
    Ok(Json(control.locations().await?))
}

async fn add_location(
    State(control): State<Control>,
    Json(location): Json<Location>,
) -> Reply<Vec<Location>> {
    info!(location_id = %location.id, "Add location requested");
    Ok(Json(control.add_location(location).await?))
}

async fn save_locations(
    State(control): State<Control>,
    Json(locations): Json<Vec<Location>>,
) -> Reply<Vec<Location>> {
    Ok(Json(control.save_locations(locations).await?))
}

async fn update_location(
    State(control): State<Control>,
    Path(id): Path<String>,
    Json(changes): Json<LocationPatch>,
) -> Reply<Vec<Location>> {
    Ok(Json(control.update_location(&id, &changes).await?))
}

async fn delete_location(
    State(control): State<Control>,
    Path(id): Path<String>,
) -> Reply<Vec<Location>> {
    info!(location_id = %id, "Delete location requested");
    Ok(Json(control.delete_location(&id).await?))
}

async fn get_settings(State(control): State<Control>) -> Reply<Settings> {
    Ok(Json(control.settings().await?))
}

async fn save_settings(
    State(control): State<Control>,
    Json(settings): Json<Settings>,
) -> Reply<Settings> {
    Ok(Json(control.save_settings(settings).await?))
}

async fn get_active(State(control): State<Control>) -> Reply<ActiveLocation> {
    let location_id = control.active_location_id().await?;
    Ok(Json(ActiveLocation { location_id }))
}

async fn set_active(
    State(control): State<Control>,
    Json(active): Json<ActiveLocation>,
) -> Reply<ActiveLocation> {
    control
        .set_active_location_id(active.location_id.clone())
        .await?;
    Ok(Json(active))
}

async fn popup(State(control): State<Control>, Json(view): Json<ViewState>) -> Reply<PopupView> {
    Ok(Json(control.popup(view).await?))
}

async fn badge(State(control): State<Control>) -> Reply<BadgeState> {
    Ok(Json(control.badge().await?))
}

async fn refresh(
    State(control): State<Control>,
    Json(message): Json<RefreshMessage>,
) -> Reply<RefreshReply> {
    Ok(Json(control.refresh(message).await?))
}
