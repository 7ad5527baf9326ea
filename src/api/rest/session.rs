use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::engine::queue::enqueue_position;
use crate::error::AppError;
use crate::geo;
use crate::launcher::{external_nav_url, Platform};
use crate::models::destination::GeoPoint;
use crate::models::event::NavigationEvent;
use crate::models::session::NavigationSession;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/session",
            get(get_session).post(begin_session).delete(cancel_session),
        )
        .route("/session/position", patch(update_position))
        .route("/session/handoff", get(handoff))
}

#[derive(Deserialize)]
pub struct BeginRequest {
    pub destination_id: String,
    pub driver_position: GeoPoint,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    /// The client must have asked the driver before sending this; an
    /// unconfirmed cancellation is rejected.
    pub confirmed: bool,
}

#[derive(Deserialize)]
pub struct PositionRequest {
    pub position: GeoPoint,
}

#[derive(Deserialize)]
pub struct HandoffQuery {
    pub platform: String,
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<NavigationSession> {
    Json(state.lifecycle.lock().await.session().clone())
}

async fn begin_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BeginRequest>,
) -> Result<Json<NavigationSession>, AppError> {
    let destination = state
        .destinations
        .iter()
        .find(|candidate| candidate.id == payload.destination_id)
        .cloned()
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "destination {} not found",
                payload.destination_id
            ))
        })?;

    let mut lifecycle = state.lifecycle.lock().await;
    lifecycle.begin(destination.clone(), payload.driver_position)?;

    state
        .metrics
        .sessions_total
        .with_label_values(&["started"])
        .inc();

    let session = lifecycle.session().clone();
    if let Some(started_at) = session.started_at {
        let _ = state.events_tx.send(NavigationEvent::Started {
            destination_id: destination.id,
            destination_name: destination.name,
            started_at,
        });
    }

    Ok(Json(session))
}

async fn cancel_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<NavigationSession>, AppError> {
    if !payload.confirmed {
        return Err(AppError::BadRequest(
            "cancellation requires confirmation".to_string(),
        ));
    }

    let mut lifecycle = state.lifecycle.lock().await;
    if let Some(closed) = lifecycle.cancel()? {
        state
            .metrics
            .sessions_total
            .with_label_values(&["cancelled"])
            .inc();
        let duration = (Utc::now() - closed.started_at).num_milliseconds() as f64 / 1000.0;
        state.metrics.session_duration_seconds.observe(duration);

        let _ = state.events_tx.send(NavigationEvent::Cancelled {
            destination_name: closed.destination.name,
        });
    }

    Ok(Json(lifecycle.session().clone()))
}

async fn update_position(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PositionRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    // Reject malformed positions at the edge; the machine validates again
    // when the update is applied.
    if !geo::is_valid(&payload.position) {
        return Err(AppError::InvalidLocation(format!(
            "position {},{} is out of range; latitude must be within [-90, 90] and longitude within [-180, 180]",
            payload.position.lat, payload.position.lng
        )));
    }

    enqueue_position(&state, payload.position).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": true }))))
}

async fn handoff(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HandoffQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let platform: Platform = query.platform.parse()?;

    let lifecycle = state.lifecycle.lock().await;
    let session = lifecycle.session();
    let destination = session
        .destination
        .as_ref()
        .ok_or_else(|| AppError::NotFound("no active navigation session".to_string()))?;
    let origin = session
        .driver_position
        .as_ref()
        .ok_or_else(|| AppError::NotFound("driver position unknown".to_string()))?;

    let url = external_nav_url(platform, origin, &destination.coordinates);
    Ok(Json(json!({ "url": url })))
}
