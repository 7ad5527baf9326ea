use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::geo;
use crate::models::destination::Destination;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/destinations", get(list_destinations))
}

#[derive(Deserialize)]
pub struct ListQuery {
    /// Driver position as "lat,lng"; when present each destination is
    /// annotated with its distance from here.
    pub from: Option<String>,
}

#[derive(Serialize)]
pub struct DestinationView {
    #[serde(flatten)]
    pub destination: Destination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

async fn list_destinations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DestinationView>>, AppError> {
    let from = match &query.from {
        Some(raw) => Some(geo::parse_coordinates(raw)?),
        None => None,
    };

    let destinations = state
        .destinations
        .iter()
        .map(|destination| DestinationView {
            distance_m: from
                .as_ref()
                .map(|origin| geo::haversine_m(origin, &destination.coordinates)),
            destination: destination.clone(),
        })
        .collect();

    Ok(Json(destinations))
}
