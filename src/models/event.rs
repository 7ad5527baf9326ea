use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::destination::GeoPoint;

/// Navigation activity fanned out to observing clients over the event
/// stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationEvent {
    Started {
        destination_id: String,
        destination_name: String,
        started_at: DateTime<Utc>,
    },
    PositionUpdated {
        position: GeoPoint,
        distance_m: f64,
    },
    Arrived {
        destination_name: String,
    },
    Cancelled {
        destination_name: String,
    },
}
