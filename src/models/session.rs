use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::destination::{Destination, GeoPoint};

/// In-memory session owned by the lifecycle machine. `destination` and
/// `started_at` are both present exactly when `active` is true;
/// `driver_position` is the last known location in any state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSession {
    pub active: bool,
    pub destination: Option<Destination>,
    pub driver_position: Option<GeoPoint>,
    pub started_at: Option<DateTime<Utc>>,
}

impl NavigationSession {
    pub fn empty() -> Self {
        Self {
            active: false,
            destination: None,
            driver_position: None,
            started_at: None,
        }
    }

    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            is_navigation_active: self.active,
            destination_id: self.destination.as_ref().map(|d| d.id.clone()),
            destination_name: self.destination.as_ref().map(|d| d.name.clone()),
            destination_coordinates: self.destination.as_ref().map(|d| d.coordinates),
            start_time: self.started_at.map(|t| t.timestamp_millis()),
            driver_coordinates: self.driver_position,
        }
    }
}

/// Durable mirror of the session, stored under the reserved key
/// `driver_navigation_state`. The wire shape is shared with the mobile
/// clients and must not drift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub is_navigation_active: bool,
    pub destination_id: Option<String>,
    pub destination_name: Option<String>,
    pub destination_coordinates: Option<GeoPoint>,
    pub start_time: Option<i64>,
    pub driver_coordinates: Option<GeoPoint>,
}

impl PersistedSession {
    /// Recovers the stored start time; out-of-range millisecond values are
    /// treated as absent.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}
