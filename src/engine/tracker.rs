use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::lifecycle::PositionOutcome;
use crate::models::destination::GeoPoint;
use crate::models::event::NavigationEvent;
use crate::state::AppState;

/// Drains the position queue one update at a time, so the lifecycle machine
/// only ever sees one mutation in flight.
pub async fn run_tracking_engine(state: Arc<AppState>, mut position_rx: mpsc::Receiver<GeoPoint>) {
    info!("tracking engine started");

    while let Some(position) = position_rx.recv().await {
        state.metrics.positions_in_queue.dec();

        let outcome = state.lifecycle.lock().await.update_position(position);
        match outcome {
            Ok(PositionOutcome::Recorded) => {
                debug!(lat = position.lat, lng = position.lng, "position recorded");
            }
            Ok(PositionOutcome::EnRoute { distance_m }) => {
                state.metrics.distance_to_destination_meters.set(distance_m);
                let _ = state.events_tx.send(NavigationEvent::PositionUpdated {
                    position,
                    distance_m,
                });
                debug!(distance_m, "en route");
            }
            Ok(PositionOutcome::Arrived {
                destination,
                started_at,
            }) => {
                state.metrics.distance_to_destination_meters.set(0.0);
                state
                    .metrics
                    .sessions_total
                    .with_label_values(&["arrived"])
                    .inc();
                let duration = (Utc::now() - started_at).num_milliseconds() as f64 / 1000.0;
                state.metrics.session_duration_seconds.observe(duration);

                info!(destination = %destination.id, "arrived at destination");
            }
            Err(err) => {
                warn!(error = %err, "failed to apply position update");
            }
        }
    }

    warn!("tracking engine stopped: position channel closed");
}
