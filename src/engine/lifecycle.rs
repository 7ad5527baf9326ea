use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::feed::TrackingFeed;
use crate::geo;
use crate::models::destination::{Destination, GeoPoint};
use crate::models::session::{NavigationSession, PersistedSession};
use crate::notify::ArrivalNotifier;
use crate::storage::SessionStore;

/// Result of applying one position update.
#[derive(Debug, Clone)]
pub enum PositionOutcome {
    /// No active session; the position was recorded for display only.
    Recorded,
    /// Active session, still outside the arrival threshold.
    EnRoute { distance_m: f64 },
    /// The update crossed the arrival threshold and closed the session.
    Arrived {
        destination: Destination,
        started_at: DateTime<Utc>,
    },
}

/// What an active session looked like when it was closed.
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub destination: Destination,
    pub started_at: DateTime<Utc>,
}

/// Owns the one navigation session per process and every transition on it.
/// All side effects go through the three collaborators; the machine itself
/// does no I/O.
///
/// In-memory state is the source of truth for a running session. A store
/// write that fails during `begin` or `complete` is surfaced to the caller
/// for reporting but the transition stands; persistence exists for restart
/// recovery, not as a commit point.
pub struct Lifecycle {
    session: NavigationSession,
    arrival_threshold_m: f64,
    store: Arc<dyn SessionStore>,
    feed: Arc<dyn TrackingFeed>,
    notifier: Arc<dyn ArrivalNotifier>,
    tracking: Option<Uuid>,
}

impl Lifecycle {
    pub fn new(
        arrival_threshold_m: f64,
        store: Arc<dyn SessionStore>,
        feed: Arc<dyn TrackingFeed>,
        notifier: Arc<dyn ArrivalNotifier>,
    ) -> Self {
        Self {
            session: NavigationSession::empty(),
            arrival_threshold_m,
            store,
            feed,
            notifier,
            tracking: None,
        }
    }

    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    /// Re-enters an active session from the persisted record. Called once at
    /// startup, before any other operation. The record is already durable,
    /// so nothing is written back; a partial record is ignored.
    ///
    /// The destination is re-resolved from the catalog by id to recover the
    /// fields the record does not carry; an id that has left the catalog
    /// falls back to the stored name and coordinates.
    pub fn restore(&mut self, record: PersistedSession, catalog: &[Destination]) {
        if !record.is_navigation_active {
            return;
        }

        let started_at = record.started_at();
        let (Some(id), Some(name), Some(coordinates), Some(started_at)) = (
            record.destination_id,
            record.destination_name,
            record.destination_coordinates,
            started_at,
        ) else {
            warn!("persisted session is active but incomplete; starting idle");
            return;
        };

        let destination = catalog
            .iter()
            .find(|candidate| candidate.id == id)
            .cloned()
            .unwrap_or_else(|| Destination {
                id,
                name: name.clone(),
                address: name,
                coordinates,
            });

        info!(destination = %destination.id, "restoring navigation session");

        self.tracking = Some(self.feed.start(destination.coordinates));
        self.session = NavigationSession {
            active: true,
            destination: Some(destination),
            driver_position: record.driver_coordinates,
            started_at: Some(started_at),
        };
    }

    /// Starts a delivery toward `destination`. Only valid while idle:
    /// re-beginning the current destination is `AlreadyActive`, switching to
    /// a different one is `ActiveConflict` (compared by id, never by
    /// coordinates). On failure the session is unchanged.
    pub fn begin(
        &mut self,
        destination: Destination,
        driver_position: GeoPoint,
    ) -> Result<(), AppError> {
        if self.session.active {
            if let Some(current) = &self.session.destination {
                if current.id != destination.id {
                    return Err(AppError::ActiveConflict(current.name.clone()));
                }
            }
            return Err(AppError::AlreadyActive);
        }

        if !geo::is_valid(&driver_position) {
            return Err(AppError::InvalidLocation(format!(
                "driver position {},{} is out of range; latitude must be within [-90, 90] and longitude within [-180, 180]",
                driver_position.lat, driver_position.lng
            )));
        }

        self.session = NavigationSession {
            active: true,
            destination: Some(destination.clone()),
            driver_position: Some(driver_position),
            started_at: Some(Utc::now()),
        };
        self.tracking = Some(self.feed.start(destination.coordinates));

        info!(destination = %destination.id, "navigation started");

        self.store.save(&self.session.to_persisted())?;
        Ok(())
    }

    /// Applies one position update. Valid in any state; while idle the
    /// position is only recorded for display. An invalid position is
    /// rejected without touching the last known one.
    pub fn update_position(&mut self, position: GeoPoint) -> Result<PositionOutcome, AppError> {
        if !geo::is_valid(&position) {
            return Err(AppError::InvalidLocation(format!(
                "position {},{} is out of range; latitude must be within [-90, 90] and longitude within [-180, 180]",
                position.lat, position.lng
            )));
        }

        self.session.driver_position = Some(position);

        if !self.session.active {
            return Ok(PositionOutcome::Recorded);
        }

        let destination = self
            .session
            .destination
            .clone()
            .ok_or_else(|| AppError::Internal("active session without destination".to_string()))?;
        let started_at = self
            .session
            .started_at
            .ok_or_else(|| AppError::Internal("active session without start time".to_string()))?;

        let distance_m = geo::haversine_m(&position, &destination.coordinates);
        if distance_m <= self.arrival_threshold_m {
            // The notifier is signaled even when clearing the stored record
            // fails; the driver has arrived either way.
            let result = self.complete();
            self.notifier.notify_arrival(&destination.name);
            result?;

            return Ok(PositionOutcome::Arrived {
                destination,
                started_at,
            });
        }

        Ok(PositionOutcome::EnRoute { distance_m })
    }

    /// Ends the active session: clears destination and start time, stops
    /// tracking, erases the stored record. Idempotent; completing an idle
    /// machine is a no-op with no further side effects.
    pub fn complete(&mut self) -> Result<Option<ClosedSession>, AppError> {
        if !self.session.active {
            return Ok(None);
        }

        let closed = ClosedSession {
            destination: self.session.destination.take().ok_or_else(|| {
                AppError::Internal("active session without destination".to_string())
            })?,
            started_at: self.session.started_at.take().ok_or_else(|| {
                AppError::Internal("active session without start time".to_string())
            })?,
        };
        self.session.active = false;

        if let Some(subscription) = self.tracking.take() {
            self.feed.stop(subscription);
        }

        info!(destination = %closed.destination.id, "navigation ended");

        self.store.clear()?;
        Ok(Some(closed))
    }

    /// User-initiated abandonment. Same terminal transition as `complete`;
    /// the differing intent lives with the caller, as does the confirmation
    /// dialog, which must already have been answered.
    pub fn cancel(&mut self) -> Result<Option<ClosedSession>, AppError> {
        self.complete()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use uuid::Uuid;

    use super::{Lifecycle, PositionOutcome};
    use crate::error::AppError;
    use crate::feed::TrackingFeed;
    use crate::models::destination::{catalog, Destination, GeoPoint};
    use crate::models::session::PersistedSession;
    use crate::notify::ArrivalNotifier;
    use crate::storage::SessionStore;

    // ~0.000225 degrees of latitude is about 25 m; ~0.00036 is about 40 m.
    const NEAR_OFFSET_DEG: f64 = 0.000225;
    const FAR_OFFSET_DEG: f64 = 0.00036;

    #[derive(Default)]
    struct RecordingStore {
        saves: Mutex<Vec<PersistedSession>>,
        clears: AtomicUsize,
        fail_save: bool,
        fail_clear: bool,
    }

    impl RecordingStore {
        fn failing_save() -> Self {
            Self {
                fail_save: true,
                ..Self::default()
            }
        }

        fn failing_clear() -> Self {
            Self {
                fail_clear: true,
                ..Self::default()
            }
        }

        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }

        fn clear_count(&self) -> usize {
            self.clears.load(Ordering::SeqCst)
        }
    }

    impl SessionStore for RecordingStore {
        fn load(&self) -> Result<PersistedSession, AppError> {
            Ok(PersistedSession::default())
        }

        fn save(&self, record: &PersistedSession) -> Result<(), AppError> {
            if self.fail_save {
                return Err(AppError::Persistence("disk full".to_string()));
            }
            self.saves.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn clear(&self) -> Result<(), AppError> {
            if self.fail_clear {
                return Err(AppError::Persistence("disk full".to_string()));
            }
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingFeed {
        started: Mutex<Vec<GeoPoint>>,
        stopped: AtomicUsize,
    }

    impl TrackingFeed for RecordingFeed {
        fn start(&self, target: GeoPoint) -> Uuid {
            self.started.lock().unwrap().push(target);
            Uuid::new_v4()
        }

        fn stop(&self, _subscription: Uuid) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        arrivals: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn arrival_count(&self) -> usize {
            self.arrivals.lock().unwrap().len()
        }
    }

    impl ArrivalNotifier for RecordingNotifier {
        fn notify_arrival(&self, destination_name: &str) {
            self.arrivals
                .lock()
                .unwrap()
                .push(destination_name.to_string());
        }
    }

    fn machine_with_store(
        store: Arc<RecordingStore>,
    ) -> (
        Lifecycle,
        Arc<RecordingStore>,
        Arc<RecordingFeed>,
        Arc<RecordingNotifier>,
    ) {
        let feed = Arc::new(RecordingFeed::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let lifecycle = Lifecycle::new(30.0, store.clone(), feed.clone(), notifier.clone());
        (lifecycle, store, feed, notifier)
    }

    fn machine() -> (
        Lifecycle,
        Arc<RecordingStore>,
        Arc<RecordingFeed>,
        Arc<RecordingNotifier>,
    ) {
        machine_with_store(Arc::new(RecordingStore::default()))
    }

    fn palladium() -> Destination {
        catalog()
            .into_iter()
            .find(|destination| destination.id == "palladium")
            .unwrap()
    }

    fn alphaone() -> Destination {
        catalog()
            .into_iter()
            .find(|destination| destination.id == "alphaone")
            .unwrap()
    }

    fn near(destination: &Destination) -> GeoPoint {
        GeoPoint {
            lat: destination.coordinates.lat + NEAR_OFFSET_DEG,
            lng: destination.coordinates.lng,
        }
    }

    fn far(destination: &Destination) -> GeoPoint {
        GeoPoint {
            lat: destination.coordinates.lat + FAR_OFFSET_DEG,
            lng: destination.coordinates.lng,
        }
    }

    fn start_position() -> GeoPoint {
        GeoPoint {
            lat: 23.0513498,
            lng: 72.4917073,
        }
    }

    #[test]
    fn begin_activates_session_and_persists_once() {
        let (mut lifecycle, store, feed, _) = machine();

        lifecycle.begin(palladium(), start_position()).unwrap();

        let session = lifecycle.session();
        assert!(session.active);
        assert_eq!(session.destination.as_ref().unwrap().id, "palladium");
        assert!(session.started_at.is_some());

        assert_eq!(store.save_count(), 1);
        let saves = store.saves.lock().unwrap();
        assert!(saves[0].is_navigation_active);
        assert_eq!(saves[0].destination_id.as_deref(), Some("palladium"));

        assert_eq!(feed.started.lock().unwrap().len(), 1);
    }

    #[test]
    fn begin_rejects_invalid_position_without_side_effects() {
        let (mut lifecycle, store, feed, _) = machine();

        let result = lifecycle.begin(palladium(), GeoPoint { lat: 91.0, lng: 0.0 });

        assert!(matches!(result, Err(AppError::InvalidLocation(_))));
        assert!(!lifecycle.session().active);
        assert_eq!(store.save_count(), 0);
        assert!(feed.started.lock().unwrap().is_empty());
    }

    #[test]
    fn begin_twice_same_destination_is_already_active() {
        let (mut lifecycle, store, _, _) = machine();
        lifecycle.begin(palladium(), start_position()).unwrap();

        let result = lifecycle.begin(palladium(), start_position());

        assert!(matches!(result, Err(AppError::AlreadyActive)));
        assert!(lifecycle.session().active);
        assert_eq!(lifecycle.session().destination.as_ref().unwrap().id, "palladium");
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn destination_change_while_active_is_a_conflict() {
        let (mut lifecycle, _, _, _) = machine();
        lifecycle.begin(palladium(), start_position()).unwrap();

        let result = lifecycle.begin(alphaone(), start_position());

        assert!(matches!(result, Err(AppError::ActiveConflict(_))));
        assert_eq!(lifecycle.session().destination.as_ref().unwrap().id, "palladium");
    }

    #[test]
    fn update_within_threshold_arrives_and_notifies_once() {
        let (mut lifecycle, store, feed, notifier) = machine();
        let destination = palladium();
        lifecycle.begin(destination.clone(), start_position()).unwrap();

        let outcome = lifecycle.update_position(near(&destination)).unwrap();

        assert!(matches!(outcome, PositionOutcome::Arrived { .. }));
        assert!(!lifecycle.session().active);
        assert!(lifecycle.session().destination.is_none());
        assert!(lifecycle.session().started_at.is_none());
        assert_eq!(store.clear_count(), 1);
        assert_eq!(notifier.arrival_count(), 1);
        assert_eq!(feed.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn update_outside_threshold_stays_en_route() {
        let (mut lifecycle, store, _, notifier) = machine();
        let destination = palladium();
        lifecycle.begin(destination.clone(), start_position()).unwrap();

        let outcome = lifecycle.update_position(far(&destination)).unwrap();

        match outcome {
            PositionOutcome::EnRoute { distance_m } => {
                assert!(distance_m > 30.0 && distance_m < 50.0);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(lifecycle.session().active);
        assert_eq!(store.clear_count(), 0);
        assert_eq!(notifier.arrival_count(), 0);
    }

    #[test]
    fn threshold_is_configurable() {
        let store = Arc::new(RecordingStore::default());
        let feed = Arc::new(RecordingFeed::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut lifecycle = Lifecycle::new(50.0, store, feed, notifier.clone());

        let destination = palladium();
        lifecycle.begin(destination.clone(), start_position()).unwrap();
        let outcome = lifecycle.update_position(far(&destination)).unwrap();

        // 40 m is an arrival once the threshold is raised to 50 m
        assert!(matches!(outcome, PositionOutcome::Arrived { .. }));
        assert_eq!(notifier.arrival_count(), 1);
    }

    #[test]
    fn idle_update_records_position_without_arrival_checks() {
        let (mut lifecycle, store, _, notifier) = machine();

        let outcome = lifecycle.update_position(start_position()).unwrap();

        assert!(matches!(outcome, PositionOutcome::Recorded));
        assert_eq!(
            lifecycle.session().driver_position.unwrap().lat,
            start_position().lat
        );
        assert_eq!(store.save_count(), 0);
        assert_eq!(notifier.arrival_count(), 0);
    }

    #[test]
    fn invalid_update_keeps_last_known_position() {
        let (mut lifecycle, _, _, _) = machine();
        let destination = palladium();
        lifecycle.begin(destination.clone(), start_position()).unwrap();

        let result = lifecycle.update_position(GeoPoint {
            lat: f64::NAN,
            lng: 0.0,
        });

        assert!(matches!(result, Err(AppError::InvalidLocation(_))));
        assert_eq!(
            lifecycle.session().driver_position.unwrap().lat,
            start_position().lat
        );
        assert!(lifecycle.session().active);
    }

    #[test]
    fn complete_is_idempotent() {
        let (mut lifecycle, store, feed, _) = machine();
        lifecycle.begin(palladium(), start_position()).unwrap();

        let first = lifecycle.complete().unwrap();
        let second = lifecycle.complete().unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.clear_count(), 1);
        assert_eq!(feed.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_clears_session_and_store() {
        let (mut lifecycle, store, feed, notifier) = machine();
        lifecycle.begin(alphaone(), start_position()).unwrap();

        let closed = lifecycle.cancel().unwrap().unwrap();

        assert_eq!(closed.destination.id, "alphaone");
        assert!(!lifecycle.session().active);
        assert_eq!(store.clear_count(), 1);
        assert_eq!(feed.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.arrival_count(), 0);
    }

    #[test]
    fn failed_save_surfaces_but_session_stays_active() {
        let (mut lifecycle, _, feed, _) =
            machine_with_store(Arc::new(RecordingStore::failing_save()));

        let result = lifecycle.begin(palladium(), start_position());

        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert!(lifecycle.session().active);
        assert_eq!(feed.started.lock().unwrap().len(), 1);
    }

    #[test]
    fn failed_clear_on_arrival_still_notifies_and_goes_idle() {
        let (mut lifecycle, _, _, notifier) =
            machine_with_store(Arc::new(RecordingStore::failing_clear()));
        let destination = palladium();
        lifecycle.begin(destination.clone(), start_position()).unwrap();

        let result = lifecycle.update_position(near(&destination));

        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert!(!lifecycle.session().active);
        assert_eq!(notifier.arrival_count(), 1);
    }

    #[test]
    fn restore_active_record_reenters_active_without_writing() {
        let (mut lifecycle, store, feed, _) = machine();
        let record = PersistedSession {
            is_navigation_active: true,
            destination_id: Some("palladium".to_string()),
            destination_name: Some("Palladium Mall".to_string()),
            destination_coordinates: Some(palladium().coordinates),
            start_time: Some(1_700_000_000_000),
            driver_coordinates: Some(start_position()),
        };

        lifecycle.restore(record, &catalog());

        let session = lifecycle.session();
        assert!(session.active);
        let destination = session.destination.as_ref().unwrap();
        assert_eq!(destination.id, "palladium");
        // address comes back from the catalog, not the record
        assert_eq!(destination.address, "Palladium Mall, Ahmedabad");
        assert_eq!(
            session.started_at.unwrap().timestamp_millis(),
            1_700_000_000_000
        );
        assert_eq!(store.save_count(), 0);
        assert_eq!(feed.started.lock().unwrap().len(), 1);
    }

    #[test]
    fn restore_unknown_destination_falls_back_to_stored_fields() {
        let (mut lifecycle, _, _, _) = machine();
        let record = PersistedSession {
            is_navigation_active: true,
            destination_id: Some("riverfront".to_string()),
            destination_name: Some("Riverfront Market".to_string()),
            destination_coordinates: Some(GeoPoint {
                lat: 23.03,
                lng: 72.57,
            }),
            start_time: Some(1_700_000_000_000),
            driver_coordinates: None,
        };

        lifecycle.restore(record, &catalog());

        let destination = lifecycle.session().destination.as_ref().unwrap();
        assert_eq!(destination.id, "riverfront");
        assert_eq!(destination.address, "Riverfront Market");
    }

    #[test]
    fn restore_empty_record_stays_idle() {
        let (mut lifecycle, store, feed, _) = machine();

        lifecycle.restore(PersistedSession::default(), &catalog());

        assert!(!lifecycle.session().active);
        assert_eq!(store.save_count(), 0);
        assert!(feed.started.lock().unwrap().is_empty());
    }

    #[test]
    fn restore_partial_record_stays_idle() {
        let (mut lifecycle, _, feed, _) = machine();
        let record = PersistedSession {
            is_navigation_active: true,
            destination_id: Some("palladium".to_string()),
            // name, coordinates and start time missing
            ..PersistedSession::default()
        };

        lifecycle.restore(record, &catalog());

        assert!(!lifecycle.session().active);
        assert!(feed.started.lock().unwrap().is_empty());
    }

    #[test]
    fn begin_after_complete_starts_fresh_session() {
        let (mut lifecycle, store, _, _) = machine();
        lifecycle.begin(palladium(), start_position()).unwrap();
        lifecycle.complete().unwrap();

        lifecycle.begin(alphaone(), start_position()).unwrap();

        assert!(lifecycle.session().active);
        assert_eq!(lifecycle.session().destination.as_ref().unwrap().id, "alphaone");
        assert_eq!(store.save_count(), 2);
    }
}
