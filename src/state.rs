use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};

use crate::config::Config;
use crate::engine::lifecycle::Lifecycle;
use crate::feed::{Accuracy, BackgroundLocationFeed};
use crate::models::destination::{self, Destination, GeoPoint};
use crate::models::event::NavigationEvent;
use crate::notify::EventNotifier;
use crate::observability::metrics::Metrics;
use crate::storage::SessionStore;

pub struct AppState {
    pub lifecycle: Mutex<Lifecycle>,
    pub destinations: Vec<Destination>,
    pub position_tx: mpsc::Sender<GeoPoint>,
    pub events_tx: broadcast::Sender<NavigationEvent>,
    pub feed: Arc<BackgroundLocationFeed>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn SessionStore>,
    ) -> (Self, mpsc::Receiver<GeoPoint>) {
        let (position_tx, position_rx) = mpsc::channel(config.position_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        let feed = Arc::new(BackgroundLocationFeed::new(Accuracy::Navigation));
        let notifier = Arc::new(EventNotifier::new(events_tx.clone()));
        let lifecycle = Lifecycle::new(config.arrival_threshold_m, store, feed.clone(), notifier);

        (
            Self {
                lifecycle: Mutex::new(lifecycle),
                destinations: destination::catalog(),
                position_tx,
                events_tx,
                feed,
                metrics: Metrics::new(),
            },
            position_rx,
        )
    }
}
