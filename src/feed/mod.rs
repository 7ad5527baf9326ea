use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::destination::GeoPoint;

/// Requested accuracy tier: `Navigation` for turn-by-turn tracking,
/// `Balanced` for power-efficient display updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Navigation,
    Balanced,
}

/// Control surface the lifecycle machine uses to start and stop tracking
/// toward a destination. Delivery of positions happens out of band; absence
/// of updates must never corrupt the machine's last-known position.
pub trait TrackingFeed: Send + Sync {
    fn start(&self, target: GeoPoint) -> Uuid;
    fn stop(&self, subscription: Uuid);
}

#[derive(Debug, Clone)]
pub struct TrackingSubscription {
    pub id: Uuid,
    pub target: GeoPoint,
    pub accuracy: Accuracy,
    pub started_at: DateTime<Utc>,
}

pub struct BackgroundLocationFeed {
    accuracy: Accuracy,
    subscriptions: DashMap<Uuid, TrackingSubscription>,
}

impl BackgroundLocationFeed {
    pub fn new(accuracy: Accuracy) -> Self {
        Self {
            accuracy,
            subscriptions: DashMap::new(),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }
}

impl TrackingFeed for BackgroundLocationFeed {
    fn start(&self, target: GeoPoint) -> Uuid {
        // Restart on an already-tracking feed reuses the running
        // subscription instead of stacking a second one.
        if let Some(existing) = self.subscriptions.iter().next() {
            debug!(subscription = %existing.id, "background tracking already running");
            return existing.id;
        }

        let subscription = TrackingSubscription {
            id: Uuid::new_v4(),
            target,
            accuracy: self.accuracy,
            started_at: Utc::now(),
        };

        info!(
            subscription = %subscription.id,
            target_lat = target.lat,
            target_lng = target.lng,
            accuracy = ?subscription.accuracy,
            "background tracking started"
        );
        self.subscriptions.insert(subscription.id, subscription.clone());
        subscription.id
    }

    fn stop(&self, subscription: Uuid) {
        match self.subscriptions.remove(&subscription) {
            Some(_) => info!(subscription = %subscription, "background tracking stopped"),
            None => debug!("no background tracking to stop"),
        }
    }
}
