use tokio::sync::broadcast;
use tracing::info;

use crate::models::event::NavigationEvent;

/// Fired when the lifecycle machine detects arrival. Best-effort: a failed
/// or unobserved notification never feeds back into the machine.
pub trait ArrivalNotifier: Send + Sync {
    fn notify_arrival(&self, destination_name: &str);
}

pub struct EventNotifier {
    events_tx: broadcast::Sender<NavigationEvent>,
}

impl EventNotifier {
    pub fn new(events_tx: broadcast::Sender<NavigationEvent>) -> Self {
        Self { events_tx }
    }
}

impl ArrivalNotifier for EventNotifier {
    fn notify_arrival(&self, destination_name: &str) {
        info!(destination = destination_name, "destination reached");

        // send only fails when no client is listening
        let _ = self.events_tx.send(NavigationEvent::Arrived {
            destination_name: destination_name.to_string(),
        });
    }
}
