//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Central event bus for the matching engine, built on tokio's broadcast
// channel. Components publish events here; any number of subscribers receive
// their own copy.
//
// | Component     | Description                                                 |
// |---------------|-------------------------------------------------------------|
// | EventBus      | Central event bus for publishing and subscribing to events  |
//--------------------------------------------------------------------------------------------------

use tokio::sync::broadcast;
use tracing::{debug, error};

use super::event_types::{EngineEvent, EventError, EventResult};

/// Central event bus for publishing and subscribing to engine events.
///
/// Backed by tokio's broadcast channel: every active subscriber receives
/// every event published after it subscribed. Publishing with zero
/// subscribers is a no-op, not an error, so the engine can run headless.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Channel for broadcasting events to all subscribers
    sender: broadcast::Sender<EngineEvent>,
    /// Capacity of the event channel
    capacity: usize,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The maximum number of events that can be queued before
    ///   older events are dropped for lagging subscribers.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publishes an event to all subscribers.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - the event was delivered, or there were no subscribers.
    /// * `Err(EventError)` - the underlying channel rejected the send.
    pub fn publish(&self, event: EngineEvent) -> EventResult<()> {
        if self.sender.receiver_count() == 0 {
            debug!(kind = event.kind(), "No subscribers for event");
            return Ok(());
        }

        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to publish event: {}", e);
                Err(EventError::PublishError(e.to_string()))
            }
        }
    }

    /// Creates a new subscription. Each call returns an independent receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the capacity of the event channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
