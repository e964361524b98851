//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | EventDispatcher         | Routes events to registered handlers              | dispatch, start  |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::event_bus::EventBus;
use super::handlers::EventHandler;

/// Dispatches events from the bus to registered handlers.
///
/// Handlers declare the event kinds they care about; the dispatcher fans each
/// event out to the matching handlers only. Handler failures are logged and
/// never propagate back to the engine.
pub struct EventDispatcher {
    /// Event bus for receiving events
    event_bus: EventBus,
    /// Map of event kinds to handlers
    handlers: Arc<RwLock<HashMap<&'static str, Vec<Arc<dyn EventHandler>>>>>,
}

// Trait objects are not Debug; show the shape, not the handlers.
impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("event_bus", &self.event_bus)
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    /// Creates a new event dispatcher subscribed to `event_bus`.
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a handler for the event kinds it declares via
    /// `event_types()`.
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        for event_type in handler.event_types() {
            handlers
                .entry(event_type)
                .or_default()
                .push(Arc::clone(&handler));
        }
        debug!(
            "Registered handler for event types: {:?}",
            handler.event_types()
        );
    }

    /// Starts the dispatcher, consuming it. Events are processed in the
    /// background until the bus is dropped.
    ///
    /// # Returns
    /// A JoinHandle that completes when the event stream ends.
    pub async fn start(self) -> tokio::task::JoinHandle<()> {
        let handlers = Arc::clone(&self.handlers);
        let mut receiver = self.event_bus.subscribe();

        tokio::spawn(async move {
            info!("Event dispatcher started");

            while let Ok(event) = receiver.recv().await {
                let handlers_lock = handlers.read().await;
                let Some(event_handlers) = handlers_lock.get(event.kind()) else {
                    debug!(kind = event.kind(), "No handlers registered for event");
                    continue;
                };

                for handler in event_handlers {
                    let handler = Arc::clone(handler);
                    let event_clone = event.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle_event(event_clone).await {
                            error!("Handler failed to process event: {}", e);
                        }
                    });
                }
            }

            info!("Event dispatcher stopped");
        })
    }
}
