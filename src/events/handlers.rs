//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | EventHandler            | Trait for event handling                          | handle_event     |
// | EventLogger             | In-memory event history for debugging and tests   | history          |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use tokio::sync::RwLock;

use super::event_types::{EngineEvent, EventResult};

/// Event handler trait for processing engine events.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the kinds of events this handler processes.
    fn event_types(&self) -> Vec<&'static str>;

    /// Processes an event.
    async fn handle_event(&self, event: EngineEvent) -> EventResult<()>;
}

/// A simple in-memory event logger for debugging and tests.
pub struct EventLogger {
    /// Maximum number of events to keep in history
    max_history: usize,
    /// Event history, oldest first
    history: Arc<RwLock<Vec<EngineEvent>>>,
}

impl EventLogger {
    /// Creates a new event logger keeping at most `max_history` events.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            history: Arc::new(RwLock::new(Vec::with_capacity(max_history))),
        }
    }

    /// Returns a copy of the recorded event history.
    pub async fn history(&self) -> Vec<EngineEvent> {
        self.history.read().await.clone()
    }
}

#[async_trait::async_trait]
impl EventHandler for EventLogger {
    fn event_types(&self) -> Vec<&'static str> {
        vec![
            "TradeExecuted",
            "OrderRested",
            "OrderCancelled",
            "BookUpdated",
        ]
    }

    async fn handle_event(&self, event: EngineEvent) -> EventResult<()> {
        let mut history = self.history.write().await;
        if history.len() >= self.max_history {
            history.remove(0);
        }
        history.push(event);
        Ok(())
    }
}
