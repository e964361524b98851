//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | EngineEvent             | Event variants emitted by the matching engine     | kind             |
// | EventError              | Error types for event processing                  | error, from      |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::depth::DepthSnapshot;
use crate::types::{Order, Trade};

/// Errors that can occur in the event system.
#[derive(Error, Debug, Clone)]
pub enum EventError {
    /// Failed to publish an event (e.g., channel closed)
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to process an event
    #[error("Failed to process event: {0}")]
    ProcessingError(String),
}

/// Type alias for Result with EventError.
pub type EventResult<T> = Result<T, EventError>;

/// Events emitted by the matching engine after a book mutation commits.
///
/// The engine emits these; it never serializes or stores them itself.
/// Delivery, persistence and fan-out are the subscribers' concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Generated when a trade is executed
    TradeExecuted {
        /// The trade that was executed
        trade: Trade,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },

    /// Generated when an order rests in the book (GTC remainder)
    OrderRested {
        /// The order as it rested, remaining quantity included
        order: Order,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },

    /// Generated when an unfilled remainder is cancelled (IOC / market)
    OrderCancelled {
        /// The order as it was cancelled
        order: Order,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },

    /// Generated when the resting book changes shape
    BookUpdated {
        /// Aggregated depth after the mutation
        snapshot: DepthSnapshot,
        /// Timestamp when the event occurred
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Stable name for this event variant, used as the dispatch key when
    /// routing events to handlers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TradeExecuted { .. } => "TradeExecuted",
            Self::OrderRested { .. } => "OrderRested",
            Self::OrderCancelled { .. } => "OrderCancelled",
            Self::BookUpdated { .. } => "BookUpdated",
        }
    }
}
