//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Aggregated depth-of-book views. The order book itself holds the per-order
// queues; this module defines the flattened, serializable shapes it reports.
//
// | Component     | Description                                                |
// |---------------|------------------------------------------------------------|
// | LevelDepth    | Aggregated volume information at a specific price          |
// | DepthSnapshot | Immutable point-in-time view of order book depth           |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an aggregated price level in the depth view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDepth {
    /// The price for this level, in minor units.
    pub price: i64,
    /// Total remaining volume at this price level, in base units.
    pub volume: u64,
    /// Number of orders at this price level.
    pub order_count: u32,
}

/// An immutable snapshot of order book depth at a specific point in time.
///
/// Levels are reported best-first per side and never include a level with
/// zero volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Bid price levels ordered by price descending (best bids first).
    pub bids: Vec<LevelDepth>,
    /// Ask price levels ordered by price ascending (best asks first).
    pub asks: Vec<LevelDepth>,
    /// Timestamp when this snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Instrument ID this depth snapshot belongs to.
    pub instrument_id: Uuid,
}

impl DepthSnapshot {
    /// Creates a new depth snapshot stamped with the current time.
    #[inline]
    pub fn new(bids: Vec<LevelDepth>, asks: Vec<LevelDepth>, instrument_id: Uuid) -> Self {
        Self {
            bids,
            asks,
            timestamp: Utc::now(),
            instrument_id,
        }
    }

    /// Returns the best bid price if available.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.first().map(|level| level.price)
    }

    /// Returns the best ask price if available.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.first().map(|level| level.price)
    }

    /// Returns the current spread (best ask - best bid).
    #[inline]
    pub fn spread(&self) -> Option<i64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }
}
