//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Core value types for the matching engine: orders, trades and the enums that
// drive side-dependent matching behavior.
//
// | Section   | Description                                                  |
// |-----------|--------------------------------------------------------------|
// | ENUMS     | Side, OrderType, TimeInForce, OrderStatus                    |
// | STRUCTS   | Order, Trade, SequenceGenerator                              |
// | TESTS     | Unit tests for the defined types                             |
//
// Prices are integer minor units (i64) and quantities are base units (u64).
// Floating point is never used for price comparison.
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the side of an order (Bid = buy, Ask = sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A buy order.
    Bid,
    /// A sell order.
    Ask,
}

impl Side {
    /// Returns the side an incoming order matches against.
    #[inline]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }

    /// Returns true when an order on this side with `limit` crosses a resting
    /// price of `resting` on the opposite side.
    ///
    /// A bid crosses while the best ask is at or below its limit; an ask
    /// crosses while the best bid is at or above its limit.
    #[inline]
    pub fn crosses(&self, limit: i64, resting: i64) -> bool {
        match self {
            Self::Bid => resting <= limit,
            Self::Ask => resting >= limit,
        }
    }
}

/// Represents the type of an order, influencing its matching behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// An order that executes at a specific price or better.
    Limit,
    /// An order that executes immediately at the best available price.
    Market,
}

/// Defines how long an order remains active in the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Good Till Cancel - remains active until explicitly cancelled.
    #[default]
    Gtc,
    /// Immediate Or Cancel - fills what it can, the remainder is cancelled.
    Ioc,
}

/// Represents the lifecycle status of an order within the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been accepted by the engine but not yet matched.
    Submitted,
    /// The order has been partially filled.
    PartiallyFilled,
    /// The order has been completely filled.
    Filled,
    /// The order was cancelled before being filled at all.
    Cancelled,
    /// The order was partially filled and the remainder cancelled.
    PartiallyFilledCancelled,
}

/// A trading order. Identity fields are immutable; `remaining_base`,
/// `filled_base`, `status` and `updated_at` evolve as the order matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier. Used for tie-breaking and debugging only; ordering
    /// decisions are made on price and `sequence`, never on the id.
    pub id: Uuid,
    /// Identifier for the account placing the order.
    pub account_id: Uuid,
    /// Identifier for the instrument being traded.
    pub instrument_id: Uuid,
    /// Side of the order (Bid or Ask).
    pub side: Side,
    /// Type of the order (Limit or Market).
    pub order_type: OrderType,
    /// Limit price in minor units. `None` for market orders.
    pub limit_price: Option<i64>,
    /// Submitted quantity in base units.
    pub base_amount: u64,
    /// Remaining quantity in base units. Never negative; the order is removed
    /// from the book exactly when it reaches zero.
    pub remaining_base: u64,
    /// Quantity filled so far in base units.
    pub filled_base: u64,
    /// Duration policy for the order.
    pub time_in_force: TimeInForce,
    /// Current status of the order.
    pub status: OrderStatus,
    /// Timestamp of order creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the order.
    pub updated_at: DateTime<Utc>,
    /// Arrival sequence assigned by the engine upon acceptance. Strictly
    /// increasing; the secondary sort key within a price level.
    pub sequence: u64,
}

impl Order {
    /// Creates a new limit order awaiting submission. The engine assigns the
    /// sequence number on acceptance.
    pub fn limit(
        account_id: Uuid,
        instrument_id: Uuid,
        side: Side,
        price: i64,
        quantity: u64,
        time_in_force: TimeInForce,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            instrument_id,
            side,
            order_type: OrderType::Limit,
            limit_price: Some(price),
            base_amount: quantity,
            remaining_base: quantity,
            filled_base: 0,
            time_in_force,
            status: OrderStatus::Submitted,
            created_at: now,
            updated_at: now,
            sequence: 0,
        }
    }

    /// Creates a new market order. Market orders carry no price bound and are
    /// always treated as immediate-or-cancel.
    pub fn market(account_id: Uuid, instrument_id: Uuid, side: Side, quantity: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            instrument_id,
            side,
            order_type: OrderType::Market,
            limit_price: None,
            base_amount: quantity,
            remaining_base: quantity,
            filled_base: 0,
            time_in_force: TimeInForce::Ioc,
            status: OrderStatus::Submitted,
            created_at: now,
            updated_at: now,
            sequence: 0,
        }
    }

    /// Returns true once the order has no remaining quantity.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining_base == 0
    }
}

/// Represents a completed trade resulting from matching two orders.
/// Trades are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade.
    pub id: Uuid,
    /// Identifier for the instrument traded.
    pub instrument_id: Uuid,
    /// ID of the order that was resting on the book (maker).
    pub maker_order_id: Uuid,
    /// ID of the incoming order that matched it (taker).
    pub taker_order_id: Uuid,
    /// Price at which the trade occurred, in minor units. Always the resting
    /// order's price.
    pub price: i64,
    /// Quantity traded in base units.
    pub base_amount: u64,
    /// Quantity traded in quote units (`base_amount * price`).
    pub quote_amount: u64,
    /// Timestamp when the trade occurred.
    pub executed_at: DateTime<Utc>,
}

/// Monotonic counter stamping arrival order onto accepted orders.
///
/// Owned by the engine (one per instrument); never global mutable state.
#[derive(Debug)]
pub struct SequenceGenerator {
    next: u64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next sequence number. Strictly increasing.
    #[inline]
    pub fn next(&mut self) -> u64 {
        let seq = self.next;
        self.next += 1;
        seq
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
