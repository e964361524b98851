//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading instrument.
// It maintains bid and ask orders in price-time priority (FIFO) order.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | PriceLevel    | FIFO queue of orders sharing one exact price                              |
// | BookSide      | Price-ordered index of levels for one side (bid or ask)                   |
// | OrderBook     | One bid side plus one ask side for a single instrument                    |
//
// The two-level layout (ordered map of price levels, FIFO queue per level) is
// what makes price-time priority cheap: best-price discovery is O(log N) on
// the level index and time priority inside a level is the queue order itself.
// Partially filled resting orders are decremented in place at the head of
// their queue; they are never removed and re-enqueued, which would rotate
// them to the tail and break time priority.
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|--------------------------|
// | PriceLevel    | Maintains orders at a specific price               | enqueue                  |
// |               |                                                    | peek_front               |
// |               |                                                    | pop_front_if_filled      |
// |---------------|----------------------------------------------------|--------------------------|
// | BookSide      | Ordered collection of price levels                 | best_price, best_level   |
// |               |                                                    | insert_order             |
// |               |                                                    | remove_level_if_empty    |
// |---------------|----------------------------------------------------|--------------------------|
// | OrderBook     | Main order book implementation                     | insert_order             |
// |               |                                                    | best_bid, best_ask       |
// |               |                                                    | depth, snapshot          |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use uuid::Uuid;

use crate::depth::{DepthSnapshot, LevelDepth};
use crate::types::{Order, OrderStatus, Side};

/// Errors that can occur during order book operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderBookError {
    /// Order is for a different instrument than this order book.
    #[error("order is for wrong instrument (expected {expected}, got {got})")]
    WrongInstrument { expected: Uuid, got: Uuid },

    /// Orders without a limit price can never rest in the book.
    #[error("orders without a limit price cannot rest in the book")]
    NoLimitPrice,

    /// Resting prices must be positive minor units.
    #[error("limit price must be positive (got {0})")]
    InvalidPrice(i64),
}

/// A price level in the order book: a FIFO queue of resting orders that all
/// share one exact price.
///
/// The queue order equals arrival order, which is how time priority is
/// encoded; the first order in is always the first matched.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price for this level, in minor units.
    price: i64,
    /// FIFO queue of orders at this price level.
    orders: VecDeque<Order>,
    /// Total remaining volume of all orders at this price level.
    total_volume: u64,
}

impl PriceLevel {
    /// Creates an empty level at `price`. Levels only exist while they hold
    /// orders; the owning side creates one when the first order at a new
    /// price arrives.
    fn new(price: i64) -> Self {
        Self {
            price,
            orders: VecDeque::with_capacity(4),
            total_volume: 0,
        }
    }

    /// The price shared by every order in this level.
    #[inline]
    pub fn price(&self) -> i64 {
        self.price
    }

    /// Appends an order to the tail of the queue. The caller enforces that
    /// the order's limit price equals the level price.
    pub fn enqueue(&mut self, order: Order) {
        debug_assert_eq!(order.limit_price, Some(self.price));
        self.total_volume = self.total_volume.saturating_add(order.remaining_base);
        self.orders.push_back(order);
    }

    /// Returns the next order to be matched without removing it from the
    /// queue.
    #[inline]
    pub fn peek_front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Applies a fill of `quantity` to the head order, decrementing its
    /// remaining quantity and the level volume in place. Returns a copy of
    /// the head order after the fill, or `None` if the level is empty.
    ///
    /// The head order is mutated where it sits; its queue position (and with
    /// it, its time priority) is untouched.
    pub(crate) fn fill_front(&mut self, quantity: u64) -> Option<Order> {
        let front = self.orders.front_mut()?;
        debug_assert!(quantity <= front.remaining_base);

        front.remaining_base -= quantity;
        front.filled_base += quantity;
        front.status = if front.remaining_base == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        front.updated_at = Utc::now();
        self.total_volume = self.total_volume.saturating_sub(quantity);

        Some(front.clone())
    }

    /// Removes the head order once its remaining quantity has reached zero.
    /// Returns `None` (and leaves the queue untouched) while the head still
    /// has quantity to trade.
    pub(crate) fn pop_front_if_filled(&mut self) -> Option<Order> {
        match self.orders.front() {
            Some(order) if order.remaining_base == 0 => self.orders.pop_front(),
            _ => None,
        }
    }

    /// Returns true if this price level has no orders. An empty level must
    /// be removed from its side's index immediately.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns the number of orders at this price level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Returns the total remaining volume at this price level.
    #[inline]
    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    /// Iterates the resting orders in arrival (matching) order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

/// One side of the book: a price-ordered mapping from price to `PriceLevel`.
///
/// Best price means highest for the bid side and lowest for the ask side.
/// The `BTreeMap` key order gives O(log N) best-price lookup either way; no
/// cached best-price field to keep in sync.
#[derive(Debug)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<i64, PriceLevel>,
}

impl BookSide {
    fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// The side this index holds.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Returns the most favorable resting price: highest for bids, lowest
    /// for asks. `None` when the side is empty.
    #[inline]
    pub fn best_price(&self) -> Option<i64> {
        match self.side {
            Side::Bid => self.levels.keys().next_back().copied(),
            Side::Ask => self.levels.keys().next().copied(),
        }
    }

    /// Returns the level at the most favorable price, or `None` when the
    /// side is empty.
    pub fn best_level(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Bid => self.levels.values().next_back(),
            Side::Ask => self.levels.values().next(),
        }
    }

    pub(crate) fn best_level_mut(&mut self) -> Option<&mut PriceLevel> {
        match self.side {
            Side::Bid => self.levels.values_mut().next_back(),
            Side::Ask => self.levels.values_mut().next(),
        }
    }

    /// Locates or creates the price level for the order's limit price and
    /// enqueues the order at its tail, preserving time priority among orders
    /// already resting at that price.
    pub(crate) fn insert_order(&mut self, order: Order) {
        debug_assert_eq!(order.side, self.side);
        // insert_order is only reached through OrderBook::insert_order, which
        // has already rejected priceless orders.
        let Some(price) = order.limit_price else {
            return;
        };
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .enqueue(order);
    }

    /// Removes the level at `price` from the index if its queue has emptied,
    /// so best-price lookups never see a stale entry. Returns true when a
    /// level was removed.
    pub(crate) fn remove_level_if_empty(&mut self, price: i64) -> bool {
        match self.levels.get(&price) {
            Some(level) if level.is_empty() => {
                self.levels.remove(&price);
                true
            }
            _ => false,
        }
    }

    /// Returns the level resting at `price`, if any.
    pub fn level(&self, price: i64) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    /// Number of distinct price levels currently resting on this side.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// True when no orders rest on this side.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Aggregated depth, best price first, at most `levels` entries. Empty
    /// levels cannot appear because they are removed from the index the
    /// instant they drain.
    pub fn depth(&self, levels: usize) -> Vec<LevelDepth> {
        let to_depth = |level: &PriceLevel| LevelDepth {
            price: level.price(),
            volume: level.total_volume(),
            order_count: level.order_count() as u32,
        };
        match self.side {
            Side::Bid => self
                .levels
                .values()
                .rev()
                .take(levels)
                .map(to_depth)
                .collect(),
            Side::Ask => self.levels.values().take(levels).map(to_depth).collect(),
        }
    }
}

/// The main order book structure: one bid side and one ask side for a single
/// instrument, each maintained in price-time priority.
#[derive(Debug)]
pub struct OrderBook {
    /// Bid side, iterated from highest price to lowest.
    bids: BookSide,
    /// Ask side, iterated from lowest price to highest.
    asks: BookSide,
    /// Identifier for the instrument this order book manages.
    instrument_id: Uuid,
}

impl OrderBook {
    /// Creates a new empty order book for a specific instrument.
    pub fn new(instrument_id: Uuid) -> Self {
        Self {
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
            instrument_id,
        }
    }

    /// Returns the requested side, read-only.
    #[inline]
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Mutable side access, reserved for the matching engine.
    #[inline]
    pub(crate) fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Rests an order in the book at its limit price, joining the tail of an
    /// existing level or opening a new one.
    ///
    /// # Errors
    /// * `WrongInstrument` - the order belongs to a different book
    /// * `NoLimitPrice` - market orders can never rest
    /// * `InvalidPrice` - the limit price is not a positive minor-unit value
    pub fn insert_order(&mut self, order: Order) -> Result<(), OrderBookError> {
        if order.instrument_id != self.instrument_id {
            return Err(OrderBookError::WrongInstrument {
                expected: self.instrument_id,
                got: order.instrument_id,
            });
        }
        match order.limit_price {
            None => return Err(OrderBookError::NoLimitPrice),
            Some(price) if price <= 0 => return Err(OrderBookError::InvalidPrice(price)),
            Some(_) => {}
        }

        let side = order.side;
        self.side_mut(side).insert_order(order);
        Ok(())
    }

    /// Pure crossing predicate: a bid at `bid` and an ask at `ask` cross
    /// when `bid >= ask`. The matching loop exists to restore the resting
    /// state in which this is false.
    #[inline]
    pub fn is_crossed(bid: i64, ask: i64) -> bool {
        bid >= ask
    }

    /// True when the book is crossed at rest. Outside an in-flight match
    /// this indicates an internal bug.
    pub fn crossed_at_rest(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Self::is_crossed(bid, ask),
            _ => false,
        }
    }

    /// Returns the highest bid price with resting orders.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.best_price()
    }

    /// Returns the lowest ask price with resting orders.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.best_price()
    }

    /// Returns the spread between the best ask and best bid, or `None` when
    /// either side is empty.
    pub fn spread(&self) -> Option<i64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Returns the next order that would match on `side` (the head of the
    /// best level) without removing it.
    pub fn peek_best_order(&self, side: Side) -> Option<&Order> {
        self.side(side).best_level().and_then(|l| l.peek_front())
    }

    /// Aggregated quantity per price level, best price first, at most
    /// `levels` entries.
    pub fn depth(&self, side: Side, levels: usize) -> Vec<LevelDepth> {
        self.side(side).depth(levels)
    }

    /// Point-in-time aggregated view of both sides for depth-of-book
    /// publication.
    pub fn snapshot(&self, levels: usize) -> DepthSnapshot {
        DepthSnapshot::new(
            self.bids.depth(levels),
            self.asks.depth(levels),
            self.instrument_id,
        )
    }

    /// Total remaining volume at a specific price level, or `None` if no
    /// orders rest there.
    pub fn volume_at_price(&self, side: Side, price: i64) -> Option<u64> {
        self.side(side).level(price).map(|l| l.total_volume())
    }

    /// Number of orders resting at a specific price level.
    pub fn order_count_at_price(&self, side: Side, price: i64) -> usize {
        self.side(side).level(price).map_or(0, |l| l.order_count())
    }

    /// Returns the instrument ID this order book manages.
    pub fn instrument_id(&self) -> Uuid {
        self.instrument_id
    }
}

#[cfg(test)]
mod tests {
    //--------------------------------------------------------------------------------------------------
    // TEST MODULE OVERVIEW
    //--------------------------------------------------------------------------------------------------
    // Tests are organized into categories:
    //
    // 1. Basic Functionality
    //    - Empty book state
    //    - Single order operations
    //    - Multiple orders
    //
    // 2. Price Level Management
    //    - Multiple price levels
    //    - Volume tracking
    //    - Level removal on drain
    //
    // 3. FIFO Ordering
    //    - Queue order equals arrival order
    //    - In-place head fills keep queue position
    //
    // 4. Depth Views
    //    - Best-first ordering, level limits, no empty levels
    //--------------------------------------------------------------------------------------------------

    use super::*;
    use crate::types::TimeInForce;

    fn create_test_order(side: Side, price: i64, quantity: u64, instrument_id: Uuid) -> Order {
        Order::limit(
            Uuid::new_v4(),
            instrument_id,
            side,
            price,
            quantity,
            TimeInForce::Gtc,
        )
    }

    #[test]
    fn test_empty_orderbook() {
        let instrument_id = Uuid::new_v4();
        let book = OrderBook::new(instrument_id);

        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.volume_at_price(Side::Bid, 100_000), None);
        assert!(book.peek_best_order(Side::Ask).is_none());
        assert!(!book.crossed_at_rest());
    }

    #[test]
    fn test_single_order() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        let order = create_test_order(Side::Bid, 100_000, 100_000, instrument_id);
        book.insert_order(order).unwrap();

        assert_eq!(book.best_bid(), Some(100_000));
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.volume_at_price(Side::Bid, 100_000), Some(100_000));
    }

    #[test]
    fn test_multiple_orders_same_price() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        for _ in 0..5 {
            let order = create_test_order(Side::Bid, 100_000, 100_000, instrument_id);
            book.insert_order(order).unwrap();
        }

        assert_eq!(book.volume_at_price(Side::Bid, 100_000), Some(500_000));
        assert_eq!(book.order_count_at_price(Side::Bid, 100_000), 5);
        assert_eq!(book.side(Side::Bid).level_count(), 1);
    }

    #[test]
    fn test_best_price_per_side() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        for price in [100_000, 99_000, 101_000] {
            book.insert_order(create_test_order(Side::Bid, price, 100_000, instrument_id))
                .unwrap();
        }
        for price in [103_000, 104_000, 102_000] {
            book.insert_order(create_test_order(Side::Ask, price, 100_000, instrument_id))
                .unwrap();
        }

        assert_eq!(book.best_bid(), Some(101_000)); // highest bid
        assert_eq!(book.best_ask(), Some(102_000)); // lowest ask
        assert_eq!(book.spread(), Some(1_000));
    }

    #[test]
    fn test_wrong_instrument_rejected() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        let order = create_test_order(Side::Bid, 100_000, 100_000, Uuid::new_v4());
        let result = book.insert_order(order);

        assert!(matches!(
            result,
            Err(OrderBookError::WrongInstrument { .. })
        ));
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        let at_zero = create_test_order(Side::Bid, 0, 100_000, instrument_id);
        assert!(matches!(
            book.insert_order(at_zero),
            Err(OrderBookError::InvalidPrice(0))
        ));

        let negative = create_test_order(Side::Ask, -5, 100_000, instrument_id);
        assert!(matches!(
            book.insert_order(negative),
            Err(OrderBookError::InvalidPrice(-5))
        ));

        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_market_order_cannot_rest() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        let order = Order::market(Uuid::new_v4(), instrument_id, Side::Bid, 100_000);
        let result = book.insert_order(order);

        assert!(matches!(result, Err(OrderBookError::NoLimitPrice)));
    }

    #[test]
    fn test_fifo_order_within_level() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        let mut ids = Vec::new();
        for seq in 1..=3u64 {
            let mut order = create_test_order(Side::Bid, 100_000, 100_000, instrument_id);
            order.sequence = seq;
            ids.push(order.id);
            book.insert_order(order).unwrap();
        }

        let head = book.peek_best_order(Side::Bid).expect("expected a head order");
        assert_eq!(head.id, ids[0]);
        assert_eq!(head.sequence, 1);

        // Drain the head; the second arrival becomes the head.
        let level = book.side_mut(Side::Bid).best_level_mut().unwrap();
        level.fill_front(100_000);
        let popped = level.pop_front_if_filled().expect("head should pop when filled");
        assert_eq!(popped.id, ids[0]);

        let next = book.peek_best_order(Side::Bid).expect("expected a next head");
        assert_eq!(next.sequence, 2);
    }

    #[test]
    fn test_partial_fill_keeps_head_in_place() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        let first = create_test_order(Side::Ask, 100_000, 100_000, instrument_id);
        let first_id = first.id;
        book.insert_order(first).unwrap();
        book.insert_order(create_test_order(Side::Ask, 100_000, 50_000, instrument_id))
            .unwrap();

        let level = book.side_mut(Side::Ask).best_level_mut().unwrap();
        let after_fill = level.fill_front(40_000).expect("level has a head");
        assert_eq!(after_fill.id, first_id);
        assert_eq!(after_fill.remaining_base, 60_000);
        assert_eq!(after_fill.status, OrderStatus::PartiallyFilled);

        // Not filled, so nothing pops and the head keeps its position.
        assert!(level.pop_front_if_filled().is_none());
        let head = book.peek_best_order(Side::Ask).unwrap();
        assert_eq!(head.id, first_id);
        assert_eq!(book.volume_at_price(Side::Ask, 100_000), Some(110_000));
    }

    #[test]
    fn test_level_removed_when_drained() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        book.insert_order(create_test_order(Side::Bid, 100_000, 100_000, instrument_id))
            .unwrap();

        let side = book.side_mut(Side::Bid);
        let level = side.best_level_mut().unwrap();
        level.fill_front(100_000);
        level.pop_front_if_filled().unwrap();
        assert!(side.remove_level_if_empty(100_000));

        assert_eq!(book.best_bid(), None);
        assert_eq!(book.side(Side::Bid).level_count(), 0);
        assert_eq!(book.volume_at_price(Side::Bid, 100_000), None);
    }

    #[test]
    fn test_remove_level_if_empty_leaves_populated_level() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        book.insert_order(create_test_order(Side::Bid, 100_000, 100_000, instrument_id))
            .unwrap();

        assert!(!book.side_mut(Side::Bid).remove_level_if_empty(100_000));
        assert_eq!(book.best_bid(), Some(100_000));
    }

    #[test]
    fn test_is_crossed_predicate() {
        assert!(OrderBook::is_crossed(100, 100));
        assert!(OrderBook::is_crossed(101, 100));
        assert!(!OrderBook::is_crossed(99, 100));
    }

    #[test]
    fn test_depth_ordering_and_limit() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        for (price, quantity) in [(100_000, 200_000), (99_000, 300_000), (101_000, 100_000)] {
            book.insert_order(create_test_order(Side::Bid, price, quantity, instrument_id))
                .unwrap();
        }
        for price in [102_000, 103_000, 104_000, 105_000] {
            book.insert_order(create_test_order(Side::Ask, price, 50_000, instrument_id))
                .unwrap();
        }

        let bids = book.depth(Side::Bid, 10);
        assert_eq!(bids.len(), 3);
        assert_eq!(bids[0].price, 101_000); // best bid first
        assert_eq!(bids[1].price, 100_000);
        assert_eq!(bids[2].price, 99_000);
        assert_eq!(bids[1].volume, 200_000);

        let asks = book.depth(Side::Ask, 2);
        assert_eq!(asks.len(), 2); // limit respected
        assert_eq!(asks[0].price, 102_000); // best ask first
        assert_eq!(asks[1].price, 103_000);
    }

    #[test]
    fn test_depth_never_reports_empty_levels() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        book.insert_order(create_test_order(Side::Ask, 100_000, 100_000, instrument_id))
            .unwrap();
        book.insert_order(create_test_order(Side::Ask, 101_000, 100_000, instrument_id))
            .unwrap();

        // Drain the best level.
        let side = book.side_mut(Side::Ask);
        let level = side.best_level_mut().unwrap();
        level.fill_front(100_000);
        level.pop_front_if_filled().unwrap();
        side.remove_level_if_empty(100_000);

        let asks = book.depth(Side::Ask, 10);
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].price, 101_000);
        assert!(asks.iter().all(|l| l.volume > 0));
    }

    #[test]
    fn test_snapshot_reflects_both_sides() {
        let instrument_id = Uuid::new_v4();
        let mut book = OrderBook::new(instrument_id);

        book.insert_order(create_test_order(Side::Bid, 100_000, 100_000, instrument_id))
            .unwrap();
        book.insert_order(create_test_order(Side::Ask, 101_000, 200_000, instrument_id))
            .unwrap();

        let snapshot = book.snapshot(10);
        assert_eq!(snapshot.instrument_id, instrument_id);
        assert_eq!(snapshot.best_bid(), Some(100_000));
        assert_eq!(snapshot.best_ask(), Some(101_000));
        assert_eq!(snapshot.spread(), Some(1_000));
    }
}
