//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the core matching engine logic for processing orders and generating
// trades. The engine follows strict price-time priority: better prices match first, and within a
// price level orders match in arrival order (FIFO, no pro-rata).
//
// Trades always execute at the resting order's price. One Trade is emitted per resting
// counterparty consumed; fills are never aggregated across counterparties.
//
// | Component                | Description                                                |
// |--------------------------|------------------------------------------------------------|
// | MatchingEngine           | Main engine for processing and matching orders             |
// | EngineError              | Error types specific to the matching process               |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Return Type      |
// |-------------------------|---------------------------------------------------|------------------|
// | submit                  | Process a new order against the book              | Result<Vec<Trade>>|
// | best_bid / best_ask     | Read-only top-of-book                             | Option<i64>      |
// | depth / snapshot        | Aggregated depth views                            | Vec / Snapshot   |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::depth::{DepthSnapshot, LevelDepth};
use crate::events::{EngineEvent, EventBus};
use crate::orderbook::{OrderBook, OrderBookError};
use crate::types::{Order, OrderStatus, OrderType, SequenceGenerator, Side, TimeInForce, Trade};

/// Number of price levels included in published book snapshots.
const SNAPSHOT_LEVELS: usize = 10;

/// Errors that can occur during the matching process.
///
/// Every variant except `InsufficientLiquidity` indicates a caller bug; all
/// are rejected at the boundary before any book mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The order quantity must be positive.
    #[error("Order quantity must be positive")]
    InvalidQuantity,

    /// Limit orders must carry a positive limit price.
    #[error("Limit orders require a positive limit price")]
    InvalidPrice,

    /// The order is for a different instrument than the engine is managing.
    #[error("Order instrument {got} does not match engine instrument {expected}")]
    WrongInstrument { expected: Uuid, got: Uuid },

    /// There is no liquidity at all to fill a market order.
    #[error("Insufficient liquidity to fill market order")]
    InsufficientLiquidity,

    /// An internal invariant was violated.
    #[error("Internal engine error: {0}")]
    Internal(String),
}

impl From<OrderBookError> for EngineError {
    fn from(err: OrderBookError) -> Self {
        // Book-layer rejections after boundary validation indicate a bug.
        Self::Internal(err.to_string())
    }
}

/// The core matching engine for a single instrument.
///
/// # Price-Time Priority
///
/// Orders are matched according to strict price-time priority rules:
///
/// * Better prices are matched first (higher bids, lower asks)
/// * At the same price level, orders are matched in chronological order (FIFO)
///
/// # Concurrency
///
/// The engine is deliberately single-threaded: submissions for one instrument
/// are strictly sequential, which is what makes determinism and time priority
/// possible. Run one engine per instrument on its own worker for parallelism
/// across instruments (see the worker module).
///
/// # Events
///
/// When constructed with an [`EventBus`], the engine publishes
/// [`EngineEvent`]s after each book mutation commits. Event publication never
/// blocks or fails the matching path.
#[derive(Debug)]
pub struct MatchingEngine {
    /// The order book for the instrument this engine is managing
    book: OrderBook,
    /// Monotonic arrival-order counter, stamped onto orders on acceptance
    sequencer: SequenceGenerator,
    /// Instrument ID this engine is managing
    instrument_id: Uuid,
    /// Optional bus for publishing post-commit events
    event_bus: Option<EventBus>,
}

impl MatchingEngine {
    /// Creates a new matching engine for a specific instrument, without
    /// event publication.
    pub fn new(instrument_id: Uuid) -> Self {
        Self {
            book: OrderBook::new(instrument_id),
            sequencer: SequenceGenerator::new(),
            instrument_id,
            event_bus: None,
        }
    }

    /// Creates a new matching engine that publishes events on `event_bus`.
    pub fn with_event_bus(instrument_id: Uuid, event_bus: EventBus) -> Self {
        Self {
            book: OrderBook::new(instrument_id),
            sequencer: SequenceGenerator::new(),
            instrument_id,
            event_bus: Some(event_bus),
        }
    }

    /// Processes a new order through the matching engine.
    ///
    /// The order is validated, stamped with an arrival sequence, matched
    /// against the opposite side of the book while it crosses, and its
    /// remainder rested (GTC) or cancelled (IOC / market).
    ///
    /// # Returns
    ///
    /// The trades generated by matching, in execution order. One trade per
    /// resting counterparty consumed, each at that counterparty's price. An
    /// empty vector means the order did not cross.
    ///
    /// # Errors
    ///
    /// * `InvalidQuantity` - the order has no quantity
    /// * `InvalidPrice` - a limit order without a positive price
    /// * `WrongInstrument` - the order belongs to a different instrument
    /// * `InsufficientLiquidity` - a market order found an empty opposite side
    ///
    /// Validation errors are returned before any book mutation.
    pub fn submit(&mut self, mut order: Order) -> Result<Vec<Trade>, EngineError> {
        self.validate(&order)?;

        // Market orders never carry a price bound and never rest, whatever
        // the caller set on the public fields.
        if order.order_type == OrderType::Market {
            order.limit_price = None;
            order.time_in_force = TimeInForce::Ioc;
        }

        order.sequence = self.sequencer.next();

        let trades = self.match_order(&mut order);

        let mut rested = false;
        let mut outcome = None;
        if order.remaining_base == 0 {
            order.status = OrderStatus::Filled;
            order.updated_at = Utc::now();
        } else {
            match order.time_in_force {
                TimeInForce::Gtc => {
                    order.status = if order.filled_base > 0 {
                        OrderStatus::PartiallyFilled
                    } else {
                        OrderStatus::Submitted
                    };
                    order.updated_at = Utc::now();
                    self.book.insert_order(order.clone())?;
                    debug!(
                        order_id = %order.id,
                        price = ?order.limit_price,
                        remaining = order.remaining_base,
                        "Order rested in book"
                    );
                    rested = true;
                    outcome = Some(EngineEvent::OrderRested {
                        order: order.clone(),
                        timestamp: Utc::now(),
                    });
                }
                TimeInForce::Ioc => {
                    if order.order_type == OrderType::Market && trades.is_empty() {
                        // Nothing traded and nothing rested: the book is
                        // untouched, so a plain error is safe.
                        return Err(EngineError::InsufficientLiquidity);
                    }
                    order.status = if order.filled_base > 0 {
                        OrderStatus::PartiallyFilledCancelled
                    } else {
                        OrderStatus::Cancelled
                    };
                    order.updated_at = Utc::now();
                    outcome = Some(EngineEvent::OrderCancelled {
                        order: order.clone(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        // Mutations are committed; publish in execution order: the trades
        // first, then the remainder's fate, then the resulting book shape.
        for trade in &trades {
            self.emit(EngineEvent::TradeExecuted {
                trade: trade.clone(),
                timestamp: Utc::now(),
            });
        }
        if let Some(event) = outcome {
            self.emit(event);
        }
        if !trades.is_empty() || rested {
            self.emit(EngineEvent::BookUpdated {
                snapshot: self.book.snapshot(SNAPSHOT_LEVELS),
                timestamp: Utc::now(),
            });
        }

        debug_assert!(!self.book.crossed_at_rest());
        Ok(trades)
    }

    /// Boundary validation. Rejections happen before any mutation.
    fn validate(&self, order: &Order) -> Result<(), EngineError> {
        if order.instrument_id != self.instrument_id {
            return Err(EngineError::WrongInstrument {
                expected: self.instrument_id,
                got: order.instrument_id,
            });
        }
        if order.base_amount == 0 || order.remaining_base == 0 {
            return Err(EngineError::InvalidQuantity);
        }
        if order.order_type == OrderType::Limit {
            match order.limit_price {
                Some(price) if price > 0 => {}
                _ => return Err(EngineError::InvalidPrice),
            }
        }
        Ok(())
    }

    /// Core matching loop: consumes resting liquidity while the incoming
    /// order crosses the opposite side.
    ///
    /// The best opposing level is re-fetched after every single-order match;
    /// the loop never iterates a stale view of the book. Resting orders are
    /// filled in place at the head of their queue, so a partial fill keeps
    /// its time priority.
    fn match_order(&mut self, order: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        let opposite = order.side.opposite();

        while order.remaining_base > 0 {
            let side = self.book.side_mut(opposite);
            let Some(level) = side.best_level_mut() else {
                break;
            };
            let level_price = level.price();

            // Market orders skip the price bound.
            if let Some(limit) = order.limit_price {
                if !order.side.crosses(limit, level_price) {
                    break;
                }
            }

            let Some(resting) = level.peek_front() else {
                // Empty levels are removed on drain; reaching one is a bug.
                debug_assert!(false, "empty level in book index");
                break;
            };
            let maker_id = resting.id;
            let traded = order.remaining_base.min(resting.remaining_base);

            let maker = match level.fill_front(traded) {
                Some(maker) => maker,
                None => break,
            };
            order.remaining_base -= traded;
            order.filled_base += traded;

            if maker.is_filled() {
                level.pop_front_if_filled();
                side.remove_level_if_empty(level_price);
            }

            trades.push(Trade {
                id: Uuid::new_v4(),
                instrument_id: self.instrument_id,
                maker_order_id: maker_id,
                taker_order_id: order.id,
                price: level_price,
                base_amount: traded,
                quote_amount: traded.saturating_mul(level_price as u64),
                executed_at: Utc::now(),
            });
        }

        trades
    }

    /// Publishes an event if a bus is attached. Failures are logged, never
    /// propagated: the book mutation has already committed.
    fn emit(&self, event: EngineEvent) {
        if let Some(bus) = &self.event_bus {
            if let Err(e) = bus.publish(event) {
                warn!("Failed to publish engine event: {}", e);
            }
        }
    }

    /// Returns the highest resting bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.book.best_bid()
    }

    /// Returns the lowest resting ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.book.best_ask()
    }

    /// Aggregated depth for one side, best price first.
    pub fn depth(&self, side: Side, levels: usize) -> Vec<LevelDepth> {
        self.book.depth(side, levels)
    }

    /// Point-in-time aggregated view of both sides.
    pub fn snapshot(&self, levels: usize) -> DepthSnapshot {
        self.book.snapshot(levels)
    }

    /// Read-only access to the underlying book.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Returns the instrument ID this engine is managing.
    pub fn instrument_id(&self) -> Uuid {
        self.instrument_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(side: Side, price: i64, quantity: u64, instrument_id: Uuid) -> Order {
        Order::limit(
            Uuid::new_v4(),
            instrument_id,
            side,
            price,
            quantity,
            TimeInForce::Gtc,
        )
    }

    fn engine() -> (MatchingEngine, Uuid) {
        let instrument_id = Uuid::new_v4();
        (MatchingEngine::new(instrument_id), instrument_id)
    }

    #[test]
    fn test_rejects_zero_quantity() {
        let (mut engine, instrument_id) = engine();
        let order = limit(Side::Bid, 100_000, 0, instrument_id);
        assert_eq!(engine.submit(order), Err(EngineError::InvalidQuantity));
    }

    #[test]
    fn test_rejects_non_positive_limit_price() {
        let (mut engine, instrument_id) = engine();
        let order = limit(Side::Bid, 0, 100_000, instrument_id);
        assert_eq!(engine.submit(order), Err(EngineError::InvalidPrice));

        let order = limit(Side::Ask, -5, 100_000, instrument_id);
        assert_eq!(engine.submit(order), Err(EngineError::InvalidPrice));
    }

    #[test]
    fn test_rejects_wrong_instrument_without_mutation() {
        let (mut engine, _) = engine();
        let order = limit(Side::Bid, 100_000, 100_000, Uuid::new_v4());
        assert!(matches!(
            engine.submit(order),
            Err(EngineError::WrongInstrument { .. })
        ));
        assert_eq!(engine.best_bid(), None);
    }

    #[test]
    fn test_non_crossing_order_rests() {
        let (mut engine, instrument_id) = engine();

        let trades = engine
            .submit(limit(Side::Bid, 99_000, 100_000, instrument_id))
            .unwrap();
        assert!(trades.is_empty());

        let trades = engine
            .submit(limit(Side::Ask, 101_000, 100_000, instrument_id))
            .unwrap();
        assert!(trades.is_empty());

        assert_eq!(engine.best_bid(), Some(99_000));
        assert_eq!(engine.best_ask(), Some(101_000));
    }

    #[test]
    fn test_exact_cross_trades_at_resting_price() {
        let (mut engine, instrument_id) = engine();

        let ask = limit(Side::Ask, 100_000, 100_000, instrument_id);
        let ask_id = ask.id;
        engine.submit(ask).unwrap();

        let bid = limit(Side::Bid, 100_500, 100_000, instrument_id);
        let bid_id = bid.id;
        let trades = engine.submit(bid).unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 100_000); // resting order's price
        assert_eq!(trades[0].base_amount, 100_000);
        assert_eq!(trades[0].maker_order_id, ask_id);
        assert_eq!(trades[0].taker_order_id, bid_id);

        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_one_trade_per_counterparty() {
        let (mut engine, instrument_id) = engine();

        engine
            .submit(limit(Side::Ask, 100_000, 30_000, instrument_id))
            .unwrap();
        engine
            .submit(limit(Side::Ask, 100_000, 30_000, instrument_id))
            .unwrap();
        engine
            .submit(limit(Side::Ask, 100_000, 30_000, instrument_id))
            .unwrap();

        let trades = engine
            .submit(limit(Side::Bid, 100_000, 90_000, instrument_id))
            .unwrap();

        // Never aggregated, even at one price.
        assert_eq!(trades.len(), 3);
        assert!(trades.iter().all(|t| t.base_amount == 30_000));
    }

    #[test]
    fn test_gtc_remainder_rests_at_limit() {
        let (mut engine, instrument_id) = engine();

        engine
            .submit(limit(Side::Ask, 100_000, 40_000, instrument_id))
            .unwrap();

        let trades = engine
            .submit(limit(Side::Bid, 100_000, 100_000, instrument_id))
            .unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].base_amount, 40_000);

        // Remainder rests on the bid side at its own limit.
        assert_eq!(engine.best_bid(), Some(100_000));
        assert_eq!(
            engine.book().volume_at_price(Side::Bid, 100_000),
            Some(60_000)
        );
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_ioc_remainder_is_cancelled() {
        let (mut engine, instrument_id) = engine();

        engine
            .submit(limit(Side::Ask, 100_000, 40_000, instrument_id))
            .unwrap();

        let ioc = Order::limit(
            Uuid::new_v4(),
            instrument_id,
            Side::Bid,
            100_000,
            100_000,
            TimeInForce::Ioc,
        );
        let trades = engine.submit(ioc).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].base_amount, 40_000);

        // Nothing rests.
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_unmatched_ioc_cancels_without_resting() {
        let (mut engine, instrument_id) = engine();

        let ioc = Order::limit(
            Uuid::new_v4(),
            instrument_id,
            Side::Bid,
            99_000,
            100_000,
            TimeInForce::Ioc,
        );
        let trades = engine.submit(ioc).unwrap();
        assert!(trades.is_empty());
        assert_eq!(engine.best_bid(), None);
    }

    #[test]
    fn test_market_order_walks_levels() {
        let (mut engine, instrument_id) = engine();

        engine
            .submit(limit(Side::Ask, 100_000, 30_000, instrument_id))
            .unwrap();
        engine
            .submit(limit(Side::Ask, 101_000, 30_000, instrument_id))
            .unwrap();

        let market = Order::market(Uuid::new_v4(), instrument_id, Side::Bid, 50_000);
        let trades = engine.submit(market).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, 100_000);
        assert_eq!(trades[0].base_amount, 30_000);
        assert_eq!(trades[1].price, 101_000);
        assert_eq!(trades[1].base_amount, 20_000);

        assert_eq!(
            engine.book().volume_at_price(Side::Ask, 101_000),
            Some(10_000)
        );
    }

    #[test]
    fn test_market_order_against_empty_book_errors() {
        let (mut engine, instrument_id) = engine();
        let market = Order::market(Uuid::new_v4(), instrument_id, Side::Bid, 50_000);
        assert_eq!(
            engine.submit(market),
            Err(EngineError::InsufficientLiquidity)
        );
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_market_partial_fill_cancels_remainder() {
        let (mut engine, instrument_id) = engine();

        engine
            .submit(limit(Side::Bid, 100_000, 30_000, instrument_id))
            .unwrap();

        let market = Order::market(Uuid::new_v4(), instrument_id, Side::Ask, 50_000);
        let trades = engine.submit(market).unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].base_amount, 30_000);
        // The unfilled 20_000 is dropped, never rested.
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_market_order_with_forced_gtc_never_rests() {
        let (mut engine, instrument_id) = engine();

        engine
            .submit(limit(Side::Ask, 100_000, 5_000, instrument_id))
            .unwrap();

        // All Order fields are public; a caller can hand-build a market
        // order flagged GTC. The engine must treat it as IOC: fill what it
        // can, cancel the rest, and report the trades.
        let mut market = Order::market(Uuid::new_v4(), instrument_id, Side::Bid, 8_000);
        market.time_in_force = TimeInForce::Gtc;

        let trades = engine.submit(market).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].base_amount, 5_000);
        assert_eq!(trades[0].price, 100_000);

        // The unfilled 3_000 is cancelled, never rested.
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_sequence_assigned_in_submission_order() {
        let (mut engine, instrument_id) = engine();

        engine
            .submit(limit(Side::Bid, 99_000, 10_000, instrument_id))
            .unwrap();
        engine
            .submit(limit(Side::Bid, 98_000, 10_000, instrument_id))
            .unwrap();

        let first = engine
            .book()
            .peek_best_order(Side::Bid)
            .expect("best bid resting");
        assert_eq!(first.sequence, 1);
    }

    #[tokio::test]
    async fn test_events_published_after_commit() {
        let instrument_id = Uuid::new_v4();
        let bus = EventBus::new(64);
        let mut receiver = bus.subscribe();
        let mut engine = MatchingEngine::with_event_bus(instrument_id, bus);

        engine
            .submit(limit(Side::Ask, 100_000, 50_000, instrument_id))
            .unwrap();
        engine
            .submit(limit(Side::Bid, 100_000, 50_000, instrument_id))
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            kinds.push(event.kind());
        }
        assert!(kinds.contains(&"OrderRested"));
        assert!(kinds.contains(&"TradeExecuted"));
        assert!(kinds.contains(&"BookUpdated"));
    }

    #[tokio::test]
    async fn test_event_stream_follows_execution_order() {
        let instrument_id = Uuid::new_v4();
        let bus = EventBus::new(64);
        let mut receiver = bus.subscribe();
        let mut engine = MatchingEngine::with_event_bus(instrument_id, bus);

        engine
            .submit(limit(Side::Ask, 100_000, 50_000, instrument_id))
            .unwrap();
        while receiver.try_recv().is_ok() {}

        // Partially crossing bid: one trade, then the remainder rests.
        engine
            .submit(limit(Side::Bid, 100_000, 80_000, instrument_id))
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(kinds, vec!["TradeExecuted", "OrderRested", "BookUpdated"]);
    }
}
