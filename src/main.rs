use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use matchbook::config::Config;
use matchbook::events::{EngineEvent, EventBus, EventDispatcher, EventHandler, EventResult};
use matchbook::types::{Order, Side, TimeInForce};
use matchbook::worker::EngineWorker;

/// Simple event handler that prints events to the console.
struct ConsoleEventHandler;

#[async_trait::async_trait]
impl EventHandler for ConsoleEventHandler {
    fn event_types(&self) -> Vec<&'static str> {
        vec![
            "TradeExecuted",
            "OrderRested",
            "OrderCancelled",
            "BookUpdated",
        ]
    }

    async fn handle_event(&self, event: EngineEvent) -> EventResult<()> {
        match &event {
            EngineEvent::OrderRested { order, timestamp } => {
                println!(
                    "[{}] Order rested: {} {} at {:?}",
                    timestamp,
                    match order.side {
                        Side::Bid => "BUY",
                        Side::Ask => "SELL",
                    },
                    order.remaining_base,
                    order.limit_price
                );
            }
            EngineEvent::TradeExecuted { trade, timestamp } => {
                println!(
                    "[{}] Trade executed: {} @ {}",
                    timestamp, trade.base_amount, trade.price
                );
            }
            EngineEvent::BookUpdated { snapshot, .. } => {
                if let Ok(json) = serde_json::to_string(snapshot) {
                    println!("Book: {}", json);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Creates a demo limit order with prices and quantities in minor/base units
/// (6 decimal places).
fn demo_order(side: Side, price: f64, qty: f64, instrument_id: Uuid) -> Order {
    let price_i64 = (price * 1_000_000.0) as i64;
    let qty_u64 = (qty * 1_000_000.0) as u64;
    Order::limit(
        Uuid::new_v4(),
        instrument_id,
        side,
        price_i64,
        qty_u64,
        TimeInForce::Gtc,
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    info!(instrument_id = %config.instrument_id, "Starting matching engine demo");

    // Set up the event system
    let event_bus = EventBus::new(config.event_capacity);
    let dispatcher = EventDispatcher::new(event_bus.clone());
    dispatcher.register_handler(Arc::new(ConsoleEventHandler)).await;
    let _dispatcher_handle = dispatcher.start().await;

    // Start the engine on its own worker thread
    let worker = EngineWorker::with_event_bus(config.instrument_id, event_bus);
    let (client, worker_handle) = worker.start();

    // Seed a resting ask, a non-crossing bid and a crossing bid
    let sell = demo_order(Side::Ask, 100.0, 1.0, config.instrument_id);
    client.submit(sell).await.expect("submit failed");

    let buy_below = demo_order(Side::Bid, 99.0, 1.0, config.instrument_id);
    client.submit(buy_below).await.expect("submit failed");

    let buy_crossing = demo_order(Side::Bid, 100.0, 0.5, config.instrument_id);
    let trades = client.submit(buy_crossing).await.expect("submit failed");
    println!("Crossing order produced {} trade(s)", trades.len());

    // Print the resulting depth
    let snapshot = client
        .snapshot(config.depth_levels)
        .await
        .expect("snapshot failed");
    println!("Best bid: {:?}", snapshot.best_bid());
    println!("Best ask: {:?}", snapshot.best_ask());
    println!("Spread: {:?}", snapshot.spread());

    // Allow events to drain, then shut down
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    client.shutdown().await.expect("shutdown failed");
    let _ = worker_handle.join();
}
