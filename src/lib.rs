// Expose the modules
pub mod config;
pub mod depth;
pub mod engine;
pub mod events;
pub mod orderbook;
pub mod types;
pub mod worker;

// Re-export key types for easier usage
pub use depth::{DepthSnapshot, LevelDepth};
pub use engine::{EngineError, MatchingEngine};
pub use events::{
    EngineEvent, EventBus, EventDispatcher, EventError, EventHandler, EventLogger, EventResult,
};
pub use orderbook::{BookSide, OrderBook, OrderBookError, PriceLevel};
pub use types::{Order, OrderStatus, OrderType, Side, Trade, TimeInForce};
pub use worker::{EngineClient, EngineWorker};
