//! Event layer for the matching engine.
//!
//! The engine publishes [`EngineEvent`]s on an [`EventBus`] after each book
//! mutation commits; an [`EventDispatcher`] fans them out to registered
//! [`EventHandler`]s asynchronously. The matching path never waits on a
//! handler.

mod dispatcher;
mod event_bus;
mod event_types;
mod handlers;

pub use dispatcher::EventDispatcher;
pub use event_bus::EventBus;
pub use event_types::{EngineEvent, EventError, EventResult};
pub use handlers::{EventHandler, EventLogger};
