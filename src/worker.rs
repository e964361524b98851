//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Single-writer concurrency model for the matching engine. One worker thread
// owns an engine exclusively; orders arrive over an ordered mpsc channel, so
// submission order equals processing order, and replies flow back on oneshot
// channels. Cross-instrument parallelism is independent workers sharing no
// state.
//
// | Component           | Description                                                 |
// |---------------------|-------------------------------------------------------------|
// | EngineWorker        | Worker thread owning a MatchingEngine                       |
// | EngineClient        | Cloneable async client interface to the worker              |
// | EngineCommand       | Commands sent to the worker                                 |
//
//--------------------------------------------------------------------------------------------------
// ENUMS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Variants            |
// |--------------------|---------------------------------------------------|---------------------|
// | EngineCommand      | Commands sent to worker                           | Submit              |
// |                    |                                                   | BestBid, BestAsk    |
// |                    |                                                   | GetDepth, Snapshot  |
// |                    |                                                   | Shutdown            |
//--------------------------------------------------------------------------------------------------

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tracing::{error, info};
use uuid::Uuid;

use crate::depth::{DepthSnapshot, LevelDepth};
use crate::engine::{EngineError, MatchingEngine};
use crate::events::EventBus;
use crate::types::{Order, Side, Trade};

/// Commands that can be sent to the EngineWorker.
#[derive(Debug)]
enum EngineCommand {
    /// Submit an order for matching
    Submit {
        order: Order,
        response_tx: oneshot::Sender<Result<Vec<Trade>, EngineError>>,
    },

    /// Get the best bid price
    BestBid {
        response_tx: oneshot::Sender<Option<i64>>,
    },

    /// Get the best ask price
    BestAsk {
        response_tx: oneshot::Sender<Option<i64>>,
    },

    /// Get aggregated depth for one side
    GetDepth {
        side: Side,
        limit: usize,
        response_tx: oneshot::Sender<Vec<LevelDepth>>,
    },

    /// Get a two-sided depth snapshot
    GetSnapshot {
        limit: usize,
        response_tx: oneshot::Sender<DepthSnapshot>,
    },

    /// Shut down the worker thread
    Shutdown,
}

/// Worker thread that exclusively owns a matching engine.
///
/// The engine never crosses a thread boundary; only commands and replies do.
/// Because the command channel is ordered and the worker processes one
/// command at a time, the matching loop never blocks or awaits mid-match.
pub struct EngineWorker {
    engine: MatchingEngine,
}

impl EngineWorker {
    /// Creates a worker around a fresh engine for `instrument_id`.
    pub fn new(instrument_id: Uuid) -> Self {
        Self {
            engine: MatchingEngine::new(instrument_id),
        }
    }

    /// Creates a worker whose engine publishes events on `event_bus`.
    pub fn with_event_bus(instrument_id: Uuid, event_bus: EventBus) -> Self {
        Self {
            engine: MatchingEngine::with_event_bus(instrument_id, event_bus),
        }
    }

    /// Starts the worker thread and returns a client to interact with it.
    ///
    /// # Returns
    /// A cloneable client plus the thread handle for joining on shutdown.
    pub fn start(mut self) -> (EngineClient, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(1024);
        let client = EngineClient::new(command_tx);

        let handle = thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for EngineWorker");

            rt.block_on(self.run(command_rx));
        });

        (client, handle)
    }

    /// Main worker loop: processes commands in arrival order until shutdown
    /// or until every client is dropped.
    async fn run(&mut self, mut rx: Receiver<EngineCommand>) {
        info!(
            instrument_id = %self.engine.instrument_id(),
            "Engine worker started"
        );

        while let Some(cmd) = rx.recv().await {
            match cmd {
                EngineCommand::Shutdown => break,
                cmd => self.handle_command(cmd),
            }
        }

        info!(
            instrument_id = %self.engine.instrument_id(),
            "Engine worker stopped"
        );
    }

    /// Processes a single command. Reply failures mean the caller gave up
    /// waiting; the book state is already consistent either way.
    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Submit { order, response_tx } => {
                let result = self.engine.submit(order);
                if let Err(e) = &result {
                    error!("Order submission failed: {}", e);
                }
                let _ = response_tx.send(result);
            }

            EngineCommand::BestBid { response_tx } => {
                let _ = response_tx.send(self.engine.best_bid());
            }

            EngineCommand::BestAsk { response_tx } => {
                let _ = response_tx.send(self.engine.best_ask());
            }

            EngineCommand::GetDepth {
                side,
                limit,
                response_tx,
            } => {
                let _ = response_tx.send(self.engine.depth(side, limit));
            }

            EngineCommand::GetSnapshot { limit, response_tx } => {
                let _ = response_tx.send(self.engine.snapshot(limit));
            }

            EngineCommand::Shutdown => {
                // Handled in the run loop
            }
        }
    }
}

/// Client interface to interact with an EngineWorker.
///
/// Cheap to clone; every clone feeds the same ordered command channel, so
/// submissions from all clients are serialized in arrival order.
#[derive(Debug, Clone)]
pub struct EngineClient {
    command_tx: Sender<EngineCommand>,
}

impl EngineClient {
    fn new(command_tx: Sender<EngineCommand>) -> Self {
        Self { command_tx }
    }

    /// Submits an order for matching.
    ///
    /// # Returns
    /// The trades generated, in execution order, or the engine's rejection.
    pub async fn submit(&self, order: Order) -> Result<Vec<Trade>, EngineError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(EngineCommand::Submit { order, response_tx })
            .await
            .map_err(|_| EngineError::Internal("EngineWorker channel closed".to_string()))?;

        response_rx
            .await
            .map_err(|_| EngineError::Internal("EngineWorker reply dropped".to_string()))?
    }

    /// Gets the best bid price, if any orders rest on the bid side.
    pub async fn best_bid(&self) -> Result<Option<i64>, EngineError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(EngineCommand::BestBid { response_tx })
            .await
            .map_err(|_| EngineError::Internal("EngineWorker channel closed".to_string()))?;

        response_rx
            .await
            .map_err(|_| EngineError::Internal("EngineWorker reply dropped".to_string()))
    }

    /// Gets the best ask price, if any orders rest on the ask side.
    pub async fn best_ask(&self) -> Result<Option<i64>, EngineError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(EngineCommand::BestAsk { response_tx })
            .await
            .map_err(|_| EngineError::Internal("EngineWorker channel closed".to_string()))?;

        response_rx
            .await
            .map_err(|_| EngineError::Internal("EngineWorker reply dropped".to_string()))
    }

    /// Gets aggregated depth for one side, best price first.
    pub async fn depth(&self, side: Side, limit: usize) -> Result<Vec<LevelDepth>, EngineError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(EngineCommand::GetDepth {
                side,
                limit,
                response_tx,
            })
            .await
            .map_err(|_| EngineError::Internal("EngineWorker channel closed".to_string()))?;

        response_rx
            .await
            .map_err(|_| EngineError::Internal("EngineWorker reply dropped".to_string()))
    }

    /// Gets a two-sided depth snapshot.
    pub async fn snapshot(&self, limit: usize) -> Result<DepthSnapshot, EngineError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(EngineCommand::GetSnapshot { limit, response_tx })
            .await
            .map_err(|_| EngineError::Internal("EngineWorker channel closed".to_string()))?;

        response_rx
            .await
            .map_err(|_| EngineError::Internal("EngineWorker reply dropped".to_string()))
    }

    /// Shuts down the worker thread.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.command_tx
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| EngineError::Internal("EngineWorker channel closed".to_string()))
    }
}
