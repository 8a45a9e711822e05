//! Outbound signalling to an external risk coordinator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::protector::Urgency;
use crate::error::{EngineError, Result};

/// Request for the coordinator to switch a symbol into exit mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitModeRequest {
    pub symbol: String,
    pub urgency: Urgency,
    pub reduce_ratio: Decimal,
    pub reason: String,
}

/// External collaborator notified of escalating protection decisions.
///
/// Implementations must not block; the protector treats every call as
/// fire-and-forget.
#[cfg_attr(test, mockall::automock)]
pub trait RiskCoordinator: Send + Sync {
    fn enter_exit_mode(&self, request: ExitModeRequest) -> Result<()>;
}

/// Forwards exit-mode requests over a bounded channel without waiting.
#[derive(Debug, Clone)]
pub struct ChannelCoordinator {
    tx: mpsc::Sender<ExitModeRequest>,
}

impl ChannelCoordinator {
    /// Create the coordinator and the receiving end for the consumer.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ExitModeRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl RiskCoordinator for ChannelCoordinator {
    fn enter_exit_mode(&self, request: ExitModeRequest) -> Result<()> {
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(req) => {
                EngineError::Coordinator(format!("channel full, dropped request for {}", req.symbol))
            }
            TrySendError::Closed(req) => {
                EngineError::Coordinator(format!("channel closed, dropped request for {}", req.symbol))
            }
        })
    }
}
