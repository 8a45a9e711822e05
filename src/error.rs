//! Error types for the position building and protection engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the engine.
///
/// Missing plans and "nothing to do" results are not errors; they surface as
/// `None` from the relevant operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A phase signal was built with a confidence outside [0, 1]
    #[error("Confidence out of range [0, 1]: {0}")]
    InvalidConfidence(Decimal),

    /// A batch was reported that is not the plan's next batch
    #[error("Batch out of sequence for {symbol}: expected {expected}, received {received}")]
    BatchOutOfSequence {
        symbol: String,
        expected: usize,
        received: usize,
    },

    /// A batch split from one symbol's plan was reported against another
    #[error("Batch for {received} reported against plan for {expected}")]
    SymbolMismatch { expected: String, received: String },

    /// An executed size below zero was reported
    #[error("Negative executed size for {symbol}: {size}")]
    NegativeSize { symbol: String, size: Decimal },

    /// Every batch of the plan has already been recorded
    #[error("Plan for {symbol} has no batches left to record")]
    PlanExhausted { symbol: String },

    /// A paused plan could not be resumed
    #[error("Cannot resume plan for {symbol}: {reason}")]
    InvalidResume { symbol: String, reason: String },

    /// The outbound risk coordinator rejected a request
    #[error("Risk coordinator error: {0}")]
    Coordinator(String),

    /// Plan storage failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Plan (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
