//! # Phase Follower
//!
//! Phase-adaptive position building and protection.
//!
//! ## Architecture
//!
//! - `phase`: Market phase classification from volume, price and order flow
//! - `execution`: Batched acquisition plans, stealth splitting and plan storage
//! - `risk`: Distribution-driven position protection and exit plans
//! - `persistence`: SQLite-backed plan storage
//! - `config`: Configuration management and validation
//! - `error`: Engine error type
//! - `utils`: Shared decimal helpers

pub mod config;
pub mod error;
pub mod execution;
pub mod persistence;
pub mod phase;
pub mod risk;
pub mod utils;

pub use config::Config;
pub use error::{EngineError, Result};
pub use execution::PositionBuilder;
pub use phase::PhaseDetector;
pub use risk::PositionProtector;
