//! Market-maker phase detection.
//!
//! Turns a raw market snapshot into a `PhaseSignal`:
//! - Accumulation: heavy volume, flat price, large buyers
//! - WashOut: thin volume, volatile, falling price
//! - Markup: rising price on strong volume
//! - Distribution: heavy volume, flat price, large sellers

mod detector;
mod types;

pub use detector::{PhaseDetector, PhaseMetrics, PhaseRule};
pub use types::{MarketPhase, MarketSnapshot, PhaseSignal};
