//! Streaming microstructure indicators.
//!
//! Stateful calculators with O(1) amortized updates, built to sit directly
//! behind a ring-buffer consumer: no allocation per tick, no shared state,
//! one instance per strategy. Every calculator exposes `reset()` back to its
//! configured initial state.

pub mod bbo;
pub mod error;
pub mod hawkes;
pub mod ofi;
pub mod vpin;

pub use bbo::{BboState, Level};
pub use error::IndicatorError;
pub use hawkes::{HawkesIntensity, MultivariateHawkes};
pub use ofi::OfiCalculator;
pub use vpin::{bulk_volume_split, VpinCalculator};
