//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the loaded input (`Series`, `Dataset`)
//! - the forecast request (`Horizon`, `TrailingPoint`, `SarimaOrder`)
//! - forecast outputs (`ForecastResult`, `ForecastBundle`, `BatchResult`, etc.)
//! - month-end calendar helpers (`calendar`)

pub mod calendar;
pub mod types;

pub use calendar::*;
pub use types::*;
