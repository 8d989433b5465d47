//! Per-series forecasting and batch assembly.
//!
//! - `engine`: validate, fit, forecast and post-process one series
//! - `batch`: drive the engine over a dataset, one outcome per variable
//! - `assemble`: fold outcomes into a `BatchResult`

pub mod assemble;
pub mod batch;
pub mod engine;

pub use assemble::*;
pub use batch::*;
pub use engine::*;
