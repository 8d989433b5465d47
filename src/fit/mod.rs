//! Model fitting orchestration.
//!
//! Responsibilities:
//!
//! - generate deterministic start points (grid + Hannan-Rissanen)
//! - evaluate each start's CSS (parallel)
//! - refine the best start with Nelder-Mead

pub mod fitter;
pub mod starts;

pub use fitter::*;
pub use starts::*;
