//! Seasonal ARIMA model evaluation.
//!
//! Everything here is a pure function of coefficients and data so the
//! fitting and forecasting code can stay generic over the order.

pub mod sarima;

pub use sarima::*;
