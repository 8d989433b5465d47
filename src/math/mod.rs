//! Mathematical utilities: least squares and derivative-free minimization.

pub mod ols;
pub mod optim;

pub use ols::*;
pub use optim::*;
