//! Chart rendering.
//!
//! - fixed-size terminal plots (`ascii`)
//! - SVG files via plotters (`svg`)

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
