//! Input/output helpers.
//!
//! - spreadsheet ingest + validation (`ingest`)
//! - forecast exports (xlsx/CSV) (`export`)
//! - forecast bundle JSON read/write (`bundle`)

pub mod bundle;
pub mod export;
pub mod ingest;

pub use bundle::*;
pub use export::*;
pub use ingest::*;
