//! Flash chip types and database
//!
//! This module provides the static table of supported SPI NOR chips and
//! the geometry derived from a table row at detection time.

mod table;
mod types;

pub use table::*;
pub use types::*;
