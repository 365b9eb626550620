//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell;
pub mod formula;
pub mod sheet;

pub use cell::{Cell, CellValue};
pub use formula::Formula;
pub use parser::{FormulaError, Position, Size};
pub use sheet::{Sheet, SheetError};
