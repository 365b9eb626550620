//! FILENAME: parser/src/formula_error.rs
//! PURPOSE: The error categories a formula can evaluate to.
//! CONTEXT: These surface as a cell's displayed value (`CellValue::Error`)
//! rather than aborting evaluation — a formula referencing a broken cell
//! propagates that cell's error rather than producing its own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three ways a formula can fail to produce a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaError {
    /// A cell reference is out of bounds or otherwise malformed.
    Ref,
    /// A referenced cell's text can't be interpreted as a number.
    Value,
    /// An arithmetic operation produced a non-finite result (e.g. division by zero).
    Div0,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#ARITHM!",
        };
        write!(f, "{}", text)
    }
}

impl std::error::Error for FormulaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_canonical_text() {
        assert_eq!(FormulaError::Ref.to_string(), "#REF!");
        assert_eq!(FormulaError::Value.to_string(), "#VALUE!");
        assert_eq!(FormulaError::Div0.to_string(), "#ARITHM!");
    }
}
