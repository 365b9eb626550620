//! FILENAME: engine/src/formula.rs
//! PURPOSE: The stateful facade around a parsed formula — owns the
//! evaluation cache and knows how to reach a `Sheet` to resolve cell refs.
//! CONTEXT: `parser::FormulaAst` is sheet-agnostic; this is the layer that
//! builds the resolver closure and enforces "evaluate at most once per
//! cache miss".

use std::cell::RefCell;

use parser::{parse_formula_ast, FormulaAst, FormulaError, ParseError, Position};

use crate::cell::CellValue;
use crate::sheet::Sheet;

#[derive(Debug, Clone)]
pub struct Formula {
    ast: FormulaAst,
    cache: RefCell<Option<Result<f64, FormulaError>>>,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let ast = parse_formula_ast(source)?;
        Ok(Formula {
            ast,
            cache: RefCell::new(None),
        })
    }

    /// Returns the cached result if valid, otherwise evaluates the AST
    /// exactly once against `sheet` and caches the outcome before returning it.
    pub fn evaluate(&self, sheet: &Sheet) -> Result<f64, FormulaError> {
        if let Some(cached) = self.cache.borrow().as_ref() {
            return cached.clone();
        }

        let resolver = |pos: Position| -> Result<f64, FormulaError> {
            if !pos.is_valid() {
                return Err(FormulaError::Ref);
            }
            match sheet.get_cell(pos) {
                None => Ok(0.0),
                Some(cell) => match cell.value(sheet) {
                    CellValue::Number(n) => Ok(n),
                    CellValue::Text(s) if s.is_empty() => Ok(0.0),
                    // Leading whitespace is skipped (matching C++'s default
                    // `skipws` on `istringstream >> result`), but anything
                    // left over after the number — including trailing
                    // whitespace — is rejected, matching the `!in.eof()` check.
                    CellValue::Text(s) => s.trim_start().parse::<f64>().map_err(|_| FormulaError::Value),
                    CellValue::Empty => Ok(0.0),
                    CellValue::Error(e) => Err(e),
                },
            }
        };

        let result = self.ast.evaluate(&resolver);
        *self.cache.borrow_mut() = Some(result.clone());
        result
    }

    pub fn expression(&self) -> String {
        self.ast.print_formula()
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        self.ast.referenced_cells()
    }

    pub fn is_cache_valid(&self) -> bool {
        self.cache.borrow().is_some()
    }

    pub fn invalidate(&self) {
        *self.cache.borrow_mut() = None;
    }
}
