//! FILENAME: engine/src/cell.rs
//! PURPOSE: The atomic unit of the spreadsheet — one of {Empty, Text, Formula},
//! plus the incoming/outgoing dependency edges used for cycle detection and
//! cache invalidation.
//! CONTEXT: Edges are stored as `Position` handles rather than references to
//! sibling cells, so a `Cell` never needs to borrow the `Sheet` that owns it —
//! see `sheet.rs` for the graph operations that walk these edges across cells.

use std::collections::HashSet;

use parser::{FormulaError, Position};
use serde::{Deserialize, Serialize};

use crate::formula::Formula;
use crate::sheet::Sheet;

/// The value a cell displays or computes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Error(FormulaError),
}

/// Which of the three variants a cell currently holds.
#[derive(Debug, Clone)]
pub(crate) enum CellImpl {
    Empty,
    /// Invariant: never the empty string. A leading `'` escapes what would
    /// otherwise look like a formula or number, and is stripped only when
    /// producing the cell's *value*, not its raw text.
    Text(String),
    Formula(Formula),
}

/// A single grid slot. Owns one `CellImpl`, plus the two edge sets that make
/// up the dependency graph: `incoming` (cells whose formulas reference this
/// one) and `outgoing` (cells this cell's formula references).
#[derive(Debug, Clone)]
pub struct Cell {
    impl_: CellImpl,
    pub(crate) incoming: HashSet<Position>,
    pub(crate) outgoing: HashSet<Position>,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            impl_: CellImpl::Empty,
            incoming: HashSet::new(),
            outgoing: HashSet::new(),
        }
    }

    /// Classifies `text` into the right impl and collects the positions a
    /// formula would reference. Does not touch any sheet state — the caller
    /// (`Sheet::set_cell`) owns cycle-checking, edge rewiring and commit.
    pub(crate) fn classify(text: &str) -> Result<(CellImpl, HashSet<Position>), parser::ParseError> {
        if text.is_empty() {
            Ok((CellImpl::Empty, HashSet::new()))
        } else if text.starts_with('=') && text.len() > 1 {
            let formula = Formula::parse(&text[1..])?;
            let refs: HashSet<Position> = formula.referenced_cells().into_iter().collect();
            Ok((CellImpl::Formula(formula), refs))
        } else {
            Ok((CellImpl::Text(text.to_string()), HashSet::new()))
        }
    }

    pub(crate) fn set_impl(&mut self, impl_: CellImpl, outgoing: HashSet<Position>) {
        self.impl_ = impl_;
        self.outgoing = outgoing;
    }

    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match &self.impl_ {
            CellImpl::Empty => CellValue::Empty,
            CellImpl::Text(s) => match s.strip_prefix('\'') {
                Some(rest) => CellValue::Text(rest.to_string()),
                None => CellValue::Text(s.clone()),
            },
            CellImpl::Formula(formula) => match formula.evaluate(sheet) {
                Ok(n) => CellValue::Number(n),
                Err(e) => CellValue::Error(e),
            },
        }
    }

    /// Raw source text: empty for Empty, verbatim for Text, `"=" + canonical
    /// form` for Formula.
    pub fn text(&self) -> String {
        match &self.impl_ {
            CellImpl::Empty => String::new(),
            CellImpl::Text(s) => s.clone(),
            CellImpl::Formula(formula) => format!("={}", formula.expression()),
        }
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        match &self.impl_ {
            CellImpl::Formula(formula) => formula.referenced_cells(),
            _ => Vec::new(),
        }
    }

    pub fn is_referenced(&self) -> bool {
        !self.incoming.is_empty()
    }

    /// Per the Empty/Text impls' "cache always valid" contract, only a
    /// Formula cell can ever be cache-invalid.
    pub(crate) fn is_cache_valid(&self) -> bool {
        match &self.impl_ {
            CellImpl::Formula(formula) => formula.is_cache_valid(),
            _ => true,
        }
    }

    pub(crate) fn invalidate_cache(&self) {
        if let CellImpl::Formula(formula) = &self.impl_ {
            formula.invalidate();
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}
