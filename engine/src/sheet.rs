//! FILENAME: engine/src/sheet.rs
//! PURPOSE: The sparse grid of cells — dispatches set/get/clear, performs
//! cycle detection and cache invalidation across the cell graph, and
//! computes printable bounds.
//! CONTEXT: Cells only ever hold `Position` handles to their neighbors, so
//! every operation that needs to reach more than one cell at once — cycle
//! detection, recursive invalidation, edge rewiring — lives here rather than
//! on `Cell` itself, since only `Sheet` owns the map both ends of an edge
//! live in.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};

use parser::{ParseError, Position, Size};

use crate::cell::{Cell, CellImpl};

/// Everything that can go wrong calling into a `Sheet`.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// The position passed to an API call is out of range or the `NONE` sentinel.
    InvalidPosition,
    /// Text began with `=` but failed to parse as a formula.
    InvalidFormula(ParseError),
    /// The proposed formula would create a cycle; the sheet is unchanged.
    CircularDependency,
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::InvalidPosition => write!(f, "invalid position"),
            SheetError::InvalidFormula(e) => write!(f, "invalid formula: {}", e),
            SheetError::CircularDependency => write!(f, "circular dependency"),
        }
    }
}

impl std::error::Error for SheetError {}

/// Sparse storage: only occupied cells are present in the map.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet {
            cells: HashMap::new(),
        }
    }

    /// Classifies `text`, checks it wouldn't introduce a cycle, then commits:
    /// swaps the impl in, rewires edges, and invalidates every downstream
    /// cache. Either this all happens, or nothing does — on a parse or cycle
    /// error the sheet is left exactly as it was.
    pub fn set_cell(&mut self, pos: Position, text: impl AsRef<str>) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }

        let (impl_, new_outgoing) =
            Cell::classify(text.as_ref()).map_err(SheetError::InvalidFormula)?;

        if self.would_introduce_cycle(pos, &new_outgoing) {
            return Err(SheetError::CircularDependency);
        }

        self.rewire(pos, impl_, new_outgoing);

        Ok(())
    }

    pub fn get_cell(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    /// Clears the cell's contents; if nothing depends on it afterward, the
    /// slot is dropped from the map entirely. Clearing is just transitioning
    /// to the Empty impl with no outgoing edges, so it goes through the same
    /// edge-rewiring `set_cell` uses rather than leaving stale edges behind.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }

        if self.cells.contains_key(&pos) {
            self.rewire(pos, CellImpl::Empty, HashSet::new());

            if let Some(cell) = self.cells.get(&pos) {
                if !cell.is_referenced() {
                    self.cells.remove(&pos);
                }
            }
        }

        Ok(())
    }

    /// Swaps `pos`'s impl in, rewiring edges against whatever it used to
    /// point at, and invalidates every cache downstream of `pos`. Shared by
    /// `set_cell` and `clear_cell` — clearing is just adopting the Empty
    /// impl with an empty outgoing set, so it must go through the same
    /// `old_outgoing.difference(new_outgoing)` cleanup or stale `incoming`
    /// entries are left behind on the cells it used to reference.
    fn rewire(&mut self, pos: Position, impl_: CellImpl, new_outgoing: HashSet<Position>) {
        // Missing cells a new formula references are materialized as Empty
        // before any edges are wired.
        for &target in &new_outgoing {
            self.cells.entry(target).or_insert_with(Cell::new);
        }

        let old_outgoing = self
            .cells
            .get(&pos)
            .map(|c| c.outgoing.clone())
            .unwrap_or_default();

        for target in old_outgoing.difference(&new_outgoing) {
            if let Some(cell) = self.cells.get_mut(target) {
                cell.incoming.remove(&pos);
            }
        }
        for &target in &new_outgoing {
            self.cells.entry(target).or_insert_with(Cell::new).incoming.insert(pos);
        }

        self.cells.entry(pos).or_insert_with(Cell::new).set_impl(impl_, new_outgoing);

        self.invalidate_recursive(pos, true);
    }

    /// One past the highest occupied row/col; `(0, 0)` for an empty sheet.
    pub fn printable_size(&self) -> Size {
        let mut rows = 0;
        let mut cols = 0;
        for pos in self.cells.keys() {
            rows = rows.max(pos.row + 1);
            cols = cols.max(pos.col + 1);
        }
        Size::new(rows, cols)
    }

    pub fn print_values(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_grid(out, |cell, sheet| match cell.value(sheet) {
            crate::cell::CellValue::Empty => String::new(),
            crate::cell::CellValue::Text(s) => s,
            crate::cell::CellValue::Number(n) => format!("{}", n),
            crate::cell::CellValue::Error(e) => e.to_string(),
        })
    }

    pub fn print_texts(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_grid(out, |cell, _sheet| cell.text())
    }

    fn print_grid(
        &self,
        out: &mut impl Write,
        render: impl Fn(&Cell, &Sheet) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    if !cell.text().is_empty() {
                        write!(out, "{}", render(cell, self))?;
                    }
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Reverse-reachability search from `pos` along `incoming` edges: would
    /// adopting `candidate_outgoing` make `pos` a dependency of something
    /// that already (transitively) depends on `pos`? Seeding the stack with
    /// `pos` itself catches direct self-references for free.
    fn would_introduce_cycle(&self, pos: Position, candidate_outgoing: &HashSet<Position>) -> bool {
        if candidate_outgoing.is_empty() {
            return false;
        }

        let mut stack = vec![pos];
        let mut visited = HashSet::new();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if candidate_outgoing.contains(&node) {
                return true;
            }
            if let Some(cell) = self.cells.get(&node) {
                for &incoming in &cell.incoming {
                    if !visited.contains(&incoming) {
                        stack.push(incoming);
                    }
                }
            }
        }

        false
    }

    /// Clears `pos`'s cache (if valid or `force`), then recurses into every
    /// cell that depends on it with `force = false` — traversal stops as
    /// soon as it reaches an already-invalid cache, since an invalid cache
    /// implies its own dependents are already invalid too.
    fn invalidate_recursive(&mut self, pos: Position, force: bool) {
        let should_invalidate = match self.cells.get(&pos) {
            Some(cell) => force || cell.is_cache_valid(),
            None => return,
        };
        if !should_invalidate {
            return;
        }

        let incoming: Vec<Position> = {
            let cell = self.cells.get(&pos).unwrap();
            cell.invalidate_cache();
            cell.incoming.iter().copied().collect()
        };

        for dep in incoming {
            self.invalidate_recursive(dep, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn rejects_invalid_position() {
        let mut sheet = Sheet::new();
        assert_eq!(sheet.set_cell(Position::NONE, "1"), Err(SheetError::InvalidPosition));
    }

    #[test]
    fn set_and_get_plain_text() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "hello").unwrap();
        assert_eq!(sheet.get_cell(pos(0, 0)).unwrap().text(), "hello");
    }

    #[test]
    fn formula_materializes_missing_referenced_cells() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(1, 1), "=A1+1").unwrap();
        assert!(sheet.get_cell(pos(0, 0)).is_some());
    }

    #[test]
    fn rejects_direct_self_reference() {
        let mut sheet = Sheet::new();
        assert_eq!(sheet.set_cell(pos(0, 0), "=A1"), Err(SheetError::CircularDependency));
        // And the cell is left unchanged (never materialized).
        assert!(sheet.get_cell(pos(0, 0)).is_none());
    }

    #[test]
    fn rejects_transitive_cycle() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "=B1").unwrap(); // A1 = B1
        sheet.set_cell(pos(1, 0), "=C1").unwrap(); // B1 = C1
        let result = sheet.set_cell(pos(2, 0), "=A1"); // C1 = A1 -> cycle
        assert_eq!(result, Err(SheetError::CircularDependency));
    }

    #[test]
    fn cache_invalidates_on_upstream_change() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "1").unwrap();
        sheet.set_cell(pos(1, 0), "=A1+1").unwrap();
        assert_eq!(sheet.get_cell(pos(1, 0)).unwrap().value(&sheet), crate::cell::CellValue::Number(2.0));

        sheet.set_cell(pos(0, 0), "10").unwrap();
        assert_eq!(sheet.get_cell(pos(1, 0)).unwrap().value(&sheet), crate::cell::CellValue::Number(11.0));
    }

    #[test]
    fn clear_cell_removes_unreferenced_slot() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "hello").unwrap();
        sheet.clear_cell(pos(0, 0)).unwrap();
        assert!(sheet.get_cell(pos(0, 0)).is_none());
    }

    #[test]
    fn clear_cell_keeps_referenced_slot_as_empty() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(1, 0), "=A1+1").unwrap();
        sheet.clear_cell(pos(0, 0)).unwrap();
        let a1 = sheet.get_cell(pos(0, 0)).unwrap();
        assert_eq!(a1.value(&sheet), crate::cell::CellValue::Empty);
    }

    #[test]
    fn clearing_a_formula_cell_drops_its_stale_incoming_edges() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "=B1").unwrap(); // A1 = B1
        sheet.clear_cell(pos(0, 0)).unwrap(); // A1 no longer references B1
        // B1 = A1 is now a perfectly legal formula — it must not be rejected
        // as a cycle because of a leftover edge in B1's incoming set.
        assert!(sheet.set_cell(pos(1, 0), "=A1").is_ok());
    }

    #[test]
    fn printable_size_and_rendering() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos(0, 0), "1").unwrap();
        sheet.set_cell(pos(2, 2), "=A1*2").unwrap();
        assert_eq!(sheet.printable_size(), Size::new(3, 3));

        let mut values = Vec::new();
        sheet.print_values(&mut values).unwrap();
        let values = String::from_utf8(values).unwrap();
        assert_eq!(values, "1\t\t\n\t\t\n\t\t2\n");

        let mut texts = Vec::new();
        sheet.print_texts(&mut texts).unwrap();
        let texts = String::from_utf8(texts).unwrap();
        assert_eq!(texts, "1\t\t\n\t\t\n\t\t=A1*2\n");
    }

    #[test]
    fn empty_sheet_has_zero_size() {
        let sheet = Sheet::new();
        assert_eq!(sheet.printable_size(), Size::new(0, 0));
    }
}
