//! FILENAME: parser/src/position.rs
//! PURPOSE: Cell coordinates and the A1-style text form cells are addressed by.
//! CONTEXT: `Position` is the stable key used everywhere a cell is referenced —
//! inside parsed formulas, as dependency-graph edges, and as the sheet's own
//! storage key. Keeping it here (rather than in `engine`) lets the AST hold
//! `Position`s without `parser` depending on `engine`.

use std::fmt;

/// Spreadsheets are bounded at 16384 rows and 16384 columns (matches the
/// donor's own grid bounds).
pub const MAX_ROWS: i32 = 16384;
pub const MAX_COLS: i32 = 16384;

/// Longest textual form a valid position can take, e.g. "ZZZ16384".
pub const MAX_POSITION_LENGTH: usize = 17;

/// A1-style column letters never exceed three characters (26^3 > MAX_COLS).
pub const MAX_POS_LETTER_COUNT: usize = 3;

/// A single cell coordinate. Row and column are 0-based internally; the
/// textual form is 1-based for the row and base-26 letters for the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    /// The sentinel for "no position" / an unresolved reference.
    pub const NONE: Position = Position { row: -1, col: -1 };

    pub fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    /// A position is valid if both coordinates are non-negative and within bounds.
    pub fn is_valid(&self) -> bool {
        self.row >= 0 && self.col >= 0 && self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Renders the canonical A1-style text form, e.g. `(0, 0) -> "A1"`.
    /// Returns an empty string for an invalid position.
    pub fn to_string(&self) -> String {
        if !self.is_valid() {
            return String::new();
        }

        let mut letters = Vec::new();
        let mut c = self.col;
        loop {
            letters.push((b'A' + (c % 26) as u8) as char);
            c = c / 26 - 1;
            if c < 0 {
                break;
            }
        }
        letters.reverse();

        let mut out: String = letters.into_iter().collect();
        out.push_str(&(self.row + 1).to_string());
        out
    }

    /// Parses the A1-style text form back into a `Position`.
    /// Returns `Position::NONE` if the text isn't a well-formed reference —
    /// callers must separately check `is_valid()` on the result, since a
    /// syntactically well-formed reference can still be out of bounds.
    pub fn from_string(text: &str) -> Position {
        let split_at = text
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_uppercase()))
            .map(|(i, _)| i)
            .unwrap_or(text.len());

        let (letters, digits) = text.split_at(split_at);

        if letters.is_empty() || digits.is_empty() {
            return Position::NONE;
        }
        if letters.len() > MAX_POS_LETTER_COUNT {
            return Position::NONE;
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Position::NONE;
        }

        let row: i64 = match digits.parse() {
            Ok(n) => n,
            Err(_) => return Position::NONE,
        };

        let mut col: i64 = 0;
        for ch in letters.bytes() {
            col = col * 26 + (ch - b'A' + 1) as i64;
        }

        Position::new((row - 1) as i32, (col - 1) as i32)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

/// The printable extent of a sheet: one past the highest occupied row/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

impl Size {
    pub fn new(rows: i32, cols: i32) -> Self {
        Size { rows, cols }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_simple_positions() {
        for (text, row, col) in [("A1", 0, 0), ("B1", 0, 1), ("A2", 1, 0), ("Z1", 0, 25)] {
            let pos = Position::from_string(text);
            assert_eq!(pos, Position::new(row, col));
            assert_eq!(pos.to_string(), text);
        }
    }

    #[test]
    fn wraps_past_single_letter_columns() {
        assert_eq!(Position::from_string("AA1"), Position::new(0, 26));
        assert_eq!(Position::from_string("AA1").to_string(), "AA1");
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(Position::from_string(""), Position::NONE);
        assert_eq!(Position::from_string("A"), Position::NONE);
        assert_eq!(Position::from_string("1"), Position::NONE);
        assert_eq!(Position::from_string("A1A"), Position::NONE);
        assert_eq!(Position::from_string("a1"), Position::NONE);
    }

    #[test]
    fn rejects_too_many_letters() {
        assert_eq!(Position::from_string("ZZZZ1"), Position::NONE);
    }

    #[test]
    fn flags_out_of_bounds_positions_as_invalid() {
        let huge_row = Position::from_string(&format!("A{}", MAX_ROWS + 1));
        assert!(!huge_row.is_valid());
        assert_eq!(huge_row.to_string(), "");
    }

    #[test]
    fn none_is_never_valid() {
        assert!(!Position::NONE.is_valid());
    }
}
