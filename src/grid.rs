use chrono::NaiveDateTime;

/// Untyped cell value as produced by the workbook reader.
///
/// Source sheets carry no schema: the same column can hold text, numbers and
/// real date cells row by row. Interpretation happens downstream by
/// pattern-matching this variant, never by re-testing runtime types.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Cell {
    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Canonical text form of the cell.
    ///
    /// Whole numbers render without a trailing `.0` so that mobile numbers
    /// and serial dates stored as numeric cells match their string twins.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Cell::Date(dt) => dt.format("%Y-%m-%d").to_string(),
        }
    }

    /// Just the digit characters of the cell's text form.
    pub fn digits(&self) -> String {
        self.text().chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

const EMPTY_CELL: Cell = Cell::Empty;

/// Raw worksheet contents: ordered rows of ordered cells, possibly ragged.
///
/// Positions are load-bearing (column indices carry meaning), so the reader
/// preserves leading and trailing blanks. Immutable once constructed.
#[derive(Debug, Clone, Default)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Widest row in the grid.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Row by index; out-of-range indices read as an empty row.
    pub fn row(&self, idx: usize) -> &[Cell] {
        self.rows.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell by position; missing cells read as `Cell::Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn is_row_blank(&self, idx: usize) -> bool {
        self.row(idx).iter().all(Cell::is_blank)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_drops_trailing_zero() {
        assert_eq!(Cell::Number(9876543210.0).text(), "9876543210");
        assert_eq!(Cell::Number(3.5).text(), "3.5");
    }

    #[test]
    fn missing_cells_read_as_empty() {
        let grid = RawGrid::from_rows(vec![vec![Cell::Text("A".into())]]);
        assert_eq!(grid.cell(0, 5), &Cell::Empty);
        assert_eq!(grid.cell(9, 0), &Cell::Empty);
        assert!(grid.is_row_blank(9));
    }
}
