//! Backend-neutral view of a spreadsheet.
//!
//! The engine only ever needs two things from the remote sheet: read a tab as a
//! grid of display strings (header row first) and write a single cell. Appending
//! a column is a write to the first empty header cell.

use std::collections::BTreeMap;

use crate::error::SheetError;

/// Rows of cell strings; row 0 is the header.
pub type Grid = Vec<Vec<String>>;

pub trait Workbook {
    /// Read every populated row of `tab`, header first.
    fn read_values(&self, tab: &str) -> Result<Grid, SheetError>;

    /// Write one cell. `row` and `col` are 1-based; row 1 is the header.
    fn update_cell(&mut self, tab: &str, row: usize, col: usize, value: &str) -> Result<(), SheetError>;
}

/// Convert a 1-based column number into A1 letters (1 → A, 27 → AA).
pub fn column_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert A1 column letters into a 1-based column number (A → 1, AE → 31).
pub fn column_number(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    Some(col)
}

// ---------------------------------------------------------------------------
// In-memory workbook
// ---------------------------------------------------------------------------

/// One write recorded by [`MemoryWorkbook`].
#[derive(Debug, Clone, PartialEq)]
pub struct CellWriteRecord {
    pub tab: String,
    pub row: usize,
    pub col: usize,
    pub value: String,
}

/// Grid-per-tab workbook held in memory. Records every write.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    tabs: BTreeMap<String, Grid>,
    writes: Vec<CellWriteRecord>,
    write_limit: Option<usize>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab(mut self, name: &str, grid: Grid) -> Self {
        self.tabs.insert(name.to_string(), grid);
        self
    }

    pub fn insert_tab(&mut self, name: &str, grid: Grid) {
        self.tabs.insert(name.to_string(), grid);
    }

    /// Reject every write after the first `n` succeed.
    pub fn fail_writes_after(mut self, n: usize) -> Self {
        self.write_limit = Some(n);
        self
    }

    pub fn tab(&self, name: &str) -> Option<&Grid> {
        self.tabs.get(name)
    }

    pub fn tab_names(&self) -> impl Iterator<Item = &str> {
        self.tabs.keys().map(String::as_str)
    }

    pub fn writes(&self) -> &[CellWriteRecord] {
        &self.writes
    }

    /// Value at 1-based coordinates, empty when outside the grid.
    pub fn cell(&self, tab: &str, row: usize, col: usize) -> &str {
        self.tabs
            .get(tab)
            .and_then(|g| g.get(row.checked_sub(1)?))
            .and_then(|r| r.get(col.checked_sub(1)?))
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl Workbook for MemoryWorkbook {
    fn read_values(&self, tab: &str) -> Result<Grid, SheetError> {
        self.tabs
            .get(tab)
            .cloned()
            .ok_or_else(|| SheetError::TabNotFound(tab.to_string()))
    }

    fn update_cell(&mut self, tab: &str, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        if row == 0 || col == 0 {
            return Err(SheetError::Backend(format!("invalid cell coordinates ({row}, {col})")));
        }
        if let Some(limit) = self.write_limit {
            if self.writes.len() >= limit {
                return Err(SheetError::Backend("write quota exceeded".to_string()));
            }
        }
        let grid = self
            .tabs
            .get_mut(tab)
            .ok_or_else(|| SheetError::TabNotFound(tab.to_string()))?;
        set_grid_cell(grid, row, col, value);
        self.writes.push(CellWriteRecord {
            tab: tab.to_string(),
            row,
            col,
            value: value.to_string(),
        });
        Ok(())
    }
}

/// Set a 1-based cell in `grid`, growing rows and columns as needed.
pub fn set_grid_cell(grid: &mut Grid, row: usize, col: usize, value: &str) {
    if grid.len() < row {
        grid.resize_with(row, Vec::new);
    }
    let cells = &mut grid[row - 1];
    if cells.len() < col {
        cells.resize(col, String::new());
    }
    cells[col - 1] = value.to_string();
}
