//! Directory of CSV files standing in for a spreadsheet.
//!
//! Each tab is `<dir>/<tab>.csv`, header row first. Writes rewrite the whole
//! file through a temporary sibling and a rename.

use std::path::{Path, PathBuf};

use mcfdesk_recon::workbook::set_grid_cell;
use mcfdesk_recon::{Grid, SheetError, Workbook};

use crate::error::SheetsError;

#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    dir: PathBuf,
}

impl CsvWorkbook {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SheetsError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SheetsError::Io(format!("{} is not a directory", dir.display())));
        }
        Ok(Self { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `tab`. Names that could leave the directory are refused.
    pub fn tab_path(&self, tab: &str) -> Result<PathBuf, SheetsError> {
        if tab.trim().is_empty() || tab.contains(['/', '\\', '\0']) || tab.contains("..") {
            return Err(SheetsError::Io(format!("invalid tab name '{}' for a CSV workbook", tab)));
        }
        Ok(self.dir.join(format!("{}.csv", tab)))
    }

    /// Tab names present in the directory, sorted.
    pub fn tab_names(&self) -> Result<Vec<String>, SheetsError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| SheetsError::Io(format!("cannot list {}: {}", self.dir.display(), e)))?;
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("csv")))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }

    fn read_grid(&self, tab: &str) -> Result<Grid, SheetsError> {
        let path = self.tab_path(tab)?;
        if !path.is_file() {
            return Err(SheetsError::TabNotFound(tab.to_string()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| SheetsError::Io(format!("cannot open {}: {}", path.display(), e)))?;

        let mut grid = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SheetsError::Parse(format!("{}: {}", path.display(), e)))?;
            grid.push(record.iter().map(|s| s.trim_start_matches('\u{feff}').to_string()).collect());
        }
        Ok(grid)
    }

    fn write_grid(&self, tab: &str, grid: &Grid) -> Result<PathBuf, SheetsError> {
        let path = self.tab_path(tab)?;
        let tmp = self.dir.join(format!(".{}.csv.tmp", tab));
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .map_err(|e| SheetsError::Io(format!("cannot write {}: {}", tmp.display(), e)))?;
            for row in grid {
                writer
                    .write_record(row)
                    .map_err(|e| SheetsError::Io(format!("cannot write {}: {}", tmp.display(), e)))?;
            }
            writer
                .flush()
                .map_err(|e| SheetsError::Io(format!("cannot write {}: {}", tmp.display(), e)))?;
        }
        std::fs::rename(&tmp, &path)
            .map_err(|e| SheetsError::Io(format!("cannot replace {}: {}", path.display(), e)))?;
        Ok(path)
    }
}

impl Workbook for CsvWorkbook {
    fn read_values(&self, tab: &str) -> Result<Grid, SheetError> {
        self.read_grid(tab).map_err(SheetError::from)
    }

    fn update_cell(&mut self, tab: &str, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        if row == 0 || col == 0 {
            return Err(SheetError::Backend(format!("invalid cell coordinates ({}, {})", row, col)));
        }
        let mut grid = self.read_grid(tab)?;
        set_grid_cell(&mut grid, row, col, value);
        // Keep every row at least as wide as the header so new columns line up
        let width = grid.first().map_or(0, |h| h.len());
        for r in grid.iter_mut() {
            if r.len() < width {
                r.resize(width, String::new());
            }
        }
        let path = self.write_grid(tab, &grid)?;
        log::debug!("wrote {}:{},{} to {}", tab, row, col, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, CsvWorkbook) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Master Reconciliation.csv"),
            "MCF Number,Customer Name,Net Profit/Loss\nMCF-20250428-0588,\"Sharma, Priya\",\"1,000\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let wb = CsvWorkbook::open(dir.path()).unwrap();
        (dir, wb)
    }

    #[test]
    fn test_read_quoted_cells() {
        let (_dir, wb) = setup();
        let grid = wb.read_values("Master Reconciliation").unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[1][1], "Sharma, Priya");
        assert_eq!(grid[1][2], "1,000");
        assert_eq!(wb.tab_names().unwrap(), vec!["Master Reconciliation"]);
    }

    #[test]
    fn test_missing_tab() {
        let (_dir, wb) = setup();
        assert_eq!(wb.read_values("01_Expected"), Err(SheetError::TabNotFound("01_Expected".into())));
    }

    #[test]
    fn test_append_column_persists() {
        let (dir, mut wb) = setup();
        wb.update_cell("Master Reconciliation", 1, 4, "Review Status").unwrap();
        wb.update_cell("Master Reconciliation", 2, 4, "Reviewed").unwrap();

        let reopened = CsvWorkbook::open(dir.path()).unwrap();
        let grid = reopened.read_values("Master Reconciliation").unwrap();
        assert_eq!(grid[0][3], "Review Status");
        assert_eq!(grid[1][3], "Reviewed");
        assert_eq!(grid[1][1], "Sharma, Priya");
        assert!(!dir.path().join(".Master Reconciliation.csv.tmp").exists());
    }

    #[test]
    fn test_open_rejects_file() {
        let (dir, _) = setup();
        assert!(CsvWorkbook::open(dir.path().join("notes.txt")).is_err());
    }

    #[test]
    fn test_tab_names_cannot_escape_dir() {
        let (dir, mut wb) = setup();
        for tab in ["../outside", "..", "sub/Master", "sub\\Master", ""] {
            assert!(wb.tab_path(tab).is_err(), "{tab:?} accepted");
            assert!(matches!(wb.read_values(tab), Err(SheetError::Backend(_))));
            assert!(wb.update_cell(tab, 1, 1, "x").is_err());
        }
        assert!(!dir.path().join("sub").exists());
        assert!(wb.tab_path("04_Invoice").is_ok());
    }
}
