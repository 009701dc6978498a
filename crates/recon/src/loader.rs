//! Sheet loader: reads every tab named by a [`SheetLayout`] into a [`Table`].
//!
//! One bad tab never aborts the load; it is reported and skipped.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::layout::{SheetLayout, TabSpec};
use crate::table::Table;
use crate::workbook::{Grid, Workbook};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TabOutcome {
    Loaded { rows: usize },
    Empty,
    Failed { error: String },
}

/// Result of loading a workbook: per-tab outcome in layout order plus the tables.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub master_tab: String,
    pub outcomes: Vec<(String, TabOutcome)>,
    pub tables: BTreeMap<String, Table>,
}

impl LoadReport {
    pub fn master(&self) -> Option<&Table> {
        self.tables.get(&self.master_tab)
    }

    pub fn table(&self, tab: &str) -> Option<&Table> {
        self.tables.get(tab)
    }

    /// Row count per loaded tab, in layout order.
    pub fn row_counts(&self) -> Vec<(String, usize)> {
        self.outcomes
            .iter()
            .filter_map(|(tab, outcome)| match outcome {
                TabOutcome::Loaded { rows } => Some((tab.clone(), *rows)),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TabOutcome::Failed { .. }))
            .count()
    }

    /// One line per tab, in the style shown to the user after connecting.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (tab, outcome) in &self.outcomes {
            match outcome {
                TabOutcome::Loaded { rows } => out.push_str(&format!("✅ Loaded {tab}: {rows} rows\n")),
                TabOutcome::Empty => out.push_str(&format!("⚠️ {tab} is empty\n")),
                TabOutcome::Failed { error } => {
                    out.push_str(&format!("❌ Error loading {tab}: {error}\n"))
                }
            }
        }
        out
    }
}

/// Load every tab in `layout` from `workbook`.
pub fn load_workbook(workbook: &dyn Workbook, layout: &SheetLayout) -> LoadReport {
    let mut report = LoadReport { master_tab: layout.master.clone(), ..Default::default() };

    for spec in &layout.tabs {
        let outcome = match workbook.read_values(&spec.name) {
            Ok(grid) => match grid_to_table(grid, spec) {
                Some(table) => {
                    let rows = table.len();
                    log::info!("loaded '{}': {} rows", spec.name, rows);
                    report.tables.insert(spec.name.clone(), table);
                    TabOutcome::Loaded { rows }
                }
                None => {
                    log::warn!("'{}' is empty", spec.name);
                    TabOutcome::Empty
                }
            },
            Err(e) => {
                log::warn!("error loading '{}': {}", spec.name, e);
                TabOutcome::Failed { error: e.to_string() }
            }
        };
        report.outcomes.push((spec.name.clone(), outcome));
    }

    report
}

/// Header-first grid to table. `None` when there is no data row.
/// Blank trailing rows are judged inside the column span.
fn grid_to_table(grid: Grid, spec: &TabSpec) -> Option<Table> {
    let mut grid: Grid = match &spec.columns {
        Some(span) => grid.iter().map(|row| span.slice(row).to_vec()).collect(),
        None => grid,
    };
    while grid
        .last()
        .map_or(false, |row| row.iter().all(|c| c.trim().is_empty()))
    {
        grid.pop();
    }
    if grid.len() < 2 {
        return None;
    }

    let mut rows = grid.into_iter();
    let headers = rows.next()?;
    Some(Table::from_grid(headers, rows.collect()))
}
