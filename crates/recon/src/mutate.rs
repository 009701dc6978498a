//! Sheet mutator: applies [`Action`]s to the live master tab.
//!
//! Every check runs against the snapshot and a fresh read of the live tab before
//! anything is written. Writes are then staged in a [`WritePlan`] and committed
//! cell by cell. A failed commit is reported with the writes that did land; it
//! is never rolled back.

use chrono::NaiveDateTime;
use serde_json::json;

use crate::format::format_currency;
use crate::model::*;
use crate::table::{format_plain, Table};
use crate::workbook::{Grid, Workbook};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const REVIEWED_MARKER: &str = "Reviewed";

// ---------------------------------------------------------------------------
// Live sheet view
// ---------------------------------------------------------------------------

/// Header and key lookup over a freshly read grid of the live tab.
#[derive(Debug)]
pub struct LiveSheet {
    header: Vec<String>,
    grid: Grid,
    key_col: usize,
}

impl LiveSheet {
    pub fn new(grid: Grid) -> Self {
        let mut header: Vec<String> = grid
            .first()
            .map(|h| h.iter().map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();
        while header.last().map_or(false, |h| h.is_empty()) {
            header.pop();
        }
        // Key column by name, else the first column
        let key_col = header.iter().position(|h| h == KEY_COLUMN).unwrap_or(0);
        Self { header, grid, key_col }
    }

    /// 1-based column of `name`, matched exactly after trimming.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name.trim()).map(|i| i + 1)
    }

    /// Exact header match first, then case-insensitive.
    pub fn resolve_column(&self, name: &str) -> Option<(usize, &str)> {
        let wanted = name.trim();
        self.header
            .iter()
            .position(|h| h == wanted)
            .or_else(|| self.header.iter().position(|h| h.eq_ignore_ascii_case(wanted)))
            .map(|i| (i + 1, self.header[i].as_str()))
    }

    /// 1-based sheet row of the first data row whose key equals `key`.
    pub fn row_of(&self, key: &str) -> Option<usize> {
        let wanted = key.trim();
        self.grid
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| {
                row.get(self.key_col)
                    .map_or(false, |k| k.trim().eq_ignore_ascii_case(wanted))
            })
            .map(|(i, _)| i + 1)
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }
}

// ---------------------------------------------------------------------------
// Write plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub row: usize,
    pub col: usize,
    pub value: String,
    pub label: String,
}

/// Header cells to create followed by data cells to write, in commit order.
#[derive(Debug, Default)]
pub struct WritePlan {
    new_columns: Vec<String>,
    base_width: usize,
    cells: Vec<PlannedWrite>,
}

/// A commit that stopped part way.
#[derive(Debug)]
pub struct CommitError {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
    pub error: String,
}

impl WritePlan {
    pub fn new(live: &LiveSheet) -> Self {
        Self { base_width: live.width(), ..Default::default() }
    }

    /// Column for `name`, planning a new header cell after the last one if the
    /// live sheet does not have it yet.
    pub fn ensure_column(&mut self, live: &LiveSheet, name: &str) -> usize {
        if let Some(col) = live.column(name) {
            return col;
        }
        if let Some(i) = self.new_columns.iter().position(|c| c == name) {
            return self.base_width + i + 1;
        }
        self.new_columns.push(name.to_string());
        self.base_width + self.new_columns.len()
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>, label: impl Into<String>) {
        self.cells.push(PlannedWrite { row, col, value: value.into(), label: label.into() });
    }

    pub fn len(&self) -> usize {
        self.new_columns.len() + self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn steps(&self) -> Vec<PlannedWrite> {
        let headers = self.new_columns.iter().enumerate().map(|(i, name)| PlannedWrite {
            row: 1,
            col: self.base_width + i + 1,
            value: name.clone(),
            label: format!("add column '{name}'"),
        });
        headers.chain(self.cells.iter().cloned()).collect()
    }

    pub fn commit(&self, workbook: &mut dyn Workbook, tab: &str) -> Result<usize, CommitError> {
        let steps = self.steps();
        let mut applied = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            if let Err(e) = workbook.update_cell(tab, step.row, step.col, &step.value) {
                log::error!("write {} failed on '{}': {}", step.label, tab, e);
                return Err(CommitError {
                    applied,
                    pending: steps[i..].iter().map(|s| s.label.clone()).collect(),
                    error: e.to_string(),
                });
            }
            log::debug!("wrote {} ({},{}) on '{}'", step.label, step.row, step.col, tab);
            applied.push(step.label.clone());
        }
        Ok(applied.len())
    }
}

// ---------------------------------------------------------------------------
// Mutator
// ---------------------------------------------------------------------------

pub struct Mutator {
    tab: String,
    currency: String,
}

impl Mutator {
    pub fn new(tab: impl Into<String>) -> Self {
        Self { tab: tab.into(), currency: "₹".to_string() }
    }

    pub fn with_currency(mut self, symbol: impl Into<String>) -> Self {
        self.currency = symbol.into();
        self
    }

    /// Apply every action in order using the local clock.
    pub fn apply_all(
        &self,
        workbook: &mut dyn Workbook,
        snapshot: &Table,
        actions: &[Action],
    ) -> Vec<OperationResult> {
        let now = chrono::Local::now().naive_local();
        actions
            .iter()
            .map(|a| self.apply_at(workbook, snapshot, a, now))
            .collect()
    }

    pub fn apply(&self, workbook: &mut dyn Workbook, snapshot: &Table, action: &Action) -> OperationResult {
        self.apply_at(workbook, snapshot, action, chrono::Local::now().naive_local())
    }

    pub fn apply_at(
        &self,
        workbook: &mut dyn Workbook,
        snapshot: &Table,
        action: &Action,
        now: NaiveDateTime,
    ) -> OperationResult {
        log::info!("applying {} to '{}'", action, self.tab);
        let live = match workbook.read_values(&self.tab) {
            Ok(grid) => LiveSheet::new(grid),
            Err(e) => return OperationResult::error(format!("Could not read '{}': {}", self.tab, e)),
        };
        let ts = now.format(TIMESTAMP_FORMAT).to_string();

        let planned = match action {
            Action::CoverLoss { loss_mcf, profit_mcf } => self.plan_cover(&live, snapshot, loss_mcf, profit_mcf, &ts),
            Action::MarkReviewed { mcf } => self.plan_review(&live, mcf, &ts),
            Action::UpdateValue { mcf, column, value } => self.plan_update(&live, mcf, column, value),
        };
        let (plan, result) = match planned {
            Ok(p) => p,
            Err(rejected) => {
                log::warn!("{} rejected: {}", action, rejected.message);
                return rejected;
            }
        };

        match plan.commit(workbook, &self.tab) {
            Ok(n) => {
                log::info!("{}: {} write(s) applied", action.kind(), n);
                result
            }
            Err(e) => {
                let applied = if e.applied.is_empty() { "none".to_string() } else { e.applied.join(", ") };
                OperationResult::error(format!(
                    "Write failed after {} of {} change(s): {}. Applied: {}. Manual reconciliation required.",
                    e.applied.len(),
                    plan.len(),
                    e.error,
                    applied
                ))
                .with_detail("applied", e.applied)
                .with_detail("pending", e.pending)
            }
        }
    }

    fn money(&self, v: f64) -> String {
        format_currency(&self.currency, v)
    }

    fn live_row(&self, live: &LiveSheet, key: &str) -> Result<usize, OperationResult> {
        live.row_of(key)
            .ok_or_else(|| OperationResult::error(format!("MCF {key} not found in {}", self.tab)))
    }

    fn plan_cover(
        &self,
        live: &LiveSheet,
        snapshot: &Table,
        loss_key: &str,
        profit_key: &str,
        ts: &str,
    ) -> Result<(WritePlan, OperationResult), OperationResult> {
        if loss_key.trim().eq_ignore_ascii_case(profit_key.trim()) {
            return Err(OperationResult::error(format!(
                "Cannot cover {loss_key} with itself; choose a different profit MCF"
            )));
        }
        let missing = |k: &str| OperationResult::error(format!("MCF {k} not found in {}", self.tab));
        let loss = snapshot.find_by_key(loss_key).map(Deal).ok_or_else(|| missing(loss_key))?;
        let profit = snapshot.find_by_key(profit_key).map(Deal).ok_or_else(|| missing(profit_key))?;

        let loss_pl = loss.net_pl();
        let profit_pl = profit.net_pl();
        if loss_pl >= 0.0 {
            return Err(OperationResult::error(format!(
                "{loss_key} is not a loss (P&L {})",
                self.money(loss_pl)
            )));
        }
        if profit_pl <= 0.0 {
            return Err(OperationResult::error(format!(
                "{profit_key} has no profit to cover with (P&L {})",
                self.money(profit_pl)
            )));
        }

        let loss_row = self.live_row(live, loss_key)?;
        let profit_row = self.live_row(live, profit_key)?;
        let loss_amount = loss_pl.abs();
        let profit_amount = profit_pl;

        let mut plan = WritePlan::new(live);
        let adj = plan.ensure_column(live, ADJUSTED_PL);
        let note = plan.ensure_column(live, ADJUSTMENT_NOTE);

        let result = if profit_amount >= loss_amount {
            let remaining = profit_amount - loss_amount;
            plan.set(loss_row, adj, "0", format!("{loss_key} {ADJUSTED_PL}"));
            plan.set(loss_row, note, format!("Covered by {profit_key} on {ts}"), format!("{loss_key} {ADJUSTMENT_NOTE}"));
            plan.set(profit_row, adj, format_plain(remaining), format!("{profit_key} {ADJUSTED_PL}"));
            plan.set(profit_row, note, format!("Covered {loss_key} on {ts}"), format!("{profit_key} {ADJUSTMENT_NOTE}"));
            OperationResult::success(format!(
                "Loss of {} on {loss_key} fully covered by {profit_key}. Remaining profit: {}",
                self.money(loss_amount),
                self.money(remaining)
            ))
            .with_detail("loss_adjusted", 0.0)
            .with_detail("profit_adjusted", remaining)
        } else {
            let remaining = -(loss_amount - profit_amount);
            plan.set(loss_row, adj, format_plain(remaining), format!("{loss_key} {ADJUSTED_PL}"));
            plan.set(
                loss_row,
                note,
                format!("Partially covered by {profit_key} on {ts}"),
                format!("{loss_key} {ADJUSTMENT_NOTE}"),
            );
            plan.set(profit_row, adj, "0", format!("{profit_key} {ADJUSTED_PL}"));
            plan.set(
                profit_row,
                note,
                format!("Fully used to partially cover {loss_key} on {ts}"),
                format!("{profit_key} {ADJUSTMENT_NOTE}"),
            );
            OperationResult::warning(format!(
                "Loss on {loss_key} only partially covered by {profit_key}. Remaining loss: {}",
                self.money(remaining)
            ))
            .with_detail("loss_adjusted", remaining)
            .with_detail("profit_adjusted", 0.0)
        };

        let result = result
            .with_detail("loss_mcf", json!(loss.key()))
            .with_detail("profit_mcf", json!(profit.key()));
        Ok((plan, result))
    }

    fn plan_review(&self, live: &LiveSheet, key: &str, ts: &str) -> Result<(WritePlan, OperationResult), OperationResult> {
        let row = self.live_row(live, key)?;
        let mut plan = WritePlan::new(live);
        let status = plan.ensure_column(live, REVIEW_STATUS);
        let date = plan.ensure_column(live, REVIEW_DATE);
        plan.set(row, status, REVIEWED_MARKER, format!("{key} {REVIEW_STATUS}"));
        plan.set(row, date, ts, format!("{key} {REVIEW_DATE}"));
        Ok((plan, OperationResult::success(format!("{key} marked as reviewed")).with_detail("mcf", key)))
    }

    fn plan_update(
        &self,
        live: &LiveSheet,
        key: &str,
        column: &str,
        value: &str,
    ) -> Result<(WritePlan, OperationResult), OperationResult> {
        let (col, name) = live
            .resolve_column(column)
            .ok_or_else(|| OperationResult::error(format!("Column '{column}' not found in {}", self.tab)))?;
        if name == KEY_COLUMN || col == live.key_col + 1 {
            return Err(OperationResult::error(format!("The {KEY_COLUMN} column cannot be changed")));
        }
        let row = self.live_row(live, key)?;
        let mut plan = WritePlan::new(live);
        plan.set(row, col, value, format!("{key} {name}"));
        let result = OperationResult::success(format!("Updated {name} to '{value}' for {key}"))
            .with_detail("mcf", key)
            .with_detail("column", name)
            .with_detail("value", value);
        Ok((plan, result))
    }
}

/// One line per result, prefixed with its status icon.
pub fn summarize(results: &[OperationResult]) -> String {
    results
        .iter()
        .map(|r| format!("{} {}", r.status.icon(), r.message))
        .collect::<Vec<_>>()
        .join("\n")
}
