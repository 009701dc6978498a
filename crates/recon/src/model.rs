use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::table::{Row, Table};

// ---------------------------------------------------------------------------
// Master Reconciliation columns
// ---------------------------------------------------------------------------

pub const KEY_COLUMN: &str = "MCF Number";
pub const CUSTOMER_NAME: &str = "Customer Name";
pub const LOAN_PRODUCT: &str = "Loan Product";
pub const LOAN_AMOUNT: &str = "Loan Amount";
pub const CP1_NAME: &str = "CP1 Name";
pub const CP1_CODE: &str = "CP1 Code";
pub const EXPECTED_CP1_PAYOUT: &str = "Expected CP1 Payout";
pub const ACTUAL_CP1_PAYOUT: &str = "Actual CP1 Payout";
pub const CP2_NAME: &str = "CP2 Name";
pub const CP2_CODE: &str = "CP2 Code";
pub const EXPECTED_CP2_PAYOUT: &str = "Expected CP2 Payout";
pub const ACTUAL_CP2_PAYOUT: &str = "Actual CP2 Payout";
pub const NET_PL: &str = "Net Profit/Loss";
pub const DISBURSED_GROSS_REVENUE: &str = "Disbursed Gross Revenue";
pub const EXPECTED_DISBURSED_GROSS_REVENUE: &str = "Expected Disbursed Gross Revenue";
pub const TAXABLE_AMOUNT: &str = "Taxable Amount (Invoice)";

// Tracking columns, appended by mutations on first use.
pub const REVIEW_STATUS: &str = "Review Status";
pub const REVIEW_DATE: &str = "Review Date";
pub const ADJUSTED_PL: &str = "Adjusted P&L";
pub const ADJUSTMENT_NOTE: &str = "Adjustment Note";
pub const PAYOUT_STATUS: &str = "Payout Status";

const NUMERIC_COLUMNS: &[&str] = &[
    LOAN_AMOUNT,
    EXPECTED_CP1_PAYOUT,
    ACTUAL_CP1_PAYOUT,
    EXPECTED_CP2_PAYOUT,
    ACTUAL_CP2_PAYOUT,
    NET_PL,
    DISBURSED_GROSS_REVENUE,
    EXPECTED_DISBURSED_GROSS_REVENUE,
    TAXABLE_AMOUNT,
    ADJUSTED_PL,
];

pub fn is_numeric_column(name: &str) -> bool {
    NUMERIC_COLUMNS.contains(&name)
}

// ---------------------------------------------------------------------------
// Deal view
// ---------------------------------------------------------------------------

/// Typed read access to one Master Reconciliation row.
#[derive(Debug, Clone, Copy)]
pub struct Deal<'a>(pub Row<'a>);

impl<'a> Deal<'a> {
    pub fn key(&self) -> String {
        self.0.text(KEY_COLUMN).unwrap_or_default().trim().to_string()
    }

    pub fn customer(&self) -> String {
        self.0.text_or(CUSTOMER_NAME, "N/A")
    }

    pub fn cp1_name(&self) -> String {
        self.0.text_or(CP1_NAME, "N/A")
    }

    /// CP2 is absent when its name is blank, regardless of payout values.
    pub fn has_cp2(&self) -> bool {
        self.0
            .get(CP2_NAME)
            .map_or(false, |v| !v.is_blank())
    }

    pub fn net_pl(&self) -> f64 {
        self.0.number(NET_PL)
    }

    pub fn row(&self) -> Row<'a> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// P&L summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PnlSummary {
    pub records: usize,
    pub total_pl: f64,
    pub profitable: usize,
    pub losses: usize,
}

impl PnlSummary {
    pub fn compute(table: &Table) -> Self {
        let mut summary = Self { records: table.len(), total_pl: 0.0, profitable: 0, losses: 0 };
        for row in table.rows() {
            let pl = row.number(NET_PL);
            summary.total_pl += pl;
            if pl > 0.0 {
                summary.profitable += 1;
            } else if pl < 0.0 {
                summary.losses += 1;
            }
        }
        summary
    }

    pub fn break_even(&self) -> usize {
        self.records - self.profitable - self.losses
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// A requested write against the live sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum Action {
    CoverLoss { loss_mcf: String, profit_mcf: String },
    MarkReviewed { mcf: String },
    UpdateValue { mcf: String, column: String, value: String },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CoverLoss { .. } => "cover_loss",
            Self::MarkReviewed { .. } => "mark_reviewed",
            Self::UpdateValue { .. } => "update_value",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CoverLoss { loss_mcf, profit_mcf } => {
                write!(f, "cover_loss(loss={loss_mcf}, profit={profit_mcf})")
            }
            Self::MarkReviewed { mcf } => write!(f, "mark_reviewed({mcf})"),
            Self::UpdateValue { mcf, column, value } => {
                write!(f, "update_value({mcf}, {column:?} = {value:?})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Warning,
    Error,
}

impl OperationStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

/// Outcome of one mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub status: OperationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: OperationStatus::Success, message: message.into(), details: BTreeMap::new() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { status: OperationStatus::Warning, message: message.into(), details: BTreeMap::new() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: OperationStatus::Error, message: message.into(), details: BTreeMap::new() }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == OperationStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str, &str)]) -> Table {
        Table::from_grid(
            vec![KEY_COLUMN.into(), NET_PL.into(), CP2_NAME.into()],
            rows.iter()
                .map(|(k, pl, cp2)| vec![k.to_string(), pl.to_string(), cp2.to_string()])
                .collect(),
        )
    }

    #[test]
    fn summary_counts_signs() {
        let t = table(&[
            ("MCF-20250101-0001", "1000", ""),
            ("MCF-20250101-0002", "-300", ""),
            ("MCF-20250101-0003", "0", ""),
        ]);
        let s = PnlSummary::compute(&t);
        assert_eq!(s.records, 3);
        assert_eq!(s.total_pl, 700.0);
        assert_eq!(s.profitable, 1);
        assert_eq!(s.losses, 1);
        assert_eq!(s.break_even(), 1);
    }

    #[test]
    fn cp2_absence_uses_name() {
        let t = table(&[("MCF-20250101-0001", "0", "  "), ("MCF-20250101-0002", "0", "Ravi")]);
        assert!(!Deal(t.row(0).unwrap()).has_cp2());
        assert!(Deal(t.row(1).unwrap()).has_cp2());
    }

    #[test]
    fn action_serializes_tagged() {
        let a = Action::MarkReviewed { mcf: "MCF-20250101-0001".into() };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "mark_reviewed");
        assert_eq!(json["params"]["mcf"], "MCF-20250101-0001");
    }

    #[test]
    fn operation_status_lowercase() {
        let r = OperationResult::warning("partial").with_detail("loss_adjusted", -600.0);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(json["details"]["loss_adjusted"], -600.0);
        let ok = serde_json::to_value(OperationResult::success("ok")).unwrap();
        assert!(ok.get("details").is_none());
    }
}
