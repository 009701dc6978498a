//! Compact description of the loaded data, handed to the AI assistant.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::loader::LoadReport;
use crate::model::*;

const SAMPLE_COLUMNS: &[&str] = &[
    KEY_COLUMN,
    CUSTOMER_NAME,
    CP1_NAME,
    CP2_NAME,
    ACTUAL_CP1_PAYOUT,
    ACTUAL_CP2_PAYOUT,
    NET_PL,
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataContext {
    /// Row count per loaded tab.
    pub tabs: Vec<(String, usize)>,
    pub records: usize,
    pub total_pl: f64,
    pub profitable: usize,
    pub losses: usize,
    pub samples: Vec<BTreeMap<String, String>>,
}

impl DataContext {
    /// Build from a load report, keeping up to `sample_limit` master rows.
    pub fn from_report(report: &LoadReport, sample_limit: usize) -> Self {
        let mut ctx = Self { tabs: report.row_counts(), ..Default::default() };
        let Some(master) = report.master() else {
            return ctx;
        };
        let summary = PnlSummary::compute(master);
        ctx.records = summary.records;
        ctx.total_pl = summary.total_pl;
        ctx.profitable = summary.profitable;
        ctx.losses = summary.losses;
        ctx.samples = master
            .rows()
            .take(sample_limit)
            .map(|row| {
                SAMPLE_COLUMNS
                    .iter()
                    .filter(|c| row.has(c))
                    .map(|c| (c.to_string(), row.text(c).unwrap_or_default()))
                    .collect()
            })
            .collect();
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{SheetLayout, TabSpec};
    use crate::loader::load_workbook;
    use crate::workbook::MemoryWorkbook;

    #[test]
    fn test_context_from_report() {
        let wb = MemoryWorkbook::new().with_tab(
            "M",
            vec![
                vec![KEY_COLUMN.into(), NET_PL.into(), "Secret".into()],
                vec!["MCF-20250101-0001".into(), "100".into(), "x".into()],
                vec!["MCF-20250101-0002".into(), "-40".into(), "y".into()],
            ],
        );
        let layout = SheetLayout { master: "M".into(), tabs: vec![TabSpec { name: "M".into(), columns: None }] };
        let ctx = DataContext::from_report(&load_workbook(&wb, &layout), 1);
        assert_eq!(ctx.tabs, vec![("M".to_string(), 2)]);
        assert_eq!(ctx.records, 2);
        assert_eq!(ctx.total_pl, 60.0);
        assert_eq!(ctx.samples.len(), 1);
        assert_eq!(ctx.samples[0][NET_PL], "100");
        assert!(!ctx.samples[0].contains_key("Secret"));
    }

    #[test]
    fn test_context_without_master() {
        let ctx = DataContext::from_report(&LoadReport::default(), 5);
        assert_eq!(ctx.records, 0);
        assert!(ctx.samples.is_empty());
    }
}
