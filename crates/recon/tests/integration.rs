use std::path::PathBuf;

use mcfdesk_recon::model::{ADJUSTED_PL, NET_PL};
use mcfdesk_recon::{
    load_workbook, respond, Action, Grid, MemoryWorkbook, Mutator, OperationStatus, Reply, SheetLayout,
    Style, TabOutcome,
};

const MASTER: &str = "Master Reconciliation";

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_grid(name: &str) -> Grid {
    let path = fixtures_dir().join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    text.lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

fn workbook() -> MemoryWorkbook {
    MemoryWorkbook::new()
        .with_tab(MASTER, read_grid("master.csv"))
        .with_tab("04_Invoice", read_grid("invoice.csv"))
}

fn layout() -> SheetLayout {
    let toml = std::fs::read_to_string(fixtures_dir().join("layout.toml")).unwrap();
    SheetLayout::from_toml(&toml).unwrap()
}

fn answer(reply: Reply) -> String {
    match reply {
        Reply::Answer { message } => message,
        other => panic!("expected answer, got {other:?}"),
    }
}

// -------------------------------------------------------------------------
// Load
// -------------------------------------------------------------------------

#[test]
fn load_skips_missing_tab() {
    let report = load_workbook(&workbook(), &layout());
    assert_eq!(report.outcomes[0].1, TabOutcome::Loaded { rows: 1 });
    assert!(matches!(report.outcomes[1].1, TabOutcome::Failed { .. }));
    assert_eq!(report.outcomes[2].1, TabOutcome::Loaded { rows: 3 });
    assert_eq!(report.master().unwrap().len(), 3);
}

// -------------------------------------------------------------------------
// Chat answers
// -------------------------------------------------------------------------

#[test]
fn summary_after_load() {
    let report = load_workbook(&workbook(), &layout());
    let text = answer(respond(report.master(), "Give me a summary", &Style::default()));
    assert!(text.contains("Total MCFs: 3"));
    assert!(text.contains("Total P&L: **₹700**"));
    assert!(text.contains("Profitable: 1 MCFs"));
    assert!(text.contains("Losses: 1 MCFs"));
}

#[test]
fn partner_search_substring() {
    let report = load_workbook(&workbook(), &layout());
    let text = answer(respond(report.master(), "Show MCFs for partner Ganesh", &Style::default()));
    assert!(text.contains("Found 1 MCF(s) for partner 'Ganesh'"));
    assert!(text.contains("MCF-20250428-0589"));
    assert!(text.contains("Role: CP1 - Shree Ganesh Loans"));
}

#[test]
fn currency_symbol_from_style() {
    let report = load_workbook(&workbook(), &layout());
    let style = Style { currency: "Rs ".into(), ..Style::default() };
    let text = answer(respond(report.master(), "show profit", &style));
    assert!(text.contains("Profit: **Rs 1,000**"));
}

// -------------------------------------------------------------------------
// Cover loss end to end
// -------------------------------------------------------------------------

#[test]
fn cover_biggest_loss_then_reload() {
    let mut wb = workbook();
    let layout = layout();
    let report = load_workbook(&wb, &layout);
    let master = report.master().unwrap();

    let actions = match respond(Some(master), "Cover biggest loss with biggest profit", &Style::default()) {
        Reply::Action { actions, .. } => actions,
        other => panic!("expected action, got {other:?}"),
    };
    assert_eq!(
        actions,
        vec![Action::CoverLoss {
            loss_mcf: "MCF-20250428-0589".into(),
            profit_mcf: "MCF-20250428-0588".into(),
        }]
    );

    let results = Mutator::new(MASTER).apply_all(&mut wb, master, &actions);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, OperationStatus::Success);

    let reloaded = load_workbook(&wb, &layout);
    let master = reloaded.master().unwrap();
    let profit = master.find_by_key("MCF-20250428-0588").unwrap();
    let loss = master.find_by_key("MCF-20250428-0589").unwrap();
    assert_eq!(profit.number(ADJUSTED_PL), 700.0);
    assert_eq!(loss.number(ADJUSTED_PL), 0.0);
    // Net P&L itself is untouched
    assert_eq!(loss.number(NET_PL), -300.0);
}
