//! In-memory row table built from a worksheet grid.
//!
//! Known numeric columns are coerced once at build time; everything else is kept
//! as text. Coercion is lossy: blank and unparseable cells both become `0`.

use std::collections::{BTreeSet, HashMap};

use crate::model::{is_numeric_column, KEY_COLUMN};

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Display string used for searching and rendering raw values.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_plain(*n),
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Self::Text(s) => parse_amount(s),
            Self::Number(n) => *n,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

/// Lenient numeric coercion: grouping commas, currency markers and accounting
/// parentheses are accepted; anything else unparseable is `0`.
pub fn parse_amount(raw: &str) -> f64 {
    let mut s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    let parenthesized = s.len() > 2 && s.starts_with('(') && s.ends_with(')');
    if parenthesized {
        s = &s[1..s.len() - 1];
    }
    let s = s.trim().trim_start_matches("Rs.").trim_start_matches("INR");
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '₹' | '$' | ' ' | '\u{a0}'))
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            if parenthesized {
                -v
            } else {
                v
            }
        }
        _ => 0.0,
    }
}

/// Shortest text that parses back to `value`: whole numbers without a fraction.
pub fn format_plain(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        // Avoid "-0"
        if value == 0.0 {
            return "0".to_string();
        }
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build from header names and raw string rows. Headers are trimmed, short
    /// rows are padded, and numeric columns are coerced.
    pub fn from_grid(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let mut index = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.clone()).or_insert(i);
        }
        let numeric: Vec<bool> = headers.iter().map(|h| is_numeric_column(h)).collect();

        let rows = rows
            .into_iter()
            .map(|raw| {
                (0..headers.len())
                    .map(|i| {
                        let cell = raw.get(i).cloned().unwrap_or_default();
                        if numeric[i] {
                            CellValue::Number(parse_amount(&cell))
                        } else {
                            CellValue::Text(cell)
                        }
                    })
                    .collect()
            })
            .collect();

        Self { headers, index, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Header matching `name` ignoring case and surrounding whitespace.
    pub fn resolve_column(&self, name: &str) -> Option<&str> {
        let wanted = name.trim();
        self.headers
            .iter()
            .find(|h| h.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    /// First row whose primary key equals `key` (case-insensitive).
    pub fn find_by_key(&self, key: &str) -> Option<Row<'_>> {
        let wanted = key.trim();
        self.rows()
            .find(|r| r.text(KEY_COLUMN).map_or(false, |k| k.trim().eq_ignore_ascii_case(wanted)))
    }

    /// Sorted distinct non-blank values of a column.
    pub fn distinct(&self, column: &str) -> Vec<String> {
        let Some(col) = self.column_index(column) else {
            return Vec::new();
        };
        let set: BTreeSet<String> = self
            .rows
            .iter()
            .map(|r| &r[col])
            .filter(|c| !c.is_blank())
            .map(|c| c.display().trim().to_string())
            .collect();
        set.into_iter().collect()
    }

    /// Export back to a header-first grid of display strings.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.headers.clone());
        for row in &self.rows {
            grid.push(row.iter().map(CellValue::display).collect());
        }
        grid
    }
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        let col = self.table.column_index(column)?;
        self.table.rows[self.index].get(col)
    }

    pub fn has(&self, column: &str) -> bool {
        self.table.has_column(column)
    }

    /// Display text of a column, `None` when the column does not exist.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(CellValue::display)
    }

    /// Display text, or `fallback` when the column is missing or blank.
    pub fn text_or(&self, column: &str, fallback: &str) -> String {
        match self.get(column) {
            Some(v) if !v.is_blank() => v.display(),
            _ => fallback.to_string(),
        }
    }

    /// Numeric value; missing columns read as `0`.
    pub fn number(&self, column: &str) -> f64 {
        self.get(column).map_or(0.0, CellValue::as_number)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&'a str, &'a CellValue)> + 'a {
        let table = self.table;
        table
            .headers
            .iter()
            .map(String::as_str)
            .zip(table.rows[self.index].iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CP1_NAME, NET_PL};

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn parse_amount_cases() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("  "), 0.0);
        assert_eq!(parse_amount("0"), 0.0);
        assert_eq!(parse_amount("1200"), 1200.0);
        assert_eq!(parse_amount("-500"), -500.0);
        assert_eq!(parse_amount("1,23,456"), 123456.0);
        assert_eq!(parse_amount("₹1,200"), 1200.0);
        assert_eq!(parse_amount("₹-1,200"), -1200.0);
        assert_eq!(parse_amount("Rs. 450.50"), 450.5);
        assert_eq!(parse_amount("(500)"), -500.0);
        assert_eq!(parse_amount("#N/A"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_amount("abc"), 0.0);
    }

    #[test]
    fn format_plain_roundtrips() {
        assert_eq!(format_plain(700.0), "700");
        assert_eq!(format_plain(-600.0), "-600");
        assert_eq!(format_plain(-0.0), "0");
        assert_eq!(format_plain(12.5), "12.5");
    }

    #[test]
    fn numeric_columns_are_coerced() {
        let t = Table::from_grid(
            s(&["MCF Number ", " Net Profit/Loss", "CP1 Name"]),
            vec![s(&["MCF-20250101-0001", "", "Asha"]), s(&["MCF-20250101-0002", "x"])],
        );
        assert_eq!(t.headers(), &["MCF Number", "Net Profit/Loss", "CP1 Name"]);
        let r0 = t.row(0).unwrap();
        assert_eq!(r0.get(NET_PL), Some(&CellValue::Number(0.0)));
        let r1 = t.row(1).unwrap();
        assert_eq!(r1.number(NET_PL), 0.0);
        // Short row padded with blank text
        assert_eq!(r1.text(CP1_NAME).as_deref(), Some(""));
        assert_eq!(r1.text_or(CP1_NAME, "N/A"), "N/A");
    }

    #[test]
    fn find_by_key_first_match_case_insensitive() {
        let t = Table::from_grid(
            s(&["MCF Number", "Customer Name"]),
            vec![
                s(&["MCF-20250101-0001", "First"]),
                s(&["MCF-20250101-0001", "Duplicate"]),
            ],
        );
        let r = t.find_by_key("mcf-20250101-0001").unwrap();
        assert_eq!(r.text("Customer Name").unwrap(), "First");
        assert!(t.find_by_key("MCF-20250101-0009").is_none());
    }

    #[test]
    fn distinct_skips_blanks() {
        let t = Table::from_grid(
            s(&["CP2 Name"]),
            vec![s(&["B"]), s(&[""]), s(&["A"]), s(&["B "])],
        );
        assert_eq!(t.distinct("CP2 Name"), vec!["A".to_string(), "B".to_string()]);
        assert!(t.distinct("Nope").is_empty());
    }

    #[test]
    fn resolve_column_ignores_case() {
        let t = Table::from_grid(s(&["Payout Status"]), vec![]);
        assert_eq!(t.resolve_column(" payout status "), Some("Payout Status"));
        assert_eq!(t.resolve_column("status"), None);
    }
}
