//! Tiered text search over table columns.
//!
//! Tiers are tried in order across every listed column: exact (case-insensitive),
//! then substring, then all-words-present for multi-word queries. The first tier
//! that matches anything wins; rows keep table order.

use crate::table::{Row, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Contains,
    AllWords,
}

/// Rows matched by [`search`] and the tier that produced them.
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub tier: MatchTier,
    pub rows: Vec<Row<'a>>,
}

/// Search `columns` of `table` for `query`. Columns missing from the table are
/// skipped. Returns `None` when nothing matches or the query is blank.
pub fn search<'a>(table: &'a Table, columns: &[&str], query: &str) -> Option<SearchHit<'a>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let columns: Vec<&str> = columns.iter().copied().filter(|c| table.has_column(c)).collect();

    let exact = |cell: &str| cell == needle;
    let contains = |cell: &str| cell.contains(needle.as_str());
    let words: Vec<&str> = needle.split_whitespace().collect();
    let all_words = |cell: &str| words.iter().all(|w| cell.contains(w));

    let tiers: [(MatchTier, &dyn Fn(&str) -> bool); 3] = [
        (MatchTier::Exact, &exact),
        (MatchTier::Contains, &contains),
        (MatchTier::AllWords, &all_words),
    ];

    for (tier, pred) in tiers {
        if tier == MatchTier::AllWords && words.len() < 2 {
            break;
        }
        for column in &columns {
            let rows: Vec<Row<'a>> = table
                .rows()
                .filter(|r| {
                    r.get(column)
                        .map_or(false, |v| pred(&v.display().trim().to_lowercase()))
                })
                .collect();
            if !rows.is_empty() {
                log::debug!("search {:?} matched {} row(s) in '{}' ({:?})", query, rows.len(), column, tier);
                return Some(SearchHit { tier, rows });
            }
        }
    }
    None
}

/// Convenience wrapper returning just the rows.
pub fn search_rows<'a>(table: &'a Table, columns: &[&str], query: &str) -> Vec<Row<'a>> {
    search(table, columns, query).map(|h| h.rows).unwrap_or_default()
}
