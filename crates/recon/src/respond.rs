//! Rule handlers: turn a classified message into a chat reply.
//!
//! Handlers are pure functions over the master [`Table`]. Mutation intents never
//! write anything here; they return [`Reply::Action`] for the mutator.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::format::format_currency;
use crate::intent::{classify, Intent, Message};
use crate::model::*;
use crate::search::search_rows;
use crate::table::{Row, Table};

pub const NO_DATA_MESSAGE: &str = "⚠️ No data loaded. Please reload the data.";

const SUGGESTION_LIMIT: usize = 5;
const ROSTER_LIMIT: usize = 30;

const PARTNER_STOPWORDS: &[&str] = &[
    "show", "me", "all", "mcf", "mcfs", "for", "partner", "partners", "cp1", "cp2", "named", "is",
    "who", "the", "deals", "deal", "with", "find", "list", "channel", "name",
];

const CUSTOMER_STOPWORDS: &[&str] = &[
    "show", "me", "all", "mcf", "mcfs", "for", "customer", "customers", "named", "is", "who",
    "the", "deals", "deal", "with", "find", "list", "name", "details",
];

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Rendering options.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub currency: String,
    /// Cap for profit/loss lists.
    pub list_limit: usize,
    /// Cap for partner and customer matches.
    pub match_limit: usize,
}

impl Default for Style {
    fn default() -> Self {
        Self { currency: "₹".to_string(), list_limit: 20, match_limit: 15 }
    }
}

impl Style {
    pub fn money(&self, value: f64) -> String {
        format_currency(&self.currency, value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Answer { message: String },
    Action { explanation: String, actions: Vec<Action> },
    Error { message: String },
}

impl Reply {
    pub fn answer(message: impl Into<String>) -> Self {
        Self::Answer { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    /// Text shown to the user before any action results.
    pub fn text(&self) -> &str {
        match self {
            Self::Answer { message } | Self::Error { message } => message,
            Self::Action { explanation, .. } => explanation,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Classify and answer `text`. `master` is `None` when nothing is loaded.
pub fn respond(master: Option<&Table>, text: &str, style: &Style) -> Reply {
    let Some(table) = master else {
        return Reply::error(NO_DATA_MESSAGE);
    };
    let msg = Message::parse(text);
    respond_to(table, &msg, classify(&msg), style)
}

/// Answer an already-classified message.
pub fn respond_to(table: &Table, msg: &Message, intent: Intent, style: &Style) -> Reply {
    log::debug!("intent {:?} for {:?}", intent, msg.text);
    match intent {
        Intent::CoverLoss => cover_loss(table, msg, style),
        Intent::MarkReviewed => mark_reviewed(msg),
        Intent::UpdateValue => update_value(table, msg),
        Intent::PartnerRoster => partner_roster(table, style),
        Intent::PartnerLookup => partner_lookup(table, msg, style),
        Intent::ProfitLossList => profit_loss_list(table, msg, style),
        Intent::Summary => summary(table, style),
        Intent::CustomerLookup => customer_lookup(table, msg, style),
        Intent::RecordDetail => record_detail(table, msg, style),
        Intent::Help => help(table),
    }
}

/// Search text from a message: the first quoted phrase if any, otherwise the
/// words left after dropping stopwords and anything shorter than three chars.
pub fn extract_query(text: &str, stopwords: &[&str]) -> String {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let quoted = QUOTED.get_or_init(|| Regex::new(r#"["']([^"']+)["']"#).expect("static regex"));
    if let Some(caps) = quoted.captures(text) {
        return caps[1].trim().to_string();
    }
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, '?' | '!' | '.' | ',' | ':' | ';')))
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !stopwords.contains(&w.to_lowercase().as_str()))
        .filter(|w| !crate::intent::is_key(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn not_found(key: &str, table: &Table) -> Reply {
    Reply::answer(format!(
        "❌ **MCF {key} not found in Master Reconciliation.**\n\n\
         💡 The sheet has {} MCFs loaded.\n\
         Try: 'Give me a summary' or 'Show all partners' to see what's available.",
        table.len()
    ))
}

fn payout_line(out: &mut String, row: &Row, column: &str, label: &str, style: &Style) {
    if row.has(column) {
        out.push_str(&format!("{label}{}\n", style.money(row.number(column))));
    }
}

// ---------------------------------------------------------------------------
// Partner lookup
// ---------------------------------------------------------------------------

fn partner_lookup(table: &Table, msg: &Message, style: &Style) -> Reply {
    match msg.first_key() {
        Some(key) => partners_for_key(table, msg, key, style),
        None => partners_by_name(table, msg, style),
    }
}

fn partners_for_key(table: &Table, msg: &Message, key: &str, style: &Style) -> Reply {
    let Some(row) = table.find_by_key(key) else {
        return not_found(key, table);
    };
    let deal = Deal(row);
    let cp1_only = msg.mentions("cp1") && !msg.mentions("cp2");
    let cp2_only = msg.mentions("cp2") && !msg.mentions("cp1");

    let mut out = String::new();
    if cp1_only {
        out.push_str(&format!("**🤝 CP1 for {key}:**\n\n"));
        out.push_str(&format!("👤 **Name:** {}\n", row.text_or(CP1_NAME, "Not available")));
        out.push_str(&format!("🔖 **Code:** {}\n", row.text_or(CP1_CODE, "N/A")));
        payout_line(&mut out, &row, EXPECTED_CP1_PAYOUT, "💰 **Expected Payout:** ", style);
        payout_line(&mut out, &row, ACTUAL_CP1_PAYOUT, "💰 **Actual Payout:** ", style);
        out.push_str(&format!("\n📦 **Customer:** {}\n", deal.customer()));
        out.push_str(&format!("💵 **Deal P&L:** {}\n", style.money(deal.net_pl())));
    } else if cp2_only {
        out.push_str(&format!("**🤝 CP2 for {key}:**\n\n"));
        if deal.has_cp2() {
            out.push_str(&format!("👤 **Name:** {}\n", row.text_or(CP2_NAME, "N/A")));
            out.push_str(&format!("🔖 **Code:** {}\n", row.text_or(CP2_CODE, "N/A")));
            payout_line(&mut out, &row, EXPECTED_CP2_PAYOUT, "💰 **Expected Payout:** ", style);
            payout_line(&mut out, &row, ACTUAL_CP2_PAYOUT, "💰 **Actual Payout:** ", style);
        } else {
            out.push_str("ℹ️ **Note:** This MCF has no CP2 partner.\n");
        }
        out.push_str(&format!("\n📦 **Customer:** {}\n", deal.customer()));
    } else {
        out.push_str(&format!("**🤝 Channel Partners for {key}:**\n\n"));
        out.push_str("**👥 CP1 (Channel Partner 1):**\n");
        out.push_str(&format!("• Name: {}\n", row.text_or(CP1_NAME, "Not available")));
        out.push_str(&format!("• Code: {}\n", row.text_or(CP1_CODE, "N/A")));
        payout_line(&mut out, &row, EXPECTED_CP1_PAYOUT, "• Expected: ", style);
        payout_line(&mut out, &row, ACTUAL_CP1_PAYOUT, "• Actual: ", style);
        out.push_str("\n**👥 CP2 (Channel Partner 2):**\n");
        if deal.has_cp2() {
            out.push_str(&format!("• Name: {}\n", row.text_or(CP2_NAME, "N/A")));
            out.push_str(&format!("• Code: {}\n", row.text_or(CP2_CODE, "N/A")));
            payout_line(&mut out, &row, EXPECTED_CP2_PAYOUT, "• Expected: ", style);
            payout_line(&mut out, &row, ACTUAL_CP2_PAYOUT, "• Actual: ", style);
        } else {
            out.push_str("• ℹ️ This MCF has no CP2 partner\n");
        }
        out.push_str(&format!("\n**📦 Customer:** {}\n", deal.customer()));
        out.push_str(&format!("**💵 Deal P&L:** {}\n", style.money(deal.net_pl())));
    }
    Reply::answer(out)
}

fn partners_by_name(table: &Table, msg: &Message, style: &Style) -> Reply {
    let query = extract_query(&msg.text, PARTNER_STOPWORDS);
    if query.is_empty() {
        return Reply::answer(
            "🤔 **I can help you with partner information!**\n\n\
             **Please specify:**\n\
             • MCF number: 'Who is CP1 for MCF-20250428-0588?'\n\
             • Partner name: 'Show MCFs for partner Kaushalya'\n\n\
             **Examples:**\n\
             • 'CP1 name for MCF-20250428-0588'\n\
             • 'Show all deals for partner \"Kaushalya\"'",
        );
    }

    let cp1 = search_rows(table, &[CP1_NAME], &query);
    let cp2 = search_rows(table, &[CP2_NAME], &query);
    let cp1_keys: HashSet<String> = cp1.iter().map(|r| Deal(*r).key()).collect();
    let cp2_keys: HashSet<String> = cp2.iter().map(|r| Deal(*r).key()).collect();

    let mut seen = HashSet::new();
    let matches: Vec<Row> = cp1
        .iter()
        .chain(cp2.iter())
        .copied()
        .filter(|r| seen.insert(Deal(*r).key()))
        .collect();

    if matches.is_empty() {
        let mut names: BTreeSet<String> = table.distinct(CP1_NAME).into_iter().collect();
        names.extend(table.distinct(CP2_NAME));
        return no_matches("partner", &query, &names, "Show all partners");
    }

    let mut out = format!("**🔍 Found {} MCF(s) for partner '{query}':**\n\n", matches.len());
    for (i, row) in matches.iter().take(style.match_limit).enumerate() {
        let deal = Deal(*row);
        let key = deal.key();
        out.push_str(&format!("**{}. {key}**\n", i + 1));
        out.push_str(&format!("   👤 Customer: {}\n", deal.customer()));
        if cp1_keys.contains(&key) {
            out.push_str(&format!("   🤝 Role: CP1 - {}\n", row.text_or(CP1_NAME, "N/A")));
            out.push_str(&format!("   💰 Payout: {}\n", style.money(row.number(ACTUAL_CP1_PAYOUT))));
        }
        if cp2_keys.contains(&key) {
            out.push_str(&format!("   🤝 Role: CP2 - {}\n", row.text_or(CP2_NAME, "N/A")));
            out.push_str(&format!("   💰 Payout: {}\n", style.money(row.number(ACTUAL_CP2_PAYOUT))));
        }
        out.push_str(&format!("   📊 P&L: {}\n\n", style.money(deal.net_pl())));
    }
    if matches.len() > style.match_limit {
        out.push_str(&format!("... and {} more MCFs\n", matches.len() - style.match_limit));
    }
    Reply::answer(out)
}

fn no_matches(what: &str, query: &str, candidates: &BTreeSet<String>, hint: &str) -> Reply {
    let needle = query.to_lowercase();
    let similar: Vec<&String> = candidates
        .iter()
        .filter(|c| c.to_lowercase().contains(&needle))
        .take(SUGGESTION_LIMIT)
        .collect();

    let mut out = format!("❌ **No MCFs found for {what} '{query}'.**\n\n");
    if similar.is_empty() {
        out.push_str(&format!("💡 Try: '{hint}' to see available names"));
    } else {
        out.push_str("💡 **Did you mean:**\n");
        for name in similar {
            out.push_str(&format!("• {name}\n"));
        }
    }
    Reply::answer(out)
}

// ---------------------------------------------------------------------------
// Partner roster
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RosterEntry {
    cp1_deals: usize,
    cp2_deals: usize,
    paid: f64,
}

fn partner_roster(table: &Table, style: &Style) -> Reply {
    let mut roster: BTreeMap<String, RosterEntry> = BTreeMap::new();
    for row in table.rows() {
        if let Some(name) = row.get(CP1_NAME).filter(|v| !v.is_blank()) {
            let entry = roster.entry(name.display().trim().to_string()).or_default();
            entry.cp1_deals += 1;
            entry.paid += row.number(ACTUAL_CP1_PAYOUT);
        }
        if Deal(row).has_cp2() {
            let name = row.text(CP2_NAME).unwrap_or_default();
            let entry = roster.entry(name.trim().to_string()).or_default();
            entry.cp2_deals += 1;
            entry.paid += row.number(ACTUAL_CP2_PAYOUT);
        }
    }
    if roster.is_empty() {
        return Reply::answer("ℹ️ No partner names found in the data.");
    }

    let mut entries: Vec<(String, RosterEntry)> = roster.into_iter().collect();
    // Stable: ties stay in name order
    entries.sort_by(|a, b| (b.1.cp1_deals + b.1.cp2_deals).cmp(&(a.1.cp1_deals + a.1.cp2_deals)));

    let mut out = format!("**🤝 Channel Partners ({} found):**\n\n", entries.len());
    for (i, (name, e)) in entries.iter().take(ROSTER_LIMIT).enumerate() {
        out.push_str(&format!(
            "{}. **{name}**: CP1 in {} deal(s), CP2 in {} deal(s), paid {}\n",
            i + 1,
            e.cp1_deals,
            e.cp2_deals,
            style.money(e.paid)
        ));
    }
    if entries.len() > ROSTER_LIMIT {
        out.push_str(&format!("... and {} more partners\n", entries.len() - ROSTER_LIMIT));
    }
    Reply::answer(out)
}

// ---------------------------------------------------------------------------
// Lists and summary
// ---------------------------------------------------------------------------

fn profit_loss_list(table: &Table, msg: &Message, style: &Style) -> Reply {
    if !table.has_column(NET_PL) {
        return Reply::error(format!("{NET_PL} column not found in data"));
    }
    let profit = msg.mentions("profit");

    let mut rows: Vec<Row> = table
        .rows()
        .filter(|r| {
            let pl = r.number(NET_PL);
            if profit { pl > 0.0 } else { pl < 0.0 }
        })
        .collect();
    if profit {
        rows.sort_by(|a, b| b.number(NET_PL).total_cmp(&a.number(NET_PL)));
    } else {
        rows.sort_by(|a, b| a.number(NET_PL).total_cmp(&b.number(NET_PL)));
    }

    if rows.is_empty() {
        return Reply::answer(if profit {
            "✅ No profitable MCFs found in data."
        } else {
            "✅ No loss-making MCFs!"
        });
    }

    let (title, label) = if profit {
        (format!("**📈 Profitable MCFs ({} found):**\n\n", rows.len()), "   💰 Profit")
    } else {
        (format!("**📉 Loss-Making MCFs ({} found):**\n\n", rows.len()), "   🔴 Loss")
    };
    let mut out = title;
    for (i, row) in rows.iter().take(style.list_limit).enumerate() {
        let deal = Deal(*row);
        out.push_str(&format!("**{}. {}**\n", i + 1, deal.key()));
        out.push_str(&format!("   👤 {}\n", deal.customer()));
        out.push_str(&format!("{label}: **{}**\n", style.money(deal.net_pl())));
        out.push_str(&format!("   🤝 CP1: {}\n\n", deal.cp1_name()));
    }
    if rows.len() > style.list_limit {
        out.push_str(&format!("... and {} more\n", rows.len() - style.list_limit));
    }
    Reply::answer(out)
}

fn summary(table: &Table, style: &Style) -> Reply {
    let s = PnlSummary::compute(table);
    let mark = if s.total_pl > 0.0 { "✅" } else { "🔴" };
    Reply::answer(format!(
        "**📊 P&L Summary:**\n\n\
         **Overall:**\n\
         • Total MCFs: {}\n\
         • Total P&L: **{}** {mark}\n\n\
         **Breakdown:**\n\
         • Profitable: {} MCFs\n\
         • Losses: {} MCFs\n\n\
         💡 Ask me about specific MCFs or partners!\n",
        s.records,
        style.money(s.total_pl),
        s.profitable,
        s.losses,
    ))
}

pub fn help(table: &Table) -> Reply {
    Reply::answer(format!(
        "🤔 **I'm here to help! Try asking:**\n\n\
         **🔍 Find Partners:**\n\
         • \"Who is CP1 for MCF-20250428-0588?\"\n\
         • \"Show all MCFs for partner Kaushalya\"\n\
         • \"CP1 and CP2 for MCF-20250428-0588\"\n\
         • \"Show all partners\"\n\n\
         **📊 View Data:**\n\
         • \"Show profitable MCFs\"\n\
         • \"Show loss MCFs\"\n\
         • \"Give me a summary\"\n\
         • \"Customer for MCF-20250428-0588\"\n\n\
         **✏️ Update Sheet:**\n\
         • \"Cover biggest loss with biggest profit\"\n\
         • \"Mark MCF-20250428-0588 as reviewed\"\n\
         • \"Set Payout Status for MCF-20250428-0588 to Paid\"\n\n\
         **Current Data:** {} MCFs loaded\n\n\
         **What would you like to know?**\n",
        table.len()
    ))
}

// ---------------------------------------------------------------------------
// Customer and record detail
// ---------------------------------------------------------------------------

fn customer_lookup(table: &Table, msg: &Message, style: &Style) -> Reply {
    if let Some(key) = msg.first_key() {
        let Some(row) = table.find_by_key(key) else {
            return not_found(key, table);
        };
        let deal = Deal(row);
        let mut out = format!("**👤 Customer for {key}:**\n\n");
        out.push_str(&format!("👤 **Name:** {}\n", deal.customer()));
        out.push_str(&format!("📦 **Loan Product:** {}\n", row.text_or(LOAN_PRODUCT, "N/A")));
        payout_line(&mut out, &row, LOAN_AMOUNT, "💰 **Loan Amount:** ", style);
        out.push_str(&format!("💵 **Deal P&L:** {}\n", style.money(deal.net_pl())));
        return Reply::answer(out);
    }

    let query = extract_query(&msg.text, CUSTOMER_STOPWORDS);
    if query.is_empty() {
        return Reply::answer(
            "🤔 **Which customer?**\n\n\
             • 'Customer for MCF-20250428-0588'\n\
             • 'Show deals for customer \"Priya Sharma\"'",
        );
    }
    let rows = search_rows(table, &[CUSTOMER_NAME], &query);
    if rows.is_empty() {
        let names: BTreeSet<String> = table.distinct(CUSTOMER_NAME).into_iter().collect();
        return no_matches("customer", &query, &names, "Give me a summary");
    }

    let mut out = format!("**🔍 Found {} MCF(s) for customer '{query}':**\n\n", rows.len());
    for (i, row) in rows.iter().take(style.match_limit).enumerate() {
        let deal = Deal(*row);
        out.push_str(&format!("**{}. {}**\n", i + 1, deal.key()));
        out.push_str(&format!("   👤 {}\n", deal.customer()));
        out.push_str(&format!("   📦 {}\n", row.text_or(LOAN_PRODUCT, "N/A")));
        out.push_str(&format!("   📊 P&L: {}\n\n", style.money(deal.net_pl())));
    }
    if rows.len() > style.match_limit {
        out.push_str(&format!("... and {} more MCFs\n", rows.len() - style.match_limit));
    }
    Reply::answer(out)
}

fn record_detail(table: &Table, msg: &Message, style: &Style) -> Reply {
    let Some(key) = msg.first_key() else {
        return help(table);
    };
    let Some(row) = table.find_by_key(key) else {
        return not_found(key, table);
    };
    let mut out = format!("**📄 {key}:**\n\n");
    for (header, value) in row.cells() {
        if header.is_empty() || header == KEY_COLUMN {
            continue;
        }
        let shown = if is_numeric_column(header) {
            style.money(value.as_number())
        } else if value.is_blank() {
            "—".to_string()
        } else {
            value.display()
        };
        out.push_str(&format!("• **{header}:** {shown}\n"));
    }
    Reply::answer(out)
}

// ---------------------------------------------------------------------------
// Mutation proposals
// ---------------------------------------------------------------------------

fn cover_loss(table: &Table, msg: &Message, style: &Style) -> Reply {
    let biggest = |want_profit: bool, exclude: &str| -> Option<Row> {
        table
            .rows()
            .filter(|r| !Deal(*r).key().eq_ignore_ascii_case(exclude))
            .filter(|r| if want_profit { r.number(NET_PL) > 0.0 } else { r.number(NET_PL) < 0.0 })
            .reduce(|best, r| {
                let better = if want_profit {
                    r.number(NET_PL) > best.number(NET_PL)
                } else {
                    r.number(NET_PL) < best.number(NET_PL)
                };
                if better { r } else { best }
            })
    };

    let (loss, profit) = match msg.keys.as_slice() {
        [loss_key, profit_key, ..] => {
            let Some(loss) = table.find_by_key(loss_key) else {
                return not_found(loss_key, table);
            };
            let Some(profit) = table.find_by_key(profit_key) else {
                return not_found(profit_key, table);
            };
            (loss, profit)
        }
        [loss_key] => {
            let Some(loss) = table.find_by_key(loss_key) else {
                return not_found(loss_key, table);
            };
            let Some(profit) = biggest(true, loss_key) else {
                return Reply::answer(format!("ℹ️ No profitable MCF available to cover {loss_key}."));
            };
            (loss, profit)
        }
        [] => {
            let Some(loss) = biggest(false, "") else {
                return Reply::answer("✅ No loss-making MCFs to cover!");
            };
            let Some(profit) = biggest(true, "") else {
                return Reply::answer("ℹ️ No profitable MCFs available to cover a loss.");
            };
            (loss, profit)
        }
    };

    let (loss, profit) = (Deal(loss), Deal(profit));
    let (loss_key, profit_key) = (loss.key(), profit.key());
    let loss_amount = loss.net_pl().abs();
    let profit_amount = profit.net_pl();

    let mut explanation = format!(
        "🔄 Cover loss on **{loss_key}** ({}) using profit from **{profit_key}** ({}).\n",
        style.money(loss.net_pl()),
        style.money(profit_amount)
    );
    if profit_amount >= loss_amount {
        explanation.push_str(&format!(
            "Full coverage: {profit_key} keeps {}.",
            style.money(profit_amount - loss_amount)
        ));
    } else if profit_amount > 0.0 {
        explanation.push_str(&format!(
            "Partial coverage: {loss_key} stays at {}.",
            style.money(-(loss_amount - profit_amount))
        ));
    }

    Reply::Action {
        explanation,
        actions: vec![Action::CoverLoss { loss_mcf: loss_key, profit_mcf: profit_key }],
    }
}

fn mark_reviewed(msg: &Message) -> Reply {
    let mut seen = HashSet::new();
    let keys: Vec<&String> = msg.keys.iter().filter(|k| seen.insert(k.as_str())).collect();
    if keys.is_empty() {
        return Reply::answer(
            "🤔 **Which MCF should I mark as reviewed?**\n\n\
             • 'Mark MCF-20250428-0588 as reviewed'",
        );
    }
    let list = keys.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ");
    Reply::Action {
        explanation: format!("📝 Mark {list} as reviewed."),
        actions: keys
            .into_iter()
            .map(|k| Action::MarkReviewed { mcf: k.clone() })
            .collect(),
    }
}

fn update_pattern() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(
                r"(?i)\b(?:set|update|change)\s+(?:the\s+)?(?P<column>.+?)\s+(?:for|of|on|in)\s+(?P<key>MCF-\d{8}-\d{4})\s+to\s+(?P<value>.+?)\s*$",
            )
            .expect("static regex"),
            Regex::new(
                r"(?i)\b(?:set|update|change)\s+(?P<key>MCF-\d{8}-\d{4})(?:'s)?\s+(?P<column>.+?)\s+to\s+(?P<value>.+?)\s*$",
            )
            .expect("static regex"),
        ]
    })
}

/// Parse `set <column> for <MCF> to <value>` (or `set <MCF> <column> to <value>`).
pub fn parse_update(table: &Table, text: &str) -> Option<Action> {
    let caps = update_pattern().iter().find_map(|re| re.captures(text))?;
    let key = caps["key"].to_uppercase();
    let raw_column = caps["column"].trim();
    let column = table
        .resolve_column(raw_column)
        .map(str::to_string)
        .unwrap_or_else(|| raw_column.to_string());
    let value = caps["value"]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    Some(Action::UpdateValue { mcf: key, column, value })
}

fn update_value(table: &Table, msg: &Message) -> Reply {
    match parse_update(table, &msg.text) {
        Some(action) => {
            let Action::UpdateValue { mcf, column, value } = &action else {
                return Reply::error("Could not parse the update request");
            };
            Reply::Action {
                explanation: format!("✏️ Set **{column}** for {mcf} to '{value}'."),
                actions: vec![action.clone()],
            }
        }
        None => Reply::answer(
            "🤔 **To update a value, say:**\n\n\
             • 'Set Payout Status for MCF-20250428-0588 to Paid'\n\
             • 'Update Adjustment Note for MCF-20250428-0588 to \"waived\"'",
        ),
    }
}
