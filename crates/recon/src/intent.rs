//! Keyword intent classification.
//!
//! Rules are data: each [`Intent`] owns a [`Trigger`] and the table is walked in
//! priority order. The first trigger that fires decides the intent.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// `MCF-<8 digits>-<4 digits>`, any case.
pub fn key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bMCF-\d{8}-\d{4}\b").expect("static regex"))
}

/// Whether `s` is exactly one well-formed MCF key.
pub fn is_key(s: &str) -> bool {
    key_pattern()
        .find(s.trim())
        .map_or(false, |m| m.start() == 0 && m.end() == s.trim().len())
}

/// A user message, pre-processed once for every rule.
#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub lower: String,
    /// Keys in order of appearance, upper-cased. Repeats are kept.
    pub keys: Vec<String>,
}

impl Message {
    pub fn parse(text: &str) -> Self {
        let text = text.trim().to_string();
        let lower = text.to_lowercase();
        let keys = key_pattern()
            .find_iter(&text)
            .map(|m| m.as_str().to_uppercase())
            .collect();
        Self { text, lower, keys }
    }

    pub fn first_key(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    pub fn mentions(&self, word: &str) -> bool {
        self.lower.contains(word)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CoverLoss,
    MarkReviewed,
    UpdateValue,
    PartnerRoster,
    PartnerLookup,
    ProfitLossList,
    Summary,
    CustomerLookup,
    RecordDetail,
    Help,
}

impl Intent {
    /// Intents that propose writes to the sheet.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::CoverLoss | Self::MarkReviewed | Self::UpdateValue)
    }
}

/// Keyword predicate over a lower-cased message.
///
/// Every `all_of` word must be present, at least one `any_of` word must be
/// present when the list is non-empty, and `requires_key` demands an MCF key.
#[derive(Debug, Clone, Copy)]
pub struct Trigger {
    pub all_of: &'static [&'static str],
    pub any_of: &'static [&'static str],
    pub requires_key: bool,
}

impl Trigger {
    pub fn matches(&self, msg: &Message) -> bool {
        self.all_of.iter().all(|w| msg.mentions(w))
            && (self.any_of.is_empty() || self.any_of.iter().any(|w| msg.mentions(w)))
            && (!self.requires_key || !msg.keys.is_empty())
    }
}

const fn words(all_of: &'static [&'static str], any_of: &'static [&'static str]) -> Trigger {
    Trigger { all_of, any_of, requires_key: false }
}

/// Priority-ordered rule table. `Help` is last and always fires.
pub const RULES: &[(Intent, Trigger)] = &[
    (Intent::CoverLoss, words(&["cover", "loss"], &[])),
    (Intent::MarkReviewed, words(&["mark", "review"], &[])),
    (
        Intent::UpdateValue,
        Trigger { all_of: &[" to "], any_of: &["set ", "update ", "change "], requires_key: true },
    ),
    (
        Intent::PartnerRoster,
        words(
            &[],
            &["all partners", "list partners", "partner list", "partner roster", "list of partners"],
        ),
    ),
    (Intent::PartnerLookup, words(&[], &["cp1", "cp2", "channel partner", "partner"])),
    (Intent::ProfitLossList, words(&["show"], &["profit", "loss"])),
    (Intent::Summary, words(&["summary"], &[])),
    (Intent::CustomerLookup, words(&["customer"], &[])),
    (Intent::RecordDetail, Trigger { all_of: &[], any_of: &[], requires_key: true }),
    (Intent::Help, words(&[], &[])),
];

pub fn classify(msg: &Message) -> Intent {
    RULES
        .iter()
        .find(|(_, trigger)| trigger.matches(msg))
        .map_or(Intent::Help, |(intent, _)| *intent)
}
