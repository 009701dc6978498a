//! Conversation loop.
//!
//! A [`ChatSession`] owns the workbook handle, the loaded tables and the
//! transcript between connect and disconnect. Each message is answered in
//! full, including any sheet writes and the reload that follows them, before
//! the next one is taken.

use std::time::Duration;

use mcfdesk_ai::{Assistant, SAMPLE_LIMIT};
use mcfdesk_recon::{
    classify, load_workbook, respond_to, summarize, DataContext, Intent, LoadReport, Message, Mutator,
    OperationResult, OperationStatus, Reply, SheetLayout, Style, Workbook, NO_DATA_MESSAGE,
};
use serde::Serialize;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

pub const AI_FAILURE_MESSAGE: &str = "❌ Could not process the AI response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub role: Role,
    pub text: String,
}

/// Everything produced by one message.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub message: String,
    pub reply: Reply,
    /// One per applied action; empty for answers.
    pub results: Vec<OperationResult>,
    /// True when the tables were reloaded after writing.
    pub reloaded: bool,
    /// Text appended to the transcript.
    pub text: String,
}

impl Turn {
    pub fn has_errors(&self) -> bool {
        matches!(self.reply, Reply::Error { .. }) || self.results.iter().any(OperationResult::is_error)
    }
}

// ============================================================================
// Quick actions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Losses,
    Profits,
    Summary,
    Cover,
    Reload,
    Tabs,
    Clear,
    Quit,
}

impl QuickAction {
    pub const ALL: &'static [QuickAction] = &[
        QuickAction::Losses,
        QuickAction::Profits,
        QuickAction::Summary,
        QuickAction::Cover,
        QuickAction::Reload,
        QuickAction::Tabs,
        QuickAction::Clear,
        QuickAction::Quit,
    ];

    /// Parse a `/command` line. Anything else is a chat message.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "/losses" => Some(Self::Losses),
            "/profits" => Some(Self::Profits),
            "/summary" => Some(Self::Summary),
            "/cover" => Some(Self::Cover),
            "/reload" => Some(Self::Reload),
            "/tabs" => Some(Self::Tabs),
            "/clear" => Some(Self::Clear),
            "/quit" | "/exit" => Some(Self::Quit),
            _ => None,
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            Self::Losses => "/losses",
            Self::Profits => "/profits",
            Self::Summary => "/summary",
            Self::Cover => "/cover",
            Self::Reload => "/reload",
            Self::Tabs => "/tabs",
            Self::Clear => "/clear",
            Self::Quit => "/quit",
        }
    }

    /// The message a shortcut stands for, if it is one.
    pub fn canned_message(&self) -> Option<&'static str> {
        match self {
            Self::Losses => Some("Show me all loss MCFs"),
            Self::Profits => Some("Show me all profitable MCFs"),
            Self::Summary => Some("Give me a summary"),
            Self::Cover => Some("Cover biggest loss with biggest profit"),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Losses => "list loss MCFs",
            Self::Profits => "list profitable MCFs",
            Self::Summary => "P&L summary",
            Self::Cover => "cover the biggest loss with the biggest profit",
            Self::Reload => "reload all tabs",
            Self::Tabs => "show what was loaded",
            Self::Clear => "clear the transcript",
            Self::Quit => "leave",
        }
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct ChatSession {
    workbook: Option<Box<dyn Workbook>>,
    layout: SheetLayout,
    style: Style,
    assistant: Option<Assistant>,
    delay: Duration,
    report: LoadReport,
    transcript: Vec<Entry>,
}

impl ChatSession {
    /// Load every tab of `layout` and start an empty transcript.
    pub fn connect(
        workbook: Box<dyn Workbook>,
        layout: SheetLayout,
        style: Style,
        assistant: Option<Assistant>,
        delay: Duration,
    ) -> Self {
        let report = load_workbook(workbook.as_ref(), &layout);
        log::info!(
            "connected: {} tab(s) loaded, {} failed",
            report.tables.len(),
            report.failures()
        );
        Self {
            workbook: Some(workbook),
            layout,
            style,
            assistant,
            delay,
            report,
            transcript: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.workbook.is_some()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn has_assistant(&self) -> bool {
        self.assistant.is_some()
    }

    pub fn transcript(&self) -> &[Entry] {
        &self.transcript
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Rebuild every table from the workbook.
    pub fn reload(&mut self) -> &LoadReport {
        if let Some(workbook) = self.workbook.as_deref() {
            self.report = load_workbook(workbook, &self.layout);
            log::info!("reloaded {} tab(s)", self.report.tables.len());
        }
        &self.report
    }

    /// Drop the workbook handle, tables and transcript.
    pub fn disconnect(&mut self) {
        self.workbook = None;
        self.assistant = None;
        self.report = LoadReport::default();
        self.transcript.clear();
        log::info!("disconnected");
    }

    /// Answer one message, applying and reloading when it asks for a change.
    pub fn handle(&mut self, text: &str) -> Turn {
        let message = text.trim().to_string();
        self.transcript.push(Entry { role: Role::User, text: message.clone() });

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let reply = self.reply_for(&message);

        let mut results = Vec::new();
        let mut reloaded = false;
        let shown = match &reply {
            Reply::Answer { message } | Reply::Error { message } => message.clone(),
            Reply::Action { explanation, actions } => {
                results = self.apply(actions);
                if results
                    .iter()
                    .any(|r| matches!(r.status, OperationStatus::Success | OperationStatus::Warning))
                {
                    self.reload();
                    reloaded = true;
                }
                format!("{}\n\n{}", explanation, summarize(&results))
            }
        };

        self.transcript.push(Entry { role: Role::Assistant, text: shown.clone() });
        Turn { message, reply, results, reloaded, text: shown }
    }

    fn reply_for(&self, message: &str) -> Reply {
        let Some(master) = self.report.master() else {
            return Reply::error(NO_DATA_MESSAGE);
        };
        let msg = Message::parse(message);
        let intent = classify(&msg);

        match (&self.assistant, intent) {
            (Some(assistant), Intent::Help) => {
                let ctx = DataContext::from_report(&self.report, SAMPLE_LIMIT);
                match assistant.ask(&ctx, message) {
                    Ok(reply) => reply,
                    Err(e) => {
                        log::warn!("AI fallback failed: {}", e);
                        Reply::error(format!("{}: {}", AI_FAILURE_MESSAGE, e))
                    }
                }
            }
            _ => respond_to(master, &msg, intent, &self.style),
        }
    }

    fn apply(&mut self, actions: &[mcfdesk_recon::Action]) -> Vec<OperationResult> {
        let (Some(workbook), Some(master)) = (self.workbook.as_deref_mut(), self.report.master()) else {
            return vec![OperationResult::error(NO_DATA_MESSAGE)];
        };
        let mutator = Mutator::new(self.layout.master.clone()).with_currency(self.style.currency.clone());
        mutator.apply_all(workbook, master, actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcfdesk_recon::layout::TabSpec;
    use mcfdesk_recon::MemoryWorkbook;

    const MASTER: &str = "Master Reconciliation";

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn session() -> ChatSession {
        let wb = MemoryWorkbook::new().with_tab(
            MASTER,
            vec![
                row(&["MCF Number", "Customer Name", "CP1 Name", "CP2 Name", "Net Profit/Loss"]),
                row(&["MCF-20250401-0001", "Asha Rao", "Kaushalya", "", "1000"]),
                row(&["MCF-20250401-0002", "Vikram Iyer", "Shree Ganesh Loans", "Kaushalya", "-300"]),
                row(&["MCF-20250401-0003", "Meena Das", "Shree Ganesh Loans", "", "0"]),
            ],
        );
        let layout = SheetLayout { master: MASTER.into(), tabs: vec![TabSpec { name: MASTER.into(), columns: None }] };
        ChatSession::connect(Box::new(wb), layout, Style::default(), None, Duration::ZERO)
    }

    #[test]
    fn test_quick_action_parse() {
        assert_eq!(QuickAction::parse(" /LOSSES "), Some(QuickAction::Losses));
        assert_eq!(QuickAction::parse("/exit"), Some(QuickAction::Quit));
        assert_eq!(QuickAction::parse("losses"), None);
        for qa in QuickAction::ALL {
            assert_eq!(QuickAction::parse(qa.command()), Some(*qa));
        }
        assert_eq!(QuickAction::Cover.canned_message(), Some("Cover biggest loss with biggest profit"));
        assert!(QuickAction::Tabs.canned_message().is_none());
    }

    #[test]
    fn test_summary_turn() {
        let mut s = session();
        let turn = s.handle("Give me a summary");
        assert!(turn.text.contains("3"));
        assert!(turn.text.contains("₹700"));
        assert!(!turn.reloaded);
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.transcript()[0], Entry { role: Role::User, text: "Give me a summary".into() });
        assert_eq!(s.transcript()[1].role, Role::Assistant);
    }

    #[test]
    fn test_cover_applies_and_reloads() {
        let mut s = session();
        let turn = s.handle("Cover biggest loss with biggest profit");
        assert_eq!(turn.results.len(), 1);
        assert_eq!(turn.results[0].status, OperationStatus::Success);
        assert!(turn.reloaded);

        let master = s.report().master().unwrap();
        assert!(master.has_column("Adjusted P&L"));
        let loss = master.find_by_key("MCF-20250401-0002").unwrap();
        assert_eq!(loss.number("Adjusted P&L"), 0.0);
        let profit = master.find_by_key("MCF-20250401-0001").unwrap();
        assert_eq!(profit.number("Adjusted P&L"), 700.0);
    }

    #[test]
    fn test_unknown_key_review_is_error() {
        let mut s = session();
        let turn = s.handle("mark MCF-20991231-9999 as reviewed");
        assert!(turn.has_errors());
        assert!(!turn.reloaded);
    }

    #[test]
    fn test_help_without_assistant_uses_rules() {
        let mut s = session();
        let turn = s.handle("what's the weather");
        assert!(matches!(turn.reply, Reply::Answer { .. }));
    }

    #[test]
    fn test_disconnect_drops_state() {
        let mut s = session();
        s.handle("summary");
        s.disconnect();
        assert!(!s.is_connected());
        assert!(s.report().master().is_none());

        let turn = s.handle("summary");
        assert_eq!(turn.reply, Reply::error(NO_DATA_MESSAGE));
        assert_eq!(s.transcript().len(), 2);

        s.clear_transcript();
        assert!(s.transcript().is_empty());
    }
}
