// Prompt construction and reply validation

use mcfdesk_recon::intent::is_key;
use mcfdesk_recon::{Action, DataContext, Reply};
use serde::Deserialize;

use crate::client::AskError;

/// Sample records included when privacy mode is off.
pub const SAMPLE_LIMIT: usize = 5;

pub fn build_system_prompt() -> String {
    r#"You are an assistant for an MCF reconciliation sheet. Each MCF is one loan deal identified by a key like MCF-20250428-0588, paid out to up to two channel partners (CP1, CP2), with a signed Net Profit/Loss.

CRITICAL INSTRUCTIONS:
1. Return ONLY valid JSON, no text before or after it
2. Do NOT use markdown code blocks
3. Use exactly one of the two shapes below

ANSWER (information only):
{"type": "answer", "message": "your answer"}

ACTION (a change to the sheet):
{"type": "action", "explanation": "what will change and why", "action": {"type": "<action type>", "params": {...}}}

ACTION TYPES:
- cover_loss: {"loss_mcf": "MCF-...", "profit_mcf": "MCF-..."} offsets a loss MCF with a profitable MCF
- mark_reviewed: {"mcf": "MCF-..."} marks one MCF as reviewed
- update_value: {"mcf": "MCF-...", "column": "<column name>", "value": "<new value>"} sets one cell

Only use MCF keys that appear in the context or the question. If the request is unclear, return an answer asking for the MCF number."#
        .to_string()
}

/// Build the user prompt from the data context and the message.
/// Privacy mode leaves out the sample records.
pub fn build_prompt(ctx: &DataContext, message: &str, privacy_mode: bool) -> String {
    let mut prompt = String::new();

    prompt.push_str("CONTEXT:\n");
    prompt.push_str("Loaded tabs:\n");
    for (tab, rows) in &ctx.tabs {
        prompt.push_str(&format!("- {}: {} rows\n", tab, rows));
    }
    prompt.push_str(&format!("Total MCFs: {}\n", ctx.records));
    prompt.push_str(&format!("Total P&L: {:.0}\n", ctx.total_pl));
    prompt.push_str(&format!("Profitable MCFs: {}\n", ctx.profitable));
    prompt.push_str(&format!("Loss MCFs: {}\n", ctx.losses));

    if !privacy_mode && !ctx.samples.is_empty() {
        prompt.push_str("\nSample records:\n");
        for sample in ctx.samples.iter().take(SAMPLE_LIMIT) {
            // BTreeMap serialization cannot fail
            prompt.push_str(&serde_json::to_string(sample).unwrap_or_default());
            prompt.push('\n');
        }
    }

    prompt.push_str("\nQUESTION:\n");
    prompt.push_str(message.trim());
    prompt.push('\n');

    prompt.push_str("\nRemember: Return ONLY valid JSON in the answer or action shape.");

    prompt
}

// ============================================================================
// Reply parsing
// ============================================================================

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawReply {
    Answer {
        message: String,
    },
    Action {
        #[serde(default)]
        explanation: String,
        action: Action,
    },
}

/// Parse and validate a completion. Anything outside the answer/action
/// contract is rejected.
pub fn parse_reply(content: &str) -> Result<Reply, AskError> {
    let body = strip_fences(content);

    let raw: RawReply = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            // Tolerate prose around a single JSON object
            let start = body.find('{');
            let end = body.rfind('}');
            match (start, end) {
                (Some(s), Some(t)) if s < t => serde_json::from_str(&body[s..=t])
                    .map_err(|e| AskError::InvalidResponse(format!("reply does not match the contract: {}", e)))?,
                _ => return Err(AskError::ParseError(format!("Response is not JSON: {}", e))),
            }
        }
    };

    match raw {
        RawReply::Answer { message } => {
            let message = message.trim();
            if message.is_empty() {
                return Err(AskError::InvalidResponse("empty answer".to_string()));
            }
            Ok(Reply::answer(message))
        }
        RawReply::Action { explanation, action } => {
            let action = validate_action(action)?;
            let explanation = match explanation.trim() {
                "" => format!("Proposed {}", action),
                text => text.to_string(),
            };
            Ok(Reply::Action { explanation, actions: vec![action] })
        }
    }
}

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the fence line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn checked_key(field: &str, value: String) -> Result<String, AskError> {
    let value = value.trim().to_uppercase();
    if is_key(&value) {
        Ok(value)
    } else {
        Err(AskError::InvalidResponse(format!("{} is not an MCF number: '{}'", field, value)))
    }
}

fn validate_action(action: Action) -> Result<Action, AskError> {
    match action {
        Action::CoverLoss { loss_mcf, profit_mcf } => {
            let loss_mcf = checked_key("loss_mcf", loss_mcf)?;
            let profit_mcf = checked_key("profit_mcf", profit_mcf)?;
            if loss_mcf == profit_mcf {
                return Err(AskError::InvalidResponse("cover_loss needs two different MCFs".to_string()));
            }
            Ok(Action::CoverLoss { loss_mcf, profit_mcf })
        }
        Action::MarkReviewed { mcf } => Ok(Action::MarkReviewed { mcf: checked_key("mcf", mcf)? }),
        Action::UpdateValue { mcf, column, value } => {
            let column = column.trim().to_string();
            if column.is_empty() {
                return Err(AskError::InvalidResponse("update_value without a column".to_string()));
            }
            Ok(Action::UpdateValue { mcf: checked_key("mcf", mcf)?, column, value: value.trim().to_string() })
        }
    }
}
