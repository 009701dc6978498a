// Interactive chat over stdin/stdout

use std::io::{self, BufRead, Write};

use mcfdesk_cli::{ChatSession, QuickAction};

const PROMPT: &str = "you> ";

pub fn print_banner<W: Write>(session: &ChatSession, description: &str, out: &mut W) -> io::Result<()> {
    writeln!(out, "Connected to {}", description)?;
    write!(out, "{}", session.report().render())?;
    if session.has_assistant() {
        writeln!(out, "AI fallback: on")?;
    }
    writeln!(out)?;
    writeln!(out, "Quick actions:")?;
    for qa in QuickAction::ALL {
        writeln!(out, "  {:<9} {}", qa.command(), qa.description())?;
    }
    writeln!(out)
}

/// Read lines until EOF or `/quit`.
pub fn run<R: BufRead, W: Write>(session: &mut ChatSession, input: R, out: &mut W) -> io::Result<()> {
    write!(out, "{}", PROMPT)?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            write!(out, "{}", PROMPT)?;
            out.flush()?;
            continue;
        }

        let message = match QuickAction::parse(line) {
            Some(QuickAction::Quit) => break,
            Some(QuickAction::Reload) => {
                write!(out, "{}", session.reload().render())?;
                None
            }
            Some(QuickAction::Tabs) => {
                for (tab, rows) in session.report().row_counts() {
                    writeln!(out, "  {}: {} rows", tab, rows)?;
                }
                None
            }
            Some(QuickAction::Clear) => {
                session.clear_transcript();
                writeln!(out, "Transcript cleared.")?;
                None
            }
            Some(qa) => qa.canned_message(),
            None if line.starts_with('/') => {
                writeln!(out, "Unknown command {}. Try /summary, /losses, /profits, /cover or /quit.", line)?;
                None
            }
            None => Some(line),
        };

        if let Some(message) = message {
            let turn = session.handle(message);
            writeln!(out, "\n{}\n", turn.text.trim_end())?;
            if turn.reloaded {
                writeln!(out, "(data reloaded)\n")?;
            }
        }

        write!(out, "{}", PROMPT)?;
        out.flush()?;
    }

    writeln!(out)?;
    Ok(())
}
