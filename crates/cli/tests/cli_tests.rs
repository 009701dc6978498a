// Integration tests for the mcfdesk binary: exit codes and the --json
// stdout contract.
//
// Run with: cargo test -p mcfdesk-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Copy of the fixture export plus a settings file with no reply delay.
    fn new() -> Self {
        Self::with_settings(r#"{ "chat": { "delay_ms": 0 } }"#)
    }

    fn with_settings(settings: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("export");
        std::fs::create_dir(&export).unwrap();
        let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/export");
        for entry in std::fs::read_dir(&src).unwrap() {
            let entry = entry.unwrap();
            std::fs::copy(entry.path(), export.join(entry.file_name())).unwrap();
        }
        std::fs::write(dir.path().join("settings.json"), settings).unwrap();
        Self { dir }
    }

    fn export(&self) -> PathBuf {
        self.dir.path().join("export")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcfdesk"));
        cmd.env("MCFDESK_CONFIG", self.dir.path().join("settings.json"))
            .env_remove("MCFDESK_SPREADSHEET_ID")
            .env_remove("MCFDESK_GOOGLE_CREDENTIALS")
            .env_remove("MCFDESK_GEMINI_KEY")
            .env_remove("MCFDESK_OPENAI_KEY")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        let mut cmd = self.cmd();
        cmd.args(args).arg("--local").arg(self.export());
        cmd.output().expect("run mcfdesk")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn json(out: &Output) -> serde_json::Value {
    let text = stdout(out);
    serde_json::from_str(text.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {}\n{}", e, text))
}

// ===========================================================================
// mcfdesk load
// ===========================================================================

#[test]
fn load_json_reports_each_tab() {
    let ws = Workspace::new();
    let out = ws.run(&["load", "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let val = json(&out);
    assert_eq!(val["master_tab"], "Master Reconciliation");
    assert_eq!(val["records"], 3);

    let tabs = val["tabs"].as_array().unwrap();
    assert_eq!(tabs.len(), 5);
    let master = tabs.iter().find(|t| t["tab"] == "Master Reconciliation").unwrap();
    assert_eq!(master["status"], "loaded");
    assert_eq!(master["rows"], 3);
    let expected = tabs.iter().find(|t| t["tab"] == "01_Expected").unwrap();
    assert_eq!(expected["status"], "failed");
}

#[test]
fn load_without_master_exits_no_data() {
    let ws = Workspace::new();
    std::fs::remove_file(ws.export().join("Master Reconciliation.csv")).unwrap();
    let out = ws.run(&["load"]);
    assert_eq!(out.status.code(), Some(30));
    assert!(String::from_utf8_lossy(&out.stderr).contains("did not load"));
}

// ===========================================================================
// mcfdesk ask
// ===========================================================================

#[test]
fn ask_summary_text() {
    let ws = Workspace::new();
    let out = ws.run(&["ask", "Give me a summary"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("Total MCFs: 3"));
    assert!(text.contains("₹700"));
}

#[test]
fn ask_json_action_turn() {
    let ws = Workspace::new();
    let out = ws.run(&["ask", "Cover biggest loss with biggest profit", "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let val = json(&out);
    assert_eq!(val["reply"]["type"], "action");
    assert_eq!(val["reply"]["actions"][0]["type"], "cover_loss");
    assert_eq!(val["reply"]["actions"][0]["params"]["loss_mcf"], "MCF-20250428-0589");
    assert_eq!(val["results"][0]["status"], "success");
    assert_eq!(val["reloaded"], true);
}

#[test]
fn ask_unknown_key_exits_chat_error() {
    let ws = Workspace::new();
    let out = ws.run(&["ask", "mark MCF-20991231-0001 as reviewed"]);
    assert_eq!(out.status.code(), Some(31));
    assert!(stdout(&out).contains("MCF-20991231-0001"));
}

#[test]
fn ask_requires_a_source() {
    let ws = Workspace::new();
    let out = ws.cmd().args(["ask", "summary"]).output().unwrap();
    assert_eq!(out.status.code(), Some(20));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no workbook selected"));
    assert!(stderr.contains("hint:"));
}

#[test]
fn bad_settings_file_is_usage_error() {
    let ws = Workspace::with_settings("{ not json");
    let out = ws.run(&["load"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn ask_falls_back_to_ai_for_unrecognised_messages() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-1.5-flash-latest:generateContent")
            .header("x-goog-api-key", "test-gemini-key")
            .body_includes("Total MCFs: 3");
        then.status(200).json_body(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"type\":\"answer\",\"message\":\"Two partners carry most of the volume.\"}" }] } }]
        }));
    });

    let settings = format!(
        r#"{{ "chat": {{ "delay_ms": 0 }}, "ai": {{ "provider": "gemini", "endpoint": "{}" }} }}"#,
        server.base_url()
    );
    let ws = Workspace::with_settings(&settings);
    let mut cmd = ws.cmd();
    cmd.env("MCFDESK_GEMINI_KEY", "test-gemini-key")
        .args(["ask", "which channel has momentum this quarter?", "--local"])
        .arg(ws.export());
    let out = cmd.output().unwrap();

    mock.assert();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("Two partners carry most of the volume."));
}

#[test]
fn no_ai_flag_keeps_rule_help() {
    let ws = Workspace::with_settings(r#"{ "chat": { "delay_ms": 0 }, "ai": { "provider": "gemini", "endpoint": "http://127.0.0.1:9" } }"#);
    let mut cmd = ws.cmd();
    cmd.env("MCFDESK_GEMINI_KEY", "k")
        .args(["ask", "what can you do", "--no-ai", "--local"])
        .arg(ws.export());
    let out = cmd.output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).contains("Try asking"));
}

// ===========================================================================
// mcfdesk ai doctor
// ===========================================================================

#[test]
fn ai_doctor_disabled_json() {
    let ws = Workspace::new();
    let out = ws.cmd().args(["ai", "doctor", "--json"]).output().unwrap();
    assert_eq!(out.status.code(), Some(10));
    let val = json(&out);
    assert_eq!(val["status"], "disabled");
    assert_eq!(val["provider"], "none");
}

#[test]
fn ai_doctor_ready_from_env_key() {
    let ws = Workspace::with_settings(r#"{ "ai": { "provider": "openai" } }"#);
    let out = ws
        .cmd()
        .env("MCFDESK_OPENAI_KEY", "sk-test")
        .args(["ai", "doctor", "--json"])
        .output()
        .unwrap();
    let val = json(&out);
    // A key stored in the keychain would also satisfy this
    assert_eq!(val["status"], "ready");
    assert_eq!(val["key_present"], true);
    assert_eq!(val["model"], "gpt-4o-mini");
    assert!(out.status.success());
}
