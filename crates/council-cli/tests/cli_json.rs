use assert_cmd::Command;
use council_testkit::{sample_data, write_data_dir};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn seeded() -> TempDir {
    let workspace = TempDir::new().expect("workspace");
    write_data_dir(&workspace.path().join("data"), &sample_data()).expect("data");
    workspace
}

fn council(workspace: &Path) -> Command {
    let mut cmd = Command::cargo_bin("council").expect("binary");
    cmd.env("HOME", workspace)
        .env_remove("OPENAI_API_KEY")
        .arg("--workspace")
        .arg(workspace);
    cmd
}

fn run_json(workspace: &Path, args: &[&str]) -> Value {
    let output = council(workspace)
        .arg("--json")
        .args(args)
        .output()
        .expect("run council");
    assert!(
        output.status.success(),
        "council {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn fresh_workspace_reports_empty_state() {
    let workspace = seeded();
    let state = run_json(workspace.path(), &["state"]);
    assert_eq!(state["updatedIndex"], 0);
    assert_eq!(state["council"].as_array().map(Vec::len), Some(2));
    assert!(!state.to_string().contains("private_agenda"));
}

#[test]
fn input_and_plan_persist_between_invocations() {
    let workspace = seeded();
    let entry = run_json(
        workspace.path(),
        &["input", "--from", "players", "--target", "Lady Vess", "Hold the pass?"],
    );
    assert_eq!(entry["targetName"], "Lady Vess");
    run_json(workspace.path(), &["plan", "Fortify the pass"]);
    run_json(workspace.path(), &["world-update", "Snow closes the north road."]);

    let updated = run_json(workspace.path(), &["updated"]);
    assert_eq!(updated["updatedIndex"], 3);
    let chat = run_json(workspace.path(), &["chat"]);
    assert_eq!(chat["chat"][0]["text"], "Hold the pass?");
    let state = run_json(workspace.path(), &["state"]);
    assert_eq!(state["planText"], "Fortify the pass");

    let reset = run_json(workspace.path(), &["reset"]);
    assert_eq!(reset["updatedIndex"], 4);
}

#[test]
fn travel_and_threat_lookups() {
    let workspace = seeded();
    let travel = run_json(workspace.path(), &["travel", "H", "C"]);
    assert_eq!(travel["days"], 6.5);
    let threat = run_json(workspace.path(), &["threat", "reavers", "--months", "3"]);
    assert_eq!(threat["summary"], "Saltmere is besieged.");

    council(workspace.path())
        .args(["travel", "A", "Isle"])
        .assert()
        .failure();
}

#[test]
fn config_show_redacts_api_key() {
    let workspace = seeded();
    let settings = workspace.path().join(".council");
    fs::create_dir_all(&settings).expect("settings dir");
    fs::write(
        settings.join("settings.json"),
        r#"{"llm": {"api_key": "sk-secret"}, "council": {"max_words": 5}}"#,
    )
    .expect("settings");
    let cfg = run_json(workspace.path(), &["config", "show"]);
    assert_eq!(cfg["llm"]["api_key"], "***REDACTED***");
    assert_eq!(cfg["council"]["max_words"], 20);
}

#[test]
fn unknown_advisor_fails_without_contacting_the_service() {
    let workspace = seeded();
    council(workspace.path())
        .args(["respond", "nobody"])
        .assert()
        .failure();
    council(workspace.path())
        .args(["commit", "vess"])
        .assert()
        .failure();
}
