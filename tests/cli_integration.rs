// CLI integration tests for argument handling, error reporting and output shape.
// Only the search output test talks to a server, the loopback stub in `support`.
mod support;

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};
use support::Stub;

fn cmd(env_file: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_islandora-rest");
    let mut command = Command::new(exe);
    command
        .arg("--env-file")
        .arg(env_file)
        .env_remove("ISLANDORA_REST")
        .env_remove("ISLANDORA_USER")
        .env_remove("ISLANDORA_TOKEN")
        .env_remove("RUST_LOG");
    command
}

fn parse_error(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text
        .lines()
        .rev()
        .find(|line| line.starts_with('{'))
        .expect("json error line");
    serde_json::from_str(line).expect("valid json")
}

#[test]
fn empty_pid_is_missing_identifier() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(&temp.path().join("none.env"))
        .args(["object", "get", ""])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    let err = parse_error(&output);
    assert_eq!(err["error"]["kind"], "MissingIdentifier");
    assert_eq!(err["error"]["message"], "missing PID");
}

#[test]
fn datastream_create_without_content_fails_locally() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(&temp.path().join("none.env"))
        .args(["datastream", "create", "samples:1", "OBJ", "--label", "Article"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(4));
    let err = parse_error(&output);
    assert_eq!(err["error"]["kind"], "MissingContent");
}

#[test]
fn datastream_create_with_both_sources_is_ambiguous() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(&temp.path().join("none.env"))
        .args([
            "datastream",
            "create",
            "samples:1",
            "OBJ",
            "--file",
            "article.pdf",
            "--string",
            "inline",
        ])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(5));
    assert_eq!(parse_error(&output)["error"]["kind"], "AmbiguousContent");
}

#[test]
fn malformed_field_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(&temp.path().join("none.env"))
        .args(["object", "create", "--field", "no-equals-sign"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_error(&output);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(err["error"]["hint"].as_str().is_some());
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(&temp.path().join("none.env"))
        .arg("frobnicate")
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(parse_error(&output)["error"]["kind"], "Usage");
}

#[test]
fn malformed_env_file_is_reported() {
    let temp = tempfile::tempdir().expect("tempdir");
    let env_file = temp.path().join(".env");
    std::fs::write(&env_file, "NOT VALID\n").expect("write env");
    let output = cmd(&env_file)
        .args(["object", "get", "samples:1"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_error(&output);
    assert!(
        err["error"]["message"]
            .as_str()
            .is_some_and(|message| message.starts_with("failed to read env file"))
    );
}

#[test]
fn help_exits_cleanly() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(&temp.path().join("none.env"))
        .arg("--help")
        .output()
        .expect("run");
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("content-model"));
    assert!(help.contains("ISLANDORA_REST"));
}

#[test]
fn search_objects_page_is_one_json_value() {
    let page = json!({
        "responseHeader": {"status": 0},
        "response": {"numFound": 1, "start": 0, "docs": [{"PID": "samples:1"}]},
    })
    .to_string();
    let stub = Stub::start(vec![
        (200, page.as_str()),
        (200, r#"{"pid":"samples:1","label":"Sample Article 01"}"#),
    ])
    .expect("stub");
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd(&temp.path().join("none.env"))
        .args(["--rest-url", stub.base_url(), "search", "*:*", "--objects"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(0));

    let stdout: Value = serde_json::from_slice(&output.stdout).expect("single json value");
    assert_eq!(stdout["page"]["response"]["docs"][0]["PID"], "samples:1");
    assert_eq!(stdout["objects"][0]["pid"], "samples:1");
    assert_eq!(stdout["objects"][0]["label"], "Sample Article 01");

    let recorded = stub.recorded();
    assert_eq!(recorded.len(), 2);
    assert!(recorded[0].target.starts_with("/islandora/rest/v1/solr/"));
    assert_eq!(recorded[1].target, "/islandora/rest/v1/object/samples:1");
}
