//! End-to-end tests of the tf-index binary

mod common;

use common::TestDb;
use uuid::Uuid;

#[test]
fn test_build_prints_indented_yaml() {
    let db = TestDb::new();
    db.write_config();
    db.add("Components", "Gateway");
    db.add("Components", "Auth Service");

    let stdout = db.run_cli_success(&["build"]);

    assert!(stdout.starts_with("items:\n  - kind: component\n"), "{}", stdout);
    assert!(stdout.contains("name: Auth Service"));
}

#[test]
fn test_build_json_output() {
    let db = TestDb::new();
    db.write_config();
    db.add("Threats", "Spoofing");
    db.insert("PropertyOptions", None, "Low");

    let stdout = db.run_cli_success(&["build", "--format", "json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = json["items"].as_array().unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["kind"], "propertyOption");
    assert!(items[0].get("externalId").is_none());
    assert_eq!(items[1]["id"], 1);
}

#[test]
fn test_export_then_resolve_from_file() {
    let db = TestDb::new();
    db.write_config();
    let mfa = db.add("SecurityRequirements", "MFA");

    let report = db.run_cli_success(&["export", "--format", "json"]);
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["count"], 1);
    assert!(db.index_path().exists());

    let stdout = db.run_cli_success(&[
        "resolve",
        "securityRequirement",
        &mfa.to_string(),
        "--from-file",
    ]);
    assert_eq!(stdout.trim(), "1");
}

#[test]
fn test_resolve_against_database() {
    let db = TestDb::new();
    db.write_config();
    db.add("TestCases", "a");
    let second = db.add("TestCases", "b");

    let stdout = db.run_cli_success(&["--format", "json", "resolve", "TESTCASE", &second.to_string()]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["id"], 2);
    assert_eq!(json["version"], 1);
}

#[test]
fn test_exit_codes() {
    let db = TestDb::new();
    db.write_config();

    let (code, stderr) = db.run_cli_failure(&["resolve", "threat", &Uuid::new_v4().to_string()]);
    assert_eq!(code, Some(5), "{}", stderr);

    let (code, _) = db.run_cli_failure(&["resolve", " ", &Uuid::new_v4().to_string()]);
    assert_eq!(code, Some(2));

    let (code, _) = db.run_cli_failure(&["build", "--db", "missing.db"]);
    assert_eq!(code, Some(4));

    std::fs::write(db.index_path(), "entries: []\n").unwrap();
    let (code, _) = db.run_cli_failure(&["resolve", "threat", &Uuid::new_v4().to_string(), "--from-file"]);
    assert_eq!(code, Some(3));
}

#[test]
fn test_config_set_and_get() {
    let db = TestDb::new();

    db.run_cli_success(&["config", "set", "daemon.port", "9999"]);
    assert_eq!(db.run_cli_success(&["config", "get", "daemon.port"]).trim(), "9999");

    let (code, _) = db.run_cli_failure(&["config", "set", "logging.level", "chatty"]);
    assert_eq!(code, Some(2));
}
