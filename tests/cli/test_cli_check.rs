use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{}", yaml).expect("write config");
    file
}

fn filterweb() -> Command {
    let mut cmd = Command::cargo_bin("filterweb").expect("binary built");
    cmd.env_remove("FILTERWEB_CONFIG")
        .env_remove("FILTERWEB_LOG")
        .env_remove("RUST_LOG");
    cmd
}

const GOOD_ROUTES: &str = r#"
- path: /greet
  filters:
    - name: constant
      params:
        contentType: application/json
        data: '{"name": "Alice"}'
    - name: template
      params:
        type: html
        content: "<p>{{name}}</p>"
- path: /json
  method: post
  filters:
    - name: constant
      params:
        contentType: application/yaml
        data: "a: 1"
    - name: encode
      params:
        contentType: application/json
"#;

#[test]
fn check_prints_each_route() {
    let config = write_config(GOOD_ROUTES);
    filterweb()
        .arg("--config")
        .arg(config.path())
        .arg("check")
        .assert()
        .success()
        .stdout(
            "GET /greet\nContent-Type: text/html\n<p>Alice</p>\nPOST /json\nContent-Type: application/json\n{\"a\":1}\n",
        );
}

#[test]
fn hide_content_type_prints_bare_bodies() {
    let config = write_config(GOOD_ROUTES);
    filterweb()
        .env("FILTERWEB_CONFIG", config.path())
        .args(["check", "--hide-content-type"])
        .assert()
        .success()
        .stdout("<p>Alice</p>\n{\"a\":1}\n");
}

#[test]
fn check_fails_when_a_route_fails() {
    let config = write_config(
        r#"
- path: /bad
  filters:
    - name: missing-filter
"#,
    );
    filterweb()
        .arg("-c")
        .arg(config.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GET /bad failed"))
        .stderr(predicate::str::contains("1 of 1 route(s) failed"));
}

#[test]
fn missing_config_file_fails() {
    filterweb()
        .args(["--config", "/nonexistent/filterweb.yaml", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load routes"));
}

#[test]
fn filters_lists_builtins_as_json() {
    let output = filterweb().args(["-q", "filters"]).output().expect("run filters");
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["command", "constant", "encode", "http", "jq", "template"]);
    assert_eq!(listed[5]["accepts"][0], "application/json");
}

#[test]
fn filters_lists_builtins_as_yaml() {
    filterweb()
        .args(["filters", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- name: jq"));
}
