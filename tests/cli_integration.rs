//! Integration tests for the bundlepush binary.
//!
//! Each test runs with an isolated HOME and no GitHub variables, so the
//! developer's own configuration never leaks in.

use std::io::{Cursor, Write};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A bundlepush command with a clean environment rooted at `home`.
fn bundlepush(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bundlepush").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("BUNDLEPUSH_CONFIG")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_OWNER")
        .env_remove("GITHUB_OWNER_TYPE")
        .env_remove("GITHUB_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_zip(dir: &TempDir, members: &[(&str, &[u8])]) -> std::path::PathBuf {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    let file = dir.path().join("site.zip");
    std::fs::write(&file, writer.finish().unwrap().into_inner()).unwrap();
    file
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    bundlepush(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bundlepush"));
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    bundlepush(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy").and(predicate::str::contains("provision")));
}

#[test]
fn missing_token_is_configuration_error() {
    let home = TempDir::new().unwrap();
    let output = bundlepush(&home)
        .args(["deploy", "site.zip", "--repo", "demo", "--json"])
        .env("GITHUB_OWNER", "acme")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let body = stdout_json(&output);
    assert_eq!(body["error"], "GITHUB_TOKEN not set");
    assert_eq!(body["kind"], "configuration");
    assert_eq!(body["status"], 500);
}

#[test]
fn missing_owner_is_configuration_error() {
    let home = TempDir::new().unwrap();
    bundlepush(&home)
        .args(["provision", "--repo", "demo"])
        .env("GITHUB_TOKEN", "t")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_OWNER not set"));
}

#[test]
fn invalid_repository_name_is_validation_error() {
    let home = TempDir::new().unwrap();
    let output = bundlepush(&home)
        .args(["deploy", "site.zip", "--repo", "../etc", "--json"])
        .env("GITHUB_TOKEN", "t")
        .env("GITHUB_OWNER", "acme")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5));
    let body = stdout_json(&output);
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["status"], 400);
}

#[test]
fn unreadable_archive_is_validation_error() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.zip");
    let output = bundlepush(&home)
        .arg("deploy")
        .arg(&missing)
        .args(["--repo", "demo", "--json"])
        .env("GITHUB_TOKEN", "t")
        .env("GITHUB_OWNER", "acme")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().contains("nope.zip"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(&config, "[github]\ntokn = \"typo\"\n").unwrap();

    let output = bundlepush(&home)
        .arg("--config")
        .arg(&config)
        .args(["provision", "--repo", "demo", "--json"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["kind"], "configuration");
}

#[tokio::test(flavor = "multi_thread")]
async fn provision_creates_missing_repository() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/demo"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .and(body_json(json!({"name": "demo", "private": false, "auto_init": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "demo", "private": false, "default_branch": "main"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = bundlepush(&home)
        .args(["provision", "--repo", "demo", "--private", "false", "--json"])
        .env("GITHUB_TOKEN", "t")
        .env("GITHUB_OWNER", "acme")
        .env("GITHUB_OWNER_TYPE", "org")
        .env("GITHUB_API_URL", server.uri())
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output),
        json!({
            "ok": true,
            "ownerAccount": "acme",
            "repoName": "demo",
            "branchName": "main",
            "makePrivate": false
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn upstream_failure_forwards_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/demo"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Bad credentials",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = bundlepush(&home)
        .args(["provision", "--repo", "demo", "--json"])
        .env("GITHUB_TOKEN", "bad")
        .env("GITHUB_OWNER", "acme")
        .env("GITHUB_API_URL", server.uri())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(7));
    let body = stdout_json(&output);
    assert_eq!(body["error"], "Bad credentials");
    assert_eq!(body["kind"], "upstream");
    assert_eq!(body["status"], 401);
    assert_eq!(body["details"]["documentation_url"], "https://docs.github.com/rest");
}

#[tokio::test(flavor = "multi_thread")]
async fn deploy_to_new_branch_forks_default_and_commits() {
    let server = MockServer::start().await;
    let ok = |body: Value| ResponseTemplate::new(200).set_body_json(body);
    let created = |body: Value| ResponseTemplate::new(201).set_body_json(body);

    Mock::given(method("GET"))
        .and(path("/repos/acme/site"))
        .respond_with(ok(json!({"name": "site", "private": true, "default_branch": "main"})))
        .mount(&server)
        .await;
    // The first lookup misses; once created, the branch resolves.
    Mock::given(method("GET"))
        .and(path("/repos/acme/site/git/ref/heads/preview"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/site/git/ref/heads/preview"))
        .respond_with(ok(json!({"ref": "refs/heads/preview", "object": {"sha": "base1"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/site/git/ref/heads/main"))
        .respond_with(ok(json!({"ref": "refs/heads/main", "object": {"sha": "base1"}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/site/git/refs"))
        .and(body_json(json!({"ref": "refs/heads/preview", "sha": "base1"})))
        .respond_with(created(json!({"ref": "refs/heads/preview"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/site/git/commits/base1"))
        .respond_with(ok(json!({"sha": "base1", "tree": {"sha": "tree0"}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/site/git/blobs"))
        .and(body_json(json!({"content": "PGgxPmhpPC9oMT4=", "encoding": "base64"})))
        .respond_with(created(json!({"sha": "blob-index"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/site/git/blobs"))
        .and(body_json(json!({"content": "U0VDUkVUPTE=", "encoding": "base64"})))
        .respond_with(created(json!({"sha": "blob-env"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/site/git/trees"))
        .and(body_json(json!({
            "base_tree": "tree0",
            "tree": [
                {"path": "config/.env", "mode": "100644", "type": "blob", "sha": "blob-env"},
                {"path": "index.html", "mode": "100644", "type": "blob", "sha": "blob-index"}
            ]
        })))
        .respond_with(created(json!({"sha": "tree1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/site/git/commits"))
        .and(body_partial_json(json!({"tree": "tree1", "parents": ["base1"]})))
        .respond_with(created(json!({"sha": "commit1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/site/git/refs/heads/preview"))
        .and(body_json(json!({"sha": "commit1", "force": true})))
        .respond_with(ok(json!({"ref": "refs/heads/preview"})))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let archive = write_zip(
        &home,
        &[("index.html", b"<h1>hi</h1>"), ("config/.env", b"SECRET=1")],
    );
    let output = bundlepush(&home)
        .arg("deploy")
        .arg(&archive)
        .args(["--repo", "site", "--branch", "preview", "--json"])
        .env("GITHUB_TOKEN", "t")
        .env("GITHUB_OWNER", "acme")
        .env("GITHUB_API_URL", server.uri())
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output),
        json!({
            "ok": true,
            "ownerAccount": "acme",
            "repoName": "site",
            "branchName": "preview",
            "fileCount": 2,
            "newCommitSha": "commit1",
            "warnings": [{"path": "config/.env", "reason": "environment file"}]
        })
    );

    let requests = server.received_requests().await.unwrap();
    let calls: Vec<String> = requests
        .iter()
        .map(|r| format!("{} {}", r.method.as_str(), r.url.path()))
        .collect();
    assert_eq!(
        calls,
        vec![
            "GET /repos/acme/site",
            "GET /repos/acme/site/git/ref/heads/preview",
            "GET /repos/acme/site",
            "GET /repos/acme/site/git/ref/heads/main",
            "POST /repos/acme/site/git/refs",
            "GET /repos/acme/site/git/ref/heads/preview",
            "GET /repos/acme/site/git/commits/base1",
            "POST /repos/acme/site/git/blobs",
            "POST /repos/acme/site/git/blobs",
            "POST /repos/acme/site/git/trees",
            "POST /repos/acme/site/git/commits",
            "PATCH /repos/acme/site/git/refs/heads/preview",
        ]
    );

    let commit: Value = requests[10].body_json().unwrap();
    assert!(commit["message"]
        .as_str()
        .unwrap()
        .starts_with("Deploy from bundlepush ("));
}
