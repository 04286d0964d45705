//! End-to-end CLI tests against a local mock origin

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn shellcache() -> Command {
    let mut cmd = cargo_bin_cmd!("shellcache");
    cmd.env_remove("SHELLCACHE_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// Temp dir holding a config and state directory
struct Env {
    dir: TempDir,
    config: PathBuf,
}

impl Env {
    fn new(origin: &str, generation: &str, manifest: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        let env = Self { dir, config };
        env.write_config(origin, generation, manifest);
        env
    }

    fn write_config(&self, origin: &str, generation: &str, manifest: &[&str]) {
        let manifest = manifest
            .iter()
            .map(|m| format!("'{}'", m))
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!(
            "[general]\nstate_dir = '{}'\n\n[worker]\ngeneration = '{}'\norigin = '{}/'\nmanifest = [{}]\n",
            self.state_dir().display(),
            generation,
            origin,
            manifest
        );
        std::fs::write(&self.config, content).unwrap();
    }

    fn append_config(&self, extra: &str) {
        let mut content = std::fs::read_to_string(&self.config).unwrap();
        content.push_str(extra);
        std::fs::write(&self.config, content).unwrap();
    }

    fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = shellcache();
        cmd.current_dir(self.path())
            .arg("--no-local")
            .arg("--config")
            .arg(&self.config)
            .args(args);
        cmd
    }
}

async fn origin() -> MockServer {
    let server = MockServer::start().await;
    for (route, body) in [
        ("/", "<html>shell</html>"),
        ("/index.html", "<html>index</html>"),
        ("/app.js", "console.log('app')"),
        ("/extra.css", "body{}"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/missing.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/expenses"))
        .and(body_string("amount=12"))
        .respond_with(ResponseTemplate::new(201).set_body_string("saved"))
        .mount(&server)
        .await;
    server
}

const MANIFEST: &[&str] = &["./", "./index.html", "./app.js"];

#[test]
fn help_displays() {
    shellcache()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("offline app-shell cache worker"));
}

#[test]
fn version_displays() {
    shellcache()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shellcache"));
}

#[test]
fn completions_bash() {
    shellcache()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shellcache"));
}

#[test]
fn config_path_follows_flag() {
    let env = Env::new("http://localhost:8080", "test-v1", MANIFEST);
    env.cmd(&["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_show_merges_defaults() {
    let env = Env::new("http://localhost:8080", "test-v1", MANIFEST);
    env.cmd(&["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test-v1"))
        .stdout(predicate::str::contains("firestore.googleapis.com"));
}

#[test]
fn config_set_updates_file() {
    let env = Env::new("http://localhost:8080", "test-v1", MANIFEST);
    env.cmd(&["config", "set", "worker.generation", "test-v2"])
        .assert()
        .success();

    let content = std::fs::read_to_string(&env.config).unwrap();
    assert!(content.contains("test-v2"));
}

#[test]
fn config_set_unknown_key_fails() {
    let env = Env::new("http://localhost:8080", "test-v1", MANIFEST);
    env.cmd(&["config", "set", "worker.colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn fetch_without_install_fails_with_hint() {
    let env = Env::new("http://localhost:8080", "test-v1", MANIFEST);
    env.cmd(&["fetch", "./index.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active worker"))
        .stderr(predicate::str::contains("shellcache install"));
}

#[test]
fn activate_without_waiting_fails() {
    let env = Env::new("http://localhost:8080", "test-v1", MANIFEST);
    env.cmd(&["activate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No installed worker is waiting"));
}

#[tokio::test(flavor = "multi_thread")]
async fn install_then_fetch_from_cache() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);

    env.cmd(&["install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pre-cached into test-v1 (3/3)"))
        .stdout(predicate::str::contains("Activated test-v1"));

    assert!(env.state_dir().join("registration.json").exists());
    let journal = std::fs::read_to_string(env.state_dir().join("journal.log")).unwrap();
    assert!(journal.contains("install.completed"));
    assert!(journal.contains("activate.completed"));

    env.cmd(&["fetch", "./index.html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<html>index</html>"))
        .stderr(predicate::str::contains("cache 200"));

    env.cmd(&["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test-v1: 3 entries"));
}

#[tokio::test(flavor = "multi_thread")]
async fn runtime_miss_is_stored_for_next_time() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);
    env.cmd(&["install"]).assert().success();

    env.cmd(&["fetch", "./extra.css"])
        .assert()
        .success()
        .stderr(predicate::str::contains("network 200"));

    env.cmd(&["fetch", "./extra.css"])
        .assert()
        .success()
        .stdout(predicate::str::contains("body{}"))
        .stderr(predicate::str::contains("cache 200"));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_writes_body_to_file() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);
    env.cmd(&["install"]).assert().success();

    let out = env.path().join("app.js");
    env.cmd(&["fetch", "./app.js", "--output", out.to_str().unwrap()])
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(out).unwrap(), "console.log('app')");
}

#[tokio::test(flavor = "multi_thread")]
async fn new_generation_purges_old() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);
    env.cmd(&["install"]).assert().success();

    env.write_config(&server.uri(), "test-v2", MANIFEST);
    env.cmd(&["install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted old cache: test-v1"));

    env.cmd(&["cache", "list", "--format", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test-v2\tGET"))
        .stdout(predicate::str::contains("test-v1").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_install_reports_missing_entries() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", &["./index.html", "./missing.js"]);

    env.cmd(&["install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(1/2)"))
        .stdout(predicate::str::contains("missing.js"))
        .stdout(predicate::str::contains("1 of 2 entries missing"));
}

#[tokio::test(flavor = "multi_thread")]
async fn cache_list_json() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);
    env.cmd(&["install"]).assert().success();

    let output = env.cmd(&["cache", "list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let listings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listings[0]["generation"], "test-v1");
    assert_eq!(listings[0]["current"], true);
    assert_eq!(listings[0]["entries"].as_array().unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn cache_clear_removes_generations_and_registration() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);
    env.cmd(&["install"]).assert().success();

    env.cmd(&["cache", "clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 generation(s)"));

    assert!(!env.state_dir().join("registration.json").exists());
    env.cmd(&["fetch", "./index.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active worker"));
}

#[tokio::test(flavor = "multi_thread")]
async fn ephemeral_install_leaves_no_state() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);

    env.cmd(&["--ephemeral", "install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pre-cached into test-v1 (3/3)"));

    assert!(!env.state_dir().join("registration.json").exists());
    assert!(!env.state_dir().join("store").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_posts_body_without_storing() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);
    env.cmd(&["install"]).assert().success();

    for _ in 0..2 {
        env.cmd(&["fetch", "./expenses", "-X", "POST", "-d", "amount=12"])
            .assert()
            .success()
            .stdout(predicate::str::contains("saved"))
            .stderr(predicate::str::contains("network 201"));
    }

    env.cmd(&["cache", "list", "--format", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expenses").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn bypassed_host_failure_suggests_retry() {
    let server = origin().await;
    let env = Env::new(&server.uri(), "test-v1", MANIFEST);
    env.append_config("\n[bypass]\nhosts = ['127.0.0.1']\n");
    env.cmd(&["install"]).assert().success();

    // Nothing listens on the discard port
    env.cmd(&["fetch", "http://127.0.0.1:9/v1/documents"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network request failed"))
        .stderr(predicate::str::contains("Retry:"));
}
