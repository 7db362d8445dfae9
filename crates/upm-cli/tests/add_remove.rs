//! Integration tests for `upm add` and `upm remove`.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::fs;
use std::net::SocketAddr;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Global port counter for unique mock server ports.
static PORT_COUNTER: AtomicU16 = AtomicU16::new(20100);

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_upm"))
}

fn json(body: serde_json::Value) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

async fn handle_packument(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "com.example.a" => json(serde_json::json!({
            "name": "com.example.a",
            "dist-tags": { "latest": "1.1.0" },
            "versions": {
                "1.0.0": {},
                "1.1.0": {
                    "dependencies": {
                        "com.example.b": "1.0.0",
                        "com.unity.ugui": "1.0.0"
                    }
                }
            }
        })),
        "com.example.b" => json(serde_json::json!({
            "name": "com.example.b",
            "versions": { "1.0.0": {} }
        })),
        "com.example.broken" => json(serde_json::json!({
            "name": "com.example.broken",
            "versions": {
                "1.0.0": { "dependencies": { "com.example.gone": "1.0.0" } }
            }
        })),
        "com.example.future" => json(serde_json::json!({
            "name": "com.example.future",
            "versions": { "1.0.0": { "unity": "2099.1" } }
        })),
        _ => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn handle_manual(Path(page): Path<String>) -> StatusCode {
    if page == "com.unity.ugui.html" {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Start the mock registry in a background thread. Returns the base URL.
fn start_mock_registry() -> String {
    let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = Router::new()
                .route("/Manual/:page", get(handle_manual))
                .route("/:name", get(handle_packument));
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    thread::sleep(Duration::from_millis(100));
    format!("http://127.0.0.1:{port}")
}

/// Create a Unity project with the given manifest and editor version.
fn create_project(manifest: &str, editor: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("Packages")).unwrap();
    fs::write(dir.path().join("Packages/manifest.json"), manifest).unwrap();
    fs::create_dir_all(dir.path().join("ProjectSettings")).unwrap();
    fs::write(
        dir.path().join("ProjectSettings/ProjectVersion.txt"),
        format!("m_EditorVersion: {editor}\nm_EditorVersionWithRevision: {editor} (abc)\n"),
    )
    .unwrap();
    dir
}

fn read_manifest(project: &TempDir) -> serde_json::Value {
    let content = fs::read_to_string(project.path().join("Packages/manifest.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// Run `upm` inside `project` with every registry endpoint pointed at `base`.
fn upm(base: &str, project: &TempDir, args: &[&str]) -> Output {
    cargo_bin()
        .args(args)
        .current_dir(project.path())
        .env("UPM_REGISTRY", base)
        .env("UPM_UPSTREAM_REGISTRY", base)
        .env("UPM_DOCS_BASE_URL", base)
        .env("UPM_USER_CONFIG_FILE", project.path().join(".upmconfig.toml"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run upm")
}

#[test]
fn test_add_records_dependency_and_scopes() {
    let base = start_mock_registry();
    let project = create_project(r#"{"dependencies": {}}"#, "2022.3.10f1");

    let output = upm(&base, &project, &["add", "com.example.a"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("added com.example.a@1.1.0"), "stdout: {stdout}");
    assert!(stdout.contains("please open Unity project to apply changes"));

    let manifest = read_manifest(&project);
    assert_eq!(manifest["dependencies"]["com.example.a"], "1.1.0");
    let registry = &manifest["scopedRegistries"][0];
    assert_eq!(registry["name"], "127.0.0.1");
    assert_eq!(registry["url"], base.as_str());
    // Built-in packages never become scopes.
    assert_eq!(
        registry["scopes"],
        serde_json::json!(["com.example.a", "com.example.b"])
    );
}

#[test]
fn test_add_modify_and_existing() {
    let base = start_mock_registry();
    let project = create_project(
        r#"{"dependencies": {"com.example.a": "1.0.0", "com.example.b": "1.0.0"}}"#,
        "2022.3.10f1",
    );

    let output = upm(
        &base,
        &project,
        &["add", "com.example.a@1.1.0", "com.example.b@1.0.0"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("modified com.example.a 1.0.0 => 1.1.0"), "stdout: {stdout}");
    assert!(stdout.contains("existed com.example.b@1.0.0"), "stdout: {stdout}");
}

#[test]
fn test_add_testable() {
    let base = start_mock_registry();
    let project = create_project(r#"{"dependencies": {}}"#, "2022.3.10f1");

    let output = upm(&base, &project, &["add", "-t", "com.example.b@1.0.0"]);
    assert!(output.status.success());
    assert_eq!(
        read_manifest(&project)["testables"],
        serde_json::json!(["com.example.b"])
    );
}

#[test]
fn test_add_unresolved_dependency_needs_force() {
    let base = start_mock_registry();
    let project = create_project(r#"{"dependencies": {}}"#, "2022.3.10f1");

    let output = upm(&base, &project, &["--json", "add", "com.example.broken@1.0.0"]);
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["errors"][0]["code"], "PKG_DEPENDENCY_UNRESOLVED");
    assert_eq!(json["manifest_changed"], false);
    assert!(read_manifest(&project)["dependencies"]
        .get("com.example.broken")
        .is_none());

    let output = upm(
        &base,
        &project,
        &["--json", "add", "--force", "com.example.broken@1.0.0"],
    );
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["added"][0]["unresolved"], serde_json::json!(["com.example.gone@1.0.0"]));
    assert_eq!(read_manifest(&project)["dependencies"]["com.example.broken"], "1.0.0");
}

#[test]
fn test_add_editor_incompatible() {
    let base = start_mock_registry();
    let project = create_project(r#"{"dependencies": {}}"#, "2022.3.10f1");

    let output = upm(&base, &project, &["add", "com.example.future@1.0.0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PKG_EDITOR_INCOMPATIBLE"), "stderr: {stderr}");
}

#[test]
fn test_add_outside_project() {
    let base = start_mock_registry();
    let dir = tempfile::tempdir().unwrap();

    let output = cargo_bin()
        .args(["--json", "--cwd"])
        .arg(dir.path())
        .args(["add", "com.example.a"])
        .env("UPM_REGISTRY", &base)
        .env("UPM_USER_CONFIG_FILE", dir.path().join(".upmconfig.toml"))
        .output()
        .expect("Failed to run upm");

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("PKG_MANIFEST_NOT_FOUND:"));
}

#[test]
fn test_remove() {
    let base = start_mock_registry();
    let project = create_project(
        r#"{
            "dependencies": {"com.example.a": "1.1.0", "com.example.b": "1.0.0"},
            "scopedRegistries": [
                {"name": "example", "url": "http://127.0.0.1", "scopes": ["com.example.a", "com.example.b"]}
            ]
        }"#,
        "2022.3.10f1",
    );

    let output = upm(&base, &project, &["remove", "com.example.a", "com.example.none"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("removed com.example.a@1.1.0"), "stdout: {stdout}");
    assert!(stderr.contains("PKG_NOT_INSTALLED"), "stderr: {stderr}");

    let manifest = read_manifest(&project);
    assert!(manifest["dependencies"].get("com.example.a").is_none());
    assert_eq!(
        manifest["scopedRegistries"][0]["scopes"],
        serde_json::json!(["com.example.b"])
    );
}
