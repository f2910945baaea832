//! End-to-end tests for the fwfeed binary against a simulated FACT backend.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::time::timeout;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

use fwfeed_core::ContentId;

const FIRMWARE: &[u8] = b"\x27\x05\x19\x56 fake uImage header and payload";

/// Lay out one firmware image plus its metadata CSV under a temp dir.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let image_dir = dir.path().join("artifacts").join("Netgear").join("r7000");
    std::fs::create_dir_all(&image_dir).unwrap();
    std::fs::write(image_dir.join("R7000-V1.0.11.chk"), FIRMWARE).unwrap();
    std::fs::write(
        dir.path().join("firmware.csv"),
        "vendor,device_name,version,release_date,file_path,file_name,tags\n\
         Netgear,R7000,1.0.11,2020-06-30,r7000,R7000-V1.0.11.chk,wifi\n\
         ,,,,,,\n",
    )
    .unwrap();
    dir
}

fn status_body(active: &[&str], plugins: &[&str]) -> serde_json::Value {
    let current: serde_json::Map<String, serde_json::Value> = active
        .iter()
        .map(|uid| (uid.to_string(), json!({"unpacked_count": 1})))
        .collect();
    let plugins: serde_json::Map<String, serde_json::Value> = plugins
        .iter()
        .map(|p| (p.to_string(), json!(["description", false, true, "0.1.0"])))
        .collect();
    json!({
        "system_status": {"backend": {"analysis": {"current_analyses": current}}},
        "plugins": plugins,
    })
}

async fn mount_status(server: &MockServer, active: &[&str], plugins: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/rest/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(active, plugins)))
        .mount(server)
        .await;
}

async fn run_fwfeed(dir: &Path, server: &MockServer) -> Output {
    let child = tokio::process::Command::new(env!("CARGO_BIN_EXE_fwfeed"))
        .current_dir(dir)
        .arg("--url")
        .arg(server.uri())
        .arg("--artifact-root")
        .arg(dir.join("artifacts"))
        .arg("--metadata")
        .arg(dir.join("firmware.csv"))
        .env("RUST_LOG", "error")
        .env("FWFEED_POLL__INTERVAL_MS", "10")
        .kill_on_drop(true)
        .output();

    timeout(Duration::from_secs(30), child)
        .await
        .expect("fwfeed did not finish in time")
        .expect("Failed to run fwfeed")
}

#[tokio::test]
async fn test_fresh_artifact_is_submitted() {
    let dir = workspace();
    let uid = ContentId::of(FIRMWARE).to_string();
    let server = MockServer::start().await;

    mount_status(&server, &[&uid], &["cpu_architecture", "software_components"]).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/rest/firmware/.+$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": 1,
            "error_message": "No firmware with UID found",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rest/firmware"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 0,
            "uid": uid,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_fwfeed(dir.path(), &server).await;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("submitted: 1, skipped: 0, failed: 0"));

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("no submission received");
    let payload: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(payload["vendor"], "Netgear");
    assert_eq!(payload["device_name"], "R7000");
    assert_eq!(payload["release_date"], "2020-06-30");
    assert_eq!(payload["tags"], "wifi");
    assert_eq!(payload["device_class"], "router");
    assert_eq!(
        payload["requested_analysis_systems"],
        json!(["cpu_architecture", "software_components"])
    );
}

#[tokio::test]
async fn test_known_artifact_is_skipped() {
    let dir = workspace();
    let uid = ContentId::of(FIRMWARE).to_string();
    let server = MockServer::start().await;

    mount_status(&server, &[], &["cpu_architecture", "software_components"]).await;
    Mock::given(method("GET"))
        .and(path(format!("/rest/firmware/{}", uid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 0,
            "firmware": {"uid": uid},
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rest/firmware"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 0})))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_fwfeed(dir.path(), &server).await;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("submitted: 0, skipped: 1, failed: 0"));
}

#[tokio::test]
async fn test_rejection_exits_with_failure() {
    let dir = workspace();
    let server = MockServer::start().await;

    mount_status(&server, &[], &["cpu_architecture", "software_components"]).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/rest/firmware/.+$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": 1})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rest/firmware"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 1,
            "error_message": "Input payload validation failed",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_fwfeed(dir.path(), &server).await;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("submitted: 0, skipped: 0, failed: 1"));
    assert!(stdout.contains("halted at record 1 (R7000-V1.0.11.chk)"));
}

#[tokio::test]
async fn test_missing_plugin_aborts_before_lookup() {
    let dir = workspace();
    let server = MockServer::start().await;

    mount_status(&server, &[], &["cpu_architecture"]).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/rest/firmware/.+$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_fwfeed(dir.path(), &server).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn test_invalid_config_exits_with_failure() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("fwfeed.toml"),
        "[admission]\nconcurrency_limit = 0\n",
    )
    .unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_fwfeed(dir.path(), &server).await;

    assert_eq!(output.status.code(), Some(1));
}
