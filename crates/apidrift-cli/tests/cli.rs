//! End-to-end runs of the `apidrift` binary.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADD_OK: &str =
    "public class ExampleSpringService { public int add(int a, int b) { return a + b; } }";

fn change_json(name: &str) -> Value {
    json!({
        "library": "spring-framework",
        "name": name,
        "from_version": "v6.0.0",
        "to_version": "v6.1.0",
        "type": "signature",
        "signature": "public int add(int a, int b)",
        "documentation": null,
        "changetype": "method",
        "source_code": "public int add(int a, int b) { return a + b; }",
        "query": "Add two numbers.",
        "function_signature": "public int add(int a, int b);",
        "test_program": "public class ExampleSpringServiceTest {}"
    })
}

fn write_batch(dir: &TempDir, changes: Value) -> PathBuf {
    let input = dir.path().join("batch.json");
    let body = serde_json::to_string(&changes).unwrap();
    std::fs::write(&input, body).unwrap();
    input
}

fn apidrift(input: &Path, output: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_apidrift"));
    cmd.arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .arg("--no-progress")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("APIDRIFT_OPENAI_ENDPOINT")
        .env_remove("RUST_LOG");
    cmd
}

async fn mock_openai(reply: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": reply } }]
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn refuses_to_run_without_api_keys() {
    let dir = tempdir().unwrap();
    let input = write_batch(&dir, json!([change_json("add")]));
    let output = dir.path().join("out.json");

    let result = apidrift(&input, &output)
        .args(["-m", "gpt-4o"])
        .output()
        .await
        .unwrap();

    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(!result.status.success());
    assert!(stderr.contains("no API key"));
    assert!(!output.exists());
}

#[tokio::test]
async fn refuses_missing_input_file() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.json");

    let result = apidrift(&dir.path().join("absent.json"), &output)
        .args(["-m", "gpt-4o", "-a", "sk-test"])
        .output()
        .await
        .unwrap();

    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(!result.status.success());
    assert!(stderr.contains("input file not found"));
}

#[tokio::test]
async fn empty_batch_writes_empty_result() {
    let dir = tempdir().unwrap();
    let input = write_batch(&dir, json!([]));
    let output = dir.path().join("results/out.json");

    let result = apidrift(&input, &output)
        .args(["-m", "gpt-4o", "-a", "sk-test"])
        .output()
        .await
        .unwrap();

    let stderr = String::from_utf8_lossy(&result.stderr);
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(result.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("Total: 0, Success: 0"));
    let text = std::fs::read_to_string(&output).unwrap();
    let written: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(written, json!([]));
}

#[tokio::test]
async fn missing_build_tool_fails_the_run() {
    let server = mock_openai(ADD_OK).await;
    let dir = tempdir().unwrap();
    let input = write_batch(&dir, json!([change_json("add"), change_json("sum")]));
    let output = dir.path().join("out.json");

    let result = apidrift(&input, &output)
        .args(["-m", "gpt-4o", "-a", "sk-test", "-w", "1"])
        .arg("--openai-endpoint")
        .arg(format!("{}/v1/chat/completions", server.uri()))
        .env_remove("GRADLE_HOME")
        .output()
        .await
        .unwrap();

    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(!result.status.success());
    assert!(stderr.contains("GRADLE_HOME"));
    assert!(!output.exists(), "no results are written for an aborted run");
}

#[cfg(unix)]
#[tokio::test]
async fn end_to_end_with_scripted_build_tool() {
    use std::os::unix::fs::PermissionsExt;

    let server = mock_openai(&format!("```java\n{ADD_OK}\n```")).await;
    let dir = tempdir().unwrap();

    let tool = dir.path().join("gradle");
    std::fs::write(
        &tool,
        "#!/bin/sh\ngrep -q 'a + b' src/main/java/ExampleSpringService.java && echo BUILD SUCCESSFUL && exit 0\necho 'assertion failed' >&2\nexit 1\n",
    )
    .unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let input = write_batch(&dir, json!([change_json("add"), change_json("sum")]));
    let output = dir.path().join("out.json");

    let result = apidrift(&input, &output)
        .args(["-m", "gpt-4o,gpt-4.1", "-a", "sk-test"])
        .arg("--openai-endpoint")
        .arg(format!("{}/v1/chat/completions", server.uri()))
        .arg("--gradle")
        .arg(&tool)
        .output()
        .await
        .unwrap();

    let stderr = String::from_utf8_lossy(&result.stderr);
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(result.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("Total: 4, Success: 4"));

    let text = std::fs::read_to_string(&output).unwrap();
    let written: Value = serde_json::from_str(&text).unwrap();
    let outcomes = written.as_array().unwrap();
    assert_eq!(outcomes.len(), 4);

    let order: Vec<(&str, &str)> = outcomes
        .iter()
        .map(|o| {
            (
                o["apiChange"]["name"].as_str().unwrap(),
                o["model"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ("add", "gpt-4o"),
            ("add", "gpt-4.1"),
            ("sum", "gpt-4o"),
            ("sum", "gpt-4.1"),
        ]
    );
    for outcome in outcomes {
        assert_eq!(outcome["success"], true);
        assert_eq!(outcome["generatedCode"], ADD_OK);
        assert_eq!(outcome["apiChange"]["type"], "signature");
    }
}
