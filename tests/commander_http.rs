//! Integration tests for the commander HTTP surface.
//!
//! Each test spins up an Axum server on a random port with a stub chat
//! model and exercises the real register / task / result / chat contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpListener;

use agent_commander::audit::AuditLog;
use agent_commander::config::EncryptionConfig;
use agent_commander::crypto::ResultCipher;
use agent_commander::directory::WorkerDirectory;
use agent_commander::dispatch::Dispatcher;
use agent_commander::error::LlmError;
use agent_commander::history::ConversationHistory;
use agent_commander::llm::{ChatModel, ChatOutcome};
use agent_commander::protocol::{ChatMessage, FunctionCall, FunctionSpec};
use agent_commander::queue::TaskQueue;
use agent_commander::server::{AppState, commander_routes};
use agent_commander::store::CommanderDb;

/// Stub chat model: returns a function call when any skills are offered,
/// otherwise a plain reply.
struct StubModel;

#[async_trait]
impl ChatModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        functions: &[FunctionSpec],
    ) -> Result<ChatOutcome, LlmError> {
        if let Some(spec) = functions.first() {
            Ok(ChatOutcome::Call(FunctionCall::new(spec.name.clone())))
        } else {
            Ok(ChatOutcome::Reply("stub reply".to_string()))
        }
    }
}

struct TestServer {
    base: String,
    token: String,
    history: Arc<ConversationHistory>,
}

/// Start a commander on a random port with the given encryption setting.
async fn start_server(encryption: EncryptionConfig) -> TestServer {
    let db = Arc::new(CommanderDb::open_in_memory().await.unwrap());
    let audit = Arc::new(AuditLog::new(Arc::clone(&db)));
    let history = Arc::new(ConversationHistory::new());
    let directory = Arc::new(WorkerDirectory::new());
    let queue = Arc::new(TaskQueue::new(
        Arc::clone(&db),
        Arc::clone(&audit),
        Arc::clone(&history),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&directory),
        Arc::clone(&queue),
        Arc::clone(&history),
        Arc::new(StubModel),
    ));
    let token = directory.bearer_token().to_string();

    let upload_dir = tempfile::tempdir().unwrap();
    let state = AppState {
        directory,
        queue,
        dispatcher,
        audit,
        cipher: Arc::new(ResultCipher::from_config(&encryption).unwrap()),
        upload_dir: upload_dir.keep().to_string_lossy().into_owned(),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, commander_routes(state)).await.unwrap();
    });

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        token,
        history,
    }
}

fn register_body(token: &str, worker_id: &str) -> Value {
    serde_json::json!({
        "token": token,
        "worker_id": worker_id,
        "os": "linux",
        "layer": "L-3",
        "skills": [{
            "name": "run_shell",
            "description": "Execute shell command",
            "parameters": {"type": "object", "properties": {}}
        }]
    })
}

#[tokio::test]
async fn register_rejects_bad_token() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/register", server.base))
        .json(&register_body("wrong-token", "w1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn register_echoes_or_assigns_worker_id() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/register", server.base))
        .json(&register_body(&server.token, "w1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["worker_id"], "w1");

    // Without a worker_id the commander assigns one.
    let resp = client
        .post(format!("{}/register", server.base))
        .json(&serde_json::json!({
            "token": server.token, "os": "linux", "layer": "L-2", "skills": []
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(!body["worker_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn chat_queues_task_and_worker_round_trips_result() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/register", server.base))
        .json(&register_body(&server.token, "w1"))
        .send()
        .await
        .unwrap();

    // Stub model picks the registered skill, so chat enqueues a task.
    let resp = client
        .post(format!("{}/chat", server.base))
        .json(&serde_json::json!({"message": "list my files"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.contains("run_shell"), "ack names the skill: {reply}");

    // Poll delivers it once.
    let resp = client
        .get(format!("{}/task/w1", server.base))
        .header("Authorization", &server.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    let task_id = tasks[0]["id"].as_str().unwrap().to_string();
    assert_eq!(tasks[0]["function"]["name"], "run_shell");

    // Second poll: empty queue, 204.
    let resp = client
        .get(format!("{}/task/w1", server.base))
        .header("Authorization", &server.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    // Post the result; it must land in history exactly once.
    let payload = serde_json::json!({
        "worker_id": "w1", "task_id": task_id, "status": "success",
        "result": {"stdout": "ok"}
    })
    .to_string();
    let resp = client
        .post(format!("{}/result/{task_id}", server.base))
        .header("Authorization", &server.token)
        .json(&serde_json::json!({"payload": payload}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let messages = server.history.messages().await;
    let last = messages.last().unwrap();
    let entry: Value = serde_json::from_str(&last.content).unwrap();
    assert_eq!(entry["task_id"], task_id.as_str());
    assert_eq!(entry["result"]["result"]["stdout"], "ok");
}

#[tokio::test]
async fn chat_with_empty_schema_gets_plain_reply() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    // No skills registered: the stub replies with text.
    let resp = client
        .post(format!("{}/chat", server.base))
        .json(&serde_json::json!({"message": "hello"}))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reply"], "stub reply");
}

#[tokio::test]
async fn stale_skill_without_advertiser_reports_inline_failure() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    // Register with run_shell, then re-register the same worker without it.
    // The registry keeps the stale skill, so the model still selects it, but
    // no worker advertises it anymore.
    client
        .post(format!("{}/register", server.base))
        .json(&register_body(&server.token, "w1"))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/register", server.base))
        .json(&serde_json::json!({
            "token": server.token, "worker_id": "w1",
            "os": "linux", "layer": "L-3", "skills": []
        }))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/chat", server.base))
        .json(&serde_json::json!({"message": "list my files"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.contains("run_shell"), "failure names the skill: {reply}");
    assert!(reply.contains("No worker"), "inline failure text: {reply}");
}

#[tokio::test]
async fn task_endpoint_auth_and_unknown_worker() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/register", server.base))
        .json(&register_body(&server.token, "w1"))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/chat", server.base))
        .json(&serde_json::json!({"message": "do it"}))
        .send()
        .await
        .unwrap();

    // Wrong token is rejected before any queue state is touched...
    let resp = client
        .get(format!("{}/task/w1", server.base))
        .header("Authorization", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // ...so the task is still delivered to the next authorized poll.
    let resp = client
        .get(format!("{}/task/w1", server.base))
        .header("Authorization", &server.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Unknown worker id is a 404 naming the worker, distinct from auth failure.
    let resp = client
        .get(format!("{}/task/ghost", server.base))
        .header("Authorization", &server.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Unknown worker: ghost");
}

#[tokio::test]
async fn encrypted_result_payload_is_decoded() {
    let passphrase = "shared-vault-passphrase";
    let server = start_server(EncryptionConfig::Enabled {
        passphrase: secrecy::SecretString::from(passphrase.to_string()),
    })
    .await;
    let client = reqwest::Client::new();

    // Worker-side cipher with the same passphrase.
    let cipher = ResultCipher::from_config(&EncryptionConfig::Enabled {
        passphrase: secrecy::SecretString::from(passphrase.to_string()),
    })
    .unwrap();
    let payload = cipher.encrypt(
        serde_json::json!({"task_id": "tx", "status": "success", "result": 42})
            .to_string()
            .as_bytes(),
    );

    let resp = client
        .post(format!("{}/result/tx", server.base))
        .header("Authorization", &server.token)
        .json(&serde_json::json!({"payload": payload}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let messages = server.history.messages().await;
    let entry: Value = serde_json::from_str(&messages.last().unwrap().content).unwrap();
    assert_eq!(entry["result"]["result"], 42);
}

#[tokio::test]
async fn malformed_result_payload_is_rejected() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/result/t1", server.base))
        .header("Authorization", &server.token)
        .json(&serde_json::json!({"payload": "definitely not json"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(server.history.is_empty().await, "corrupt result never recorded");
}

#[tokio::test]
async fn status_exposes_directory_snapshot() {
    let server = start_server(EncryptionConfig::Disabled).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/register", server.base))
        .json(&register_body(&server.token, "w1"))
        .send()
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/status", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["workers"].as_array().unwrap().len(), 1);
    assert_eq!(body["skills"][0], "run_shell");
    assert_eq!(body["bearer_token"], server.token.as_str());
    assert_eq!(body["layer"], "L-3");
}
