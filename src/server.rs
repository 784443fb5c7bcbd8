//! Axum HTTP surface of the commander.
//!
//! All handlers receive an explicitly constructed [`AppState`]; the state's
//! single-writer lifetime equals the service process.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use crate::audit::{AuditAction, AuditLog};
use crate::crypto::ResultCipher;
use crate::directory::WorkerDirectory;
use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, Error};
use crate::protocol::{
    ChatRequest, ChatResponse, RegisterRequest, RegisterResponse, ResultRequest, ResultResponse,
    TaskListResponse, WorkerInfo,
};
use crate::queue::TaskQueue;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<WorkerDirectory>,
    pub queue: Arc<TaskQueue>,
    pub dispatcher: Arc<Dispatcher>,
    pub audit: Arc<AuditLog>,
    pub cipher: Arc<ResultCipher>,
    pub upload_dir: String,
}

/// Build the commander router.
pub fn commander_routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/status", get(status))
        .route("/register", post(register))
        .route("/task/{worker_id}", get(get_tasks))
        .route("/result/{task_id}", post(post_result))
        .route("/upload", post(upload))
        .with_state(state)
}

/// Check the bearer token before any queue state is read or mutated.
fn authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == token)
}

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

/// POST /chat — trusted caller, no token.
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    match state.dispatcher.handle_user_message(&req.message).await {
        Ok(reply) => Json(ChatResponse { reply }).into_response(),
        // Failure explanations go inline in the reply channel.
        Err(Error::Dispatch(DispatchError::NoEligibleWorker { skill })) => Json(ChatResponse {
            reply: format!("No worker is currently able to run `{skill}`."),
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Chat turn failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /status — directory snapshot.
async fn status(State(state): State<AppState>) -> Response {
    Json(state.directory.snapshot().await).into_response()
}

/// POST /register — shared token carried in the body.
async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Response {
    if req.token != state.directory.bearer_token() {
        return error_json(StatusCode::UNAUTHORIZED, "bad token");
    }

    let info = WorkerInfo {
        os: req.os,
        layer: req.layer,
        skills: req.skills,
    };
    let worker_id = state.directory.register(req.worker_id, info).await;
    if let Err(e) = state
        .audit
        .record(
            AuditAction::RegisterWorker,
            serde_json::json!({"worker_id": worker_id}),
        )
        .await
    {
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    Json(RegisterResponse { worker_id }).into_response()
}

/// GET /task/{worker_id} — deliver all pending tasks, 204 when none.
async fn get_tasks(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers, state.directory.bearer_token()) {
        return error_json(StatusCode::UNAUTHORIZED, "bad token");
    }
    if !state.directory.contains(&worker_id).await {
        let err = DispatchError::UnknownWorker {
            worker_id: worker_id.clone(),
        };
        return error_json(StatusCode::NOT_FOUND, err.to_string());
    }

    match state.queue.fetch_pending(&worker_id).await {
        Ok(tasks) if tasks.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(tasks) => Json(TaskListResponse { tasks }).into_response(),
        Err(e) => {
            warn!(worker_id = %worker_id, error = %e, "Fetch failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /result/{task_id} — record a worker's result.
async fn post_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ResultRequest>,
) -> Response {
    if !authorized(&headers, state.directory.bearer_token()) {
        return error_json(StatusCode::UNAUTHORIZED, "bad token");
    }

    let result = match state.cipher.decode(&req.payload) {
        Ok(value) => value,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.queue.complete(&task_id, result).await {
        Ok(()) => Json(ResultResponse {
            status: "ok".to_string(),
        })
        .into_response(),
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "Completion failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /upload — save a multipart file under the upload directory.
async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        // Strip any path components from the client-supplied name.
        let name = name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            continue;
        }

        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return error_json(StatusCode::BAD_REQUEST, e.to_string()),
        };

        if let Err(e) = tokio::fs::create_dir_all(&state.upload_dir).await {
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
        let dest = std::path::Path::new(&state.upload_dir).join(&name);
        if let Err(e) = tokio::fs::write(&dest, &bytes).await {
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }

        return Json(serde_json::json!({"filename": name, "size": bytes.len()}))
            .into_response();
    }
    error_json(StatusCode::BAD_REQUEST, "no file field")
}
