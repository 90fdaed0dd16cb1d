// hooks.rs — HTTP API the prompt host calls from its plugin hooks.
//
//   POST /hooks/user-turn     {session_id, agent}              → {outcome, banner?}
//   POST /hooks/tool-before   {session_id, tool}               → 200 pass | 403 {message}
//   POST /hooks/tool-after    {session_id, tool, command?, output?, outcome?} → {effect}
//   GET  /sessions/{id}/banner                                 → text | 404
//   GET  /notifications                                        → [Notification]
//   GET  /health                                               → "ok"
//
// Bound to loopback only. The host treats a 403 from tool-before as a hard
// abort of the tool call and shows `message` to the agent.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use orc_pipeline::{Notification, TurnOutcome};
use orc_policy::GateDecision;

use crate::host::{PipelineHost, ToolCompletion, ToolEffect};
use crate::outbox::Outbox;

#[derive(Clone)]
pub struct HookState {
    pub host: Arc<PipelineHost>,
    pub outbox: Arc<Outbox>,
}

/// Build the hook router.
pub fn hook_router(state: HookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hooks/user-turn", post(user_turn))
        .route("/hooks/tool-before", post(tool_before))
        .route("/hooks/tool-after", post(tool_after))
        .route("/sessions/{id}/banner", get(session_banner))
        .route("/notifications", get(notifications))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct UserTurnRequest {
    session_id: String,
    agent: String,
}

#[derive(Debug, Serialize)]
struct UserTurnResponse {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    banner: Option<String>,
}

/// POST /hooks/user-turn - register the session and return its banner.
async fn user_turn(
    State(state): State<HookState>,
    Json(req): Json<UserTurnRequest>,
) -> Json<UserTurnResponse> {
    let outcome = match state.host.on_user_turn(&req.session_id, &req.agent) {
        TurnOutcome::Registered { .. } => "registered",
        TurnOutcome::Started => "started",
        TurnOutcome::Reset { .. } => "reset",
        TurnOutcome::Continued => "continued",
    };
    Json(UserTurnResponse {
        outcome,
        banner: state.host.banner(&req.session_id),
    })
}

#[derive(Debug, Deserialize)]
struct ToolBeforeRequest {
    session_id: String,
    tool: String,
}

#[derive(Debug, Serialize)]
struct Rejection {
    message: String,
}

/// POST /hooks/tool-before - 200 to let the call run, 403 to abort it.
async fn tool_before(
    State(state): State<HookState>,
    Json(req): Json<ToolBeforeRequest>,
) -> Response {
    match state.host.before_tool(&req.session_id, &req.tool) {
        GateDecision::Allow => StatusCode::OK.into_response(),
        GateDecision::Deny { reason } => {
            (StatusCode::FORBIDDEN, Json(Rejection { message: reason })).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
enum ToolAfterResponse {
    None,
    GitDiffRecorded,
    Advanced { to: String },
    Held { diagnostic: String },
}

/// POST /hooks/tool-after - feed a finished tool call into the pipeline.
async fn tool_after(
    State(state): State<HookState>,
    Json(completion): Json<ToolCompletion>,
) -> Json<ToolAfterResponse> {
    Json(match state.host.after_tool(&completion) {
        ToolEffect::None => ToolAfterResponse::None,
        ToolEffect::GitDiffRecorded => ToolAfterResponse::GitDiffRecorded,
        ToolEffect::Advanced(t) => ToolAfterResponse::Advanced {
            to: t.to.to_string(),
        },
        ToolEffect::Held { diagnostic } => ToolAfterResponse::Held { diagnostic },
    })
}

/// GET /sessions/:id/banner - banner text for orchestrator sessions.
async fn session_banner(
    State(state): State<HookState>,
    Path(id): Path<String>,
) -> Result<String, StatusCode> {
    state.host.banner(&id).ok_or(StatusCode::NOT_FOUND)
}

/// GET /notifications - drain queued notifications.
async fn notifications(State(state): State<HookState>) -> Json<Vec<Notification>> {
    Json(state.outbox.drain())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::config::GatewayConfig;

    fn app() -> (Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let outbox = Arc::new(Outbox::new());
        let host = PipelineHost::new(GatewayConfig::for_project(dir.path()))
            .unwrap()
            .with_notifier(outbox.clone());
        let router = hook_router(HookState {
            host: Arc::new(host),
            outbox,
        });
        (router, dir)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => request
                .header("content-type", "application/json")
                .body(Body::from(v.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn user_turn_returns_banner_for_orchestrator() {
        let (app, _dir) = app();
        let (status, body) = send(
            &app,
            "POST",
            "/hooks/user-turn",
            Some(json!({"session_id": "s1", "agent": "orchestrator"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["outcome"], "registered");
        assert!(v["banner"]
            .as_str()
            .unwrap()
            .starts_with("[PIPELINE session=s1] Phase: BRAINSTORMING"));

        let (status, body) = send(&app, "GET", "/sessions/s1/banner", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("[PIPELINE session=s1]"));
    }

    #[tokio::test]
    async fn banner_for_unknown_session_is_404() {
        let (app, _dir) = app();
        let (status, _) = send(&app, "GET", "/sessions/nobody/banner", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejected_tool_is_403_with_message() {
        let (app, _dir) = app();
        send(
            &app,
            "POST",
            "/hooks/user-turn",
            Some(json!({"session_id": "s1", "agent": "orchestrator"})),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/hooks/tool-before",
            Some(json!({"session_id": "s1", "tool": "task"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert!(v["message"].as_str().unwrap().contains("DISPATCHING"));

        let (status, _) = send(
            &app,
            "POST",
            "/hooks/tool-before",
            Some(json!({"session_id": "s1", "tool": "read"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn tool_after_without_pipeline_has_no_effect() {
        let (app, _dir) = app();
        let (status, body) = send(
            &app,
            "POST",
            "/hooks/tool-after",
            Some(json!({"session_id": "child", "tool": "bash", "command": "git diff"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"effect":"none"}"#);
    }

    #[tokio::test]
    async fn notifications_start_empty() {
        let (app, _dir) = app();
        let (status, body) = send(&app, "GET", "/notifications", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }
}
